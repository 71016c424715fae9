use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;

use crate::assets::paths::{AssetRoot, normalize_rel_path};
use crate::face::expression::BLINK;
use crate::foundation::core::SecsRange;
use crate::foundation::error::{StageError, StageResult};

/// Naming convention an animation clip was authored in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// Foreign skeleton; bone names go through the bone map and root height is compensated.
    #[default]
    Mapped,
    /// Authored against humanoid bone names already.
    Native,
}

/// Animation clip reference of an action.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationSource {
    /// Clip path relative to the asset root.
    pub path: String,
    #[serde(default)]
    pub convention: Convention,
}

/// One named bundle of animation, audio and expression.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    pub name: String,
    pub animation: AnimationSource,
    /// WAV path relative to the asset root.
    #[serde(default)]
    pub audio: Option<String>,
    /// Expression made the sole target while the action is active.
    #[serde(default)]
    pub expression: Option<String>,
}

/// Timing and smoothing constants.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tuning {
    /// Per-frame expression interpolation factor.
    pub expression_smoothing: f32,
    /// Per-frame mouth-shape interpolation factor.
    pub lip_smoothing: f32,
    /// Crossfade between triggered actions.
    pub crossfade_secs: f32,
    /// Fade back to idle after an action completes.
    pub idle_return_secs: f32,
    pub blink_interval_secs: [f32; 2],
    pub blink_duration_secs: f32,
    /// How long one idle mouth shape is held.
    pub lip_hold_secs: [f32; 2],
    /// Analyzer level treated as full mouth opening.
    pub amplitude_ceiling: f32,
    pub analyzer_window_secs: f32,
    /// Vertical field of view of the stage camera.
    pub camera_fov_deg: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            expression_smoothing: 0.1,
            lip_smoothing: 0.3,
            crossfade_secs: 0.5,
            idle_return_secs: 1.0,
            blink_interval_secs: [1.0, 5.0],
            blink_duration_secs: 0.2,
            lip_hold_secs: [0.08, 0.2],
            amplitude_ceiling: 50.0,
            analyzer_window_secs: 0.05,
            camera_fov_deg: 30.0,
        }
    }
}

impl Tuning {
    /// Blink interval as a validated range.
    pub fn blink_interval(&self) -> StageResult<SecsRange> {
        let [min, max] = self.blink_interval_secs;
        SecsRange::new(min, max)
    }

    /// Lip hold time as a validated range.
    pub fn lip_hold(&self) -> StageResult<SecsRange> {
        let [min, max] = self.lip_hold_secs;
        SecsRange::new(min, max)
    }

    fn validate(&self) -> StageResult<()> {
        for (name, v) in [
            ("expression_smoothing", self.expression_smoothing),
            ("lip_smoothing", self.lip_smoothing),
        ] {
            if v.is_nan() || v <= 0.0 || v > 1.0 {
                return Err(StageError::config(format!("tuning.{name} must be in (0, 1]")));
            }
        }
        for (name, v) in [
            ("crossfade_secs", self.crossfade_secs),
            ("idle_return_secs", self.idle_return_secs),
            ("blink_duration_secs", self.blink_duration_secs),
            ("amplitude_ceiling", self.amplitude_ceiling),
            ("analyzer_window_secs", self.analyzer_window_secs),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(StageError::config(format!("tuning.{name} must be > 0")));
            }
        }
        let fov = self.camera_fov_deg;
        if fov.is_nan() || fov <= 0.0 || fov >= 180.0 {
            return Err(StageError::config("tuning.camera_fov_deg must be in (0, 180)"));
        }
        self.blink_interval()?;
        self.lip_hold()?;
        Ok(())
    }
}

fn default_idle() -> String {
    "idle".to_owned()
}

fn default_happy() -> String {
    "happy".to_owned()
}

fn default_lip_shapes() -> BTreeMap<String, f32> {
    [("aa", 3.0), ("ih", 0.5), ("ou", 1.0), ("ee", 2.0), ("oh", 2.0)]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}

/// Stage configuration: assets, action registry and tuning.
///
/// Asset paths are relative to the directory holding the configuration file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Rig asset (`.json`, `.gltf`, `.glb` or `.vrm`).
    pub rig: String,
    #[serde(default)]
    pub background: Option<String>,
    /// Name of the looping rest action.
    #[serde(default = "default_idle")]
    pub idle: String,
    /// Expression that suppresses blinking while targeted.
    #[serde(default = "default_happy")]
    pub happy_expression: String,
    /// Every expression the blender knows.
    pub expressions: Vec<String>,
    /// Mouth shapes and their idle draw weights.
    #[serde(default = "default_lip_shapes")]
    pub lip_shapes: BTreeMap<String, f32>,
    /// Extra `source bone -> humanoid bone` entries layered over the Mixamo table.
    #[serde(default)]
    pub bone_map: BTreeMap<String, String>,
    pub actions: Vec<ActionConfig>,
    #[serde(default)]
    pub tuning: Tuning,
    /// Seed for blink and lip-sync randomness; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl StageConfig {
    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: &Path) -> StageResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read stage config '{}'", path.display()))?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> StageResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| StageError::config(format!("invalid stage config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Asset root for a configuration file: its parent directory.
    pub fn asset_root(path: &Path) -> AssetRoot {
        AssetRoot::new(path.parent().unwrap_or_else(|| Path::new(".")))
    }

    /// Check cross-references and value ranges.
    pub fn validate(&self) -> StageResult<()> {
        normalize_rel_path(&self.rig)?;
        if let Some(bg) = &self.background {
            normalize_rel_path(bg)?;
        }

        let mut expressions = BTreeSet::new();
        for name in &self.expressions {
            if name.is_empty() || name == BLINK {
                return Err(StageError::config(format!(
                    "expression name '{name}' is reserved or empty"
                )));
            }
            if !expressions.insert(name.as_str()) {
                return Err(StageError::config(format!("duplicate expression '{name}'")));
            }
        }
        if !expressions.contains(self.happy_expression.as_str()) {
            return Err(StageError::config(format!(
                "happy expression '{}' is not declared",
                self.happy_expression
            )));
        }

        if self.lip_shapes.is_empty() {
            return Err(StageError::config("lip_shapes must not be empty"));
        }
        if let Some((name, _)) = self
            .lip_shapes
            .iter()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(StageError::config(format!(
                "lip shape '{name}' must have a positive finite weight"
            )));
        }

        if self.actions.is_empty() {
            return Err(StageError::config("actions must not be empty"));
        }
        let mut names = BTreeSet::new();
        for action in &self.actions {
            if action.name.is_empty() {
                return Err(StageError::config("action names must be non-empty"));
            }
            if !names.insert(action.name.as_str()) {
                return Err(StageError::config(format!(
                    "duplicate action '{}'",
                    action.name
                )));
            }
            normalize_rel_path(&action.animation.path)?;
            if let Some(audio) = &action.audio {
                normalize_rel_path(audio)?;
            }
            if let Some(expr) = &action.expression
                && !expressions.contains(expr.as_str())
            {
                return Err(StageError::config(format!(
                    "action '{}' references undeclared expression '{expr}'",
                    action.name
                )));
            }
        }
        if !names.contains(self.idle.as_str()) {
            return Err(StageError::config(format!(
                "idle action '{}' is not declared",
                self.idle
            )));
        }

        self.tuning.validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/config.rs"]
mod tests;
