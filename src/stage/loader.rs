use std::sync::Arc;

use rayon::prelude::*;

use crate::animation::clip::Clip;
use crate::animation::retarget::{retarget_mapped, retarget_native};
use crate::assets::background::{BackgroundImage, load_background};
use crate::assets::files::{load_native_clip, load_rig, load_source_clip};
use crate::assets::paths::AssetRoot;
use crate::audio::clip::AudioClip;
use crate::foundation::error::{StageError, StageResult};
use crate::rig::humanoid::BoneMap;
use crate::rig::skeleton::Rig;
use crate::stage::config::{ActionConfig, Convention, StageConfig};
use crate::stage::registry::ActionTable;

/// Loaded assets of one action.
///
/// A reaction whose audio fails is unusable. The idle action keeps its clip and loses only the
/// audio, recorded in `audio_failure`.
#[derive(Clone, Debug)]
pub struct ActionRuntime {
    pub clip: Option<Arc<Clip>>,
    pub audio: Option<Arc<AudioClip>>,
    /// Reason the action cannot be played.
    pub failure: Option<String>,
    pub audio_failure: Option<String>,
}

impl ActionRuntime {
    fn failed(reason: String) -> Self {
        Self {
            clip: None,
            audio: None,
            failure: Some(reason),
            audio_failure: None,
        }
    }

    /// Whether the action can be triggered.
    pub fn is_usable(&self) -> bool {
        self.failure.is_none() && self.clip.is_some()
    }
}

/// Load outcome of one action, for diagnostics.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ActionReport {
    pub name: String,
    pub usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_error: Option<String>,
}

/// Summary of a load phase.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct LoadReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rig_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_error: Option<String>,
    pub actions: Vec<ActionReport>,
}

impl LoadReport {
    /// Number of actions that can be triggered.
    pub fn usable_actions(&self) -> usize {
        self.actions.iter().filter(|a| a.usable).count()
    }
}

/// Everything the load phase produced.
#[derive(Debug)]
pub struct LoadedAssets {
    pub rig: Option<Rig>,
    pub background: Option<BackgroundImage>,
    /// Indexed by action id.
    pub actions: Vec<ActionRuntime>,
    pub report: LoadReport,
}

/// Load the rig, background and every action.
///
/// Rig and background load concurrently; actions then load in parallel, each clip alongside its
/// audio. A failure only degrades the piece that failed.
#[tracing::instrument(skip_all, fields(root = %root.dir().display(), actions = table.len()))]
pub fn load_assets(config: &StageConfig, table: &ActionTable, root: &AssetRoot) -> LoadedAssets {
    let (rig, background) = rayon::join(
        || root.resolve(&config.rig).and_then(|p| load_rig(&p)),
        || {
            config
                .background
                .as_deref()
                .map(|bg| root.resolve(bg).and_then(|p| load_background(&p)))
        },
    );

    let mut report = LoadReport::default();
    let rig = match rig {
        Ok(rig) => Some(rig),
        Err(e) => {
            tracing::warn!(path = %config.rig, error = %e, "rig failed to load");
            report.rig_error = Some(e.to_string());
            None
        }
    };
    let background = match background {
        Some(Ok(bg)) => Some(bg),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "background failed to load");
            report.background_error = Some(e.to_string());
            None
        }
        None => None,
    };

    let map = BoneMap::mixamo().with_overrides(&config.bone_map);
    let defs: Vec<(bool, &ActionConfig)> = table
        .iter()
        .map(|(id, a)| (id == table.idle(), a))
        .collect();
    let actions: Vec<ActionRuntime> = defs
        .par_iter()
        .map(|&(idle, def)| load_action(def, idle, rig.as_ref(), &map, root))
        .collect();

    for ((_, def), runtime) in defs.iter().zip(&actions) {
        report.actions.push(ActionReport {
            name: def.name.clone(),
            usable: runtime.is_usable(),
            clip_secs: runtime.clip.as_ref().map(|c| c.duration),
            audio_secs: runtime.audio.as_ref().map(|a| a.duration_secs()),
            error: runtime.failure.clone(),
            audio_error: runtime.audio_failure.clone(),
        });
    }
    tracing::info!(
        usable = report.usable_actions(),
        total = actions.len(),
        "stage assets loaded"
    );

    LoadedAssets {
        rig,
        background,
        actions,
        report,
    }
}

fn load_action(
    def: &ActionConfig,
    idle: bool,
    rig: Option<&Rig>,
    map: &BoneMap,
    root: &AssetRoot,
) -> ActionRuntime {
    let (clip, audio) = rayon::join(
        || load_action_clip(def, rig, map, root),
        || {
            def.audio
                .as_deref()
                .map(|a| root.resolve(a).and_then(|p| AudioClip::decode_wav(&p)))
        },
    );

    let clip = match clip {
        Ok(clip) => clip,
        Err(e) => {
            tracing::warn!(
                action = %def.name,
                path = %def.animation.path,
                error = %e,
                "animation failed to load"
            );
            return ActionRuntime::failed(e.to_string());
        }
    };
    let mut audio_failure = None;
    let audio = match audio {
        Some(Ok(audio)) => Some(Arc::new(audio)),
        Some(Err(e)) if idle => {
            tracing::warn!(
                action = %def.name,
                error = %e,
                "idle audio failed to load, looping without it"
            );
            audio_failure = Some(e.to_string());
            None
        }
        Some(Err(e)) => {
            tracing::warn!(action = %def.name, error = %e, "audio failed to load");
            return ActionRuntime::failed(e.to_string());
        }
        None => None,
    };

    ActionRuntime {
        clip: Some(Arc::new(clip)),
        audio,
        failure: None,
        audio_failure,
    }
}

fn load_action_clip(
    def: &ActionConfig,
    rig: Option<&Rig>,
    map: &BoneMap,
    root: &AssetRoot,
) -> StageResult<Clip> {
    let rig = rig.ok_or_else(|| StageError::asset("no rig to retarget onto"))?;
    let path = root.resolve(&def.animation.path)?;
    let clip = match def.animation.convention {
        Convention::Mapped => retarget_mapped(&load_source_clip(&path)?, map, rig)?,
        Convention::Native => retarget_native(&load_native_clip(&path)?, rig)?,
    };
    Ok(clip)
}
