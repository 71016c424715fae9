use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::core::{SecsRange, approach};
use crate::foundation::error::{StageError, StageResult};

/// Tunables for [`LipSync`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LipSettings {
    /// Per-frame interpolation factor toward `idle_target * amplitude`.
    pub smoothing: f32,
    /// Range the chatter countdown is drawn from after each pick.
    pub hold: SecsRange,
    /// Analyzer level that maps to full amplitude.
    pub amplitude_ceiling: f32,
}

#[derive(Clone, Debug)]
struct Shape {
    name: String,
    draw_weight: f32,
    idle_target: f32,
    current: f32,
}

/// Mouth-shape weights driven by weighted-random idle chatter scaled by live audio amplitude.
#[derive(Debug)]
pub struct LipSync {
    shapes: Vec<Shape>,
    total_weight: f32,
    countdown: f32,
    amplitude: f32,
    source: Option<usize>,
    settings: LipSettings,
    rng: StdRng,
}

impl LipSync {
    /// Build the engine over a non-empty table of positive draw weights.
    pub fn new(table: &BTreeMap<String, f32>, settings: LipSettings, seed: u64) -> StageResult<Self> {
        if table.is_empty() {
            return Err(StageError::config("lip shape table must not be empty"));
        }
        if let Some((name, _)) = table.iter().find(|(_, w)| !w.is_finite() || **w <= 0.0) {
            return Err(StageError::config(format!(
                "lip shape '{name}' must have a positive finite weight"
            )));
        }
        let shapes: Vec<Shape> = table
            .iter()
            .map(|(name, w)| Shape {
                name: name.clone(),
                draw_weight: *w,
                idle_target: 0.0,
                current: 0.0,
            })
            .collect();
        let total_weight = shapes.iter().map(|s| s.draw_weight).sum();
        Ok(Self {
            shapes,
            total_weight,
            countdown: 0.0,
            amplitude: 0.0,
            source: None,
            settings,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Pick a shape index with probability proportional to its draw weight.
    pub fn draw(&mut self) -> usize {
        let mut acc = self.rng.gen_range(0.0..self.total_weight);
        for (i, shape) in self.shapes.iter().enumerate() {
            acc -= shape.draw_weight;
            if acc <= 0.0 {
                return i;
            }
        }
        // float rounding can leave a sliver past the last weight
        self.shapes.len() - 1
    }

    /// Advance the chatter timer and ease every shape toward `idle_target * amplitude`.
    ///
    /// `level` is the live analyzer reading of the bound source, on the analyzer's scale.
    pub fn tick(&mut self, dt: f32, level: Option<f32>) {
        self.countdown -= dt.max(0.0);
        if self.countdown <= 0.0 {
            let picked = self.draw();
            for (i, shape) in self.shapes.iter_mut().enumerate() {
                shape.idle_target = if i == picked { 1.0 } else { 0.0 };
            }
            self.countdown = self.settings.hold.sample(&mut self.rng);
        }

        self.amplitude = match level {
            Some(level) if self.settings.amplitude_ceiling > 0.0 => {
                (level / self.settings.amplitude_ceiling).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };

        let (amplitude, factor) = (self.amplitude, self.settings.smoothing);
        for shape in &mut self.shapes {
            shape.current = approach(shape.current, shape.idle_target * amplitude, factor);
        }
    }

    /// Track the analyzer of `voice` as the live amplitude source.
    pub fn bind_source(&mut self, voice: usize) {
        self.source = Some(voice);
    }

    /// Drop the live amplitude source; amplitude reads as zero until the next bind.
    pub fn release_source(&mut self) {
        self.source = None;
    }

    /// Currently bound amplitude source.
    pub fn source(&self) -> Option<usize> {
        self.source
    }

    /// Amplitude scalar computed on the last tick, in `[0, 1]`.
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Current weight of a mouth shape.
    pub fn weight(&self, name: &str) -> Option<f32> {
        self.shapes.iter().find(|s| s.name == name).map(|s| s.current)
    }

    /// Shape currently chosen by the chatter generator.
    pub fn idle_shape(&self) -> Option<&str> {
        self.shapes
            .iter()
            .find(|s| s.idle_target >= 1.0)
            .map(|s| s.name.as_str())
    }

    /// Shape names in table order.
    pub fn shape_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.shapes.iter().map(|s| s.name.as_str())
    }

    /// Every shape and its current weight.
    pub fn channels(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.shapes.iter().map(|s| (s.name.as_str(), s.current))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/face/lipsync.rs"]
mod tests;
