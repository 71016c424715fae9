use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::foundation::core::{SecsRange, approach};

/// Expression channel driven by the autonomous blink cycle.
pub const BLINK: &str = "blink";

/// Current and target weight of one blendable channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct Weight {
    /// Weight written to the rig, in `[0, 1]`.
    pub current: f32,
    /// Weight the current value eases toward.
    pub target: f32,
}

/// Tunables for [`ExpressionBlender`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpressionSettings {
    /// Per-frame interpolation factor toward the target.
    pub smoothing: f32,
    /// Range the time between blinks is drawn from.
    pub blink_interval: SecsRange,
    /// Length of one blink in seconds.
    pub blink_duration: f32,
}

/// Autonomous blink cycle state.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct BlinkState {
    /// Seconds since the last blink ended.
    pub elapsed: f32,
    /// Threshold `elapsed` must reach before the next blink.
    pub next_in: f32,
    /// Whether a blink is in progress.
    pub blinking: bool,
    /// Progress of the running blink in `[0, 1]`.
    pub progress: f32,
    /// Blink length in seconds.
    pub duration: f32,
    /// Current blink weight.
    pub value: f32,
}

impl BlinkState {
    fn rest(&mut self) {
        self.blinking = false;
        self.progress = 0.0;
        self.value = 0.0;
        self.elapsed = 0.0;
    }
}

/// Eases a fixed set of named facial expressions toward a single active target and runs the
/// blink cycle.
#[derive(Debug)]
pub struct ExpressionBlender {
    weights: BTreeMap<String, Weight>,
    happy: Option<String>,
    smoothing: f32,
    blink_interval: SecsRange,
    blink: BlinkState,
    rng: StdRng,
}

impl ExpressionBlender {
    /// Create a blender over `names`; `happy` names the expression that suppresses blinking.
    pub fn new<I, S>(names: I, happy: Option<&str>, settings: ExpressionSettings, seed: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rng = StdRng::seed_from_u64(seed);
        let weights = names
            .into_iter()
            .map(|n| (n.into(), Weight::default()))
            .collect();
        let blink = BlinkState {
            elapsed: 0.0,
            next_in: settings.blink_interval.sample(&mut rng),
            blinking: false,
            progress: 0.0,
            duration: settings.blink_duration.max(1e-3),
            value: 0.0,
        };
        Self {
            weights,
            happy: happy.map(str::to_owned),
            smoothing: settings.smoothing,
            blink_interval: settings.blink_interval,
            blink,
            rng,
        }
    }

    /// Make `name` the only expression with target 1; `None` returns to neutral.
    ///
    /// Returns `false` when `name` is not a known expression (all targets are still cleared).
    pub fn set_target(&mut self, name: Option<&str>) -> bool {
        for w in self.weights.values_mut() {
            w.target = 0.0;
        }
        let Some(name) = name else {
            return true;
        };
        match self.weights.get_mut(name) {
            Some(w) => {
                w.target = 1.0;
                true
            }
            None => {
                tracing::debug!(expression = name, "ignoring unknown expression target");
                false
            }
        }
    }

    /// Advance easing and the blink cycle by one frame.
    pub fn tick(&mut self, dt: f32) {
        for w in self.weights.values_mut() {
            w.current = approach(w.current, w.target, self.smoothing);
        }

        if self.happy_engaged() {
            self.blink.rest();
            return;
        }

        let blink = &mut self.blink;
        if blink.blinking {
            blink.progress += dt.max(0.0) / blink.duration;
            if blink.progress >= 1.0 {
                blink.rest();
                blink.next_in = self.blink_interval.sample(&mut self.rng);
            } else {
                blink.value = (std::f32::consts::PI * blink.progress).sin();
            }
        } else {
            blink.elapsed += dt.max(0.0);
            if blink.elapsed >= blink.next_in {
                blink.blinking = true;
                blink.progress = 0.0;
                blink.value = 0.0;
            }
        }
    }

    /// Return `true` while the blink-suppressing expression is the active target.
    pub fn happy_engaged(&self) -> bool {
        self.happy
            .as_deref()
            .and_then(|h| self.weights.get(h))
            .is_some_and(|w| w.target >= 1.0)
    }

    /// Name of the expression whose target is 1, if any.
    pub fn active_target(&self) -> Option<&str> {
        self.weights
            .iter()
            .find(|(_, w)| w.target >= 1.0)
            .map(|(n, _)| n.as_str())
    }

    /// Current weight of an expression or of the blink channel.
    pub fn weight(&self, name: &str) -> Option<f32> {
        if name == BLINK {
            return Some(self.blink.value);
        }
        self.weights.get(name).map(|w| w.current)
    }

    /// Target weight of an expression.
    pub fn target(&self, name: &str) -> Option<f32> {
        self.weights.get(name).map(|w| w.target)
    }

    /// Blink cycle state.
    pub fn blink(&self) -> &BlinkState {
        &self.blink
    }

    /// Every channel and its current weight, blink included.
    pub fn channels(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.weights
            .iter()
            .map(|(n, w)| (n.as_str(), w.current))
            .chain(std::iter::once((BLINK, self.blink.value)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/face/expression.rs"]
mod tests;
