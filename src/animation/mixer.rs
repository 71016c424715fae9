use std::sync::Arc;

use crate::animation::clip::{Clip, TrackSample};
use crate::foundation::core::{Quat, Vec3};
use crate::rig::skeleton::{Pose, Rig};

/// How a clip behaves when its cursor reaches the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPolicy {
    /// Wrap around and keep playing.
    Repeat,
    /// Stop at the end and hold the final pose.
    Once,
}

impl LoopPolicy {
    /// Loop while the motion is shorter than its audio; audio is the authority on duration.
    pub fn for_durations(clip_secs: f32, audio_secs: Option<f32>) -> Self {
        match audio_secs {
            Some(audio) if clip_secs < audio => Self::Repeat,
            _ => Self::Once,
        }
    }
}

/// Notifications produced while advancing the mixer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixerEvent {
    /// A single-shot clip reached its end (fired once per play-through).
    Finished(usize),
}

#[derive(Clone, Copy, Debug)]
struct WeightFade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

/// Playback state of one clip inside the mixer.
#[derive(Clone, Debug)]
struct ClipAction {
    clip: Arc<Clip>,
    // track index -> bone index
    bindings: Vec<Option<usize>>,
    time: f32,
    policy: LoopPolicy,
    enabled: bool,
    paused: bool,
    finished: bool,
    weight: f32,
    fade: Option<WeightFade>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Accum {
    rotation: Option<(Quat, f32)>,
    translation: Option<(Vec3, f32)>,
}

/// Blends clip actions, keyed by action slot, into a rig pose.
#[derive(Debug, Default)]
pub struct AnimationMixer {
    actions: Vec<Option<ClipAction>>,
    scratch: Vec<Accum>,
}

impl AnimationMixer {
    /// Create a mixer with `slots` empty action slots.
    pub fn new(slots: usize) -> Self {
        Self {
            actions: vec![None; slots],
            scratch: Vec::new(),
        }
    }

    /// Bind `clip` to `rig` and store it in slot `key`, replacing any previous clip.
    pub fn insert(&mut self, key: usize, clip: Arc<Clip>, rig: &Rig) {
        if key >= self.actions.len() {
            self.actions.resize(key + 1, None);
        }
        let bindings = clip
            .tracks
            .iter()
            .map(|t| rig.bone_index(&t.bone))
            .collect();
        self.actions[key] = Some(ClipAction {
            clip,
            bindings,
            time: 0.0,
            policy: LoopPolicy::Repeat,
            enabled: false,
            paused: false,
            finished: false,
            weight: 0.0,
            fade: None,
        });
    }

    /// Return `true` if slot `key` holds a clip.
    pub fn contains(&self, key: usize) -> bool {
        self.action(key).is_some()
    }

    /// Clip duration in slot `key`.
    pub fn duration(&self, key: usize) -> Option<f32> {
        self.action(key).map(|a| a.clip.duration)
    }

    /// Current time cursor in slot `key`.
    pub fn time(&self, key: usize) -> Option<f32> {
        self.action(key).map(|a| a.time)
    }

    /// Current blend weight in slot `key` (0 when not running).
    pub fn weight(&self, key: usize) -> Option<f32> {
        self.action(key)
            .map(|a| if a.enabled { a.weight } else { 0.0 })
    }

    /// Loop policy in slot `key`.
    pub fn policy(&self, key: usize) -> Option<LoopPolicy> {
        self.action(key).map(|a| a.policy)
    }

    /// Return `true` while slot `key` contributes to the pose.
    pub fn is_running(&self, key: usize) -> bool {
        self.action(key).is_some_and(|a| a.enabled)
    }

    /// Change the loop policy; switching to `Repeat` releases a clip held at its end.
    pub fn set_loop(&mut self, key: usize, policy: LoopPolicy) {
        if let Some(a) = self.action_mut(key) {
            a.policy = policy;
            if policy == LoopPolicy::Repeat {
                a.paused = false;
            }
        }
    }

    /// Start slot `key` from the beginning at full weight.
    pub fn play(&mut self, key: usize) {
        if let Some(a) = self.action_mut(key) {
            a.reset();
            a.enabled = true;
            a.weight = 1.0;
        }
    }

    /// Rewind slot `key` and ramp its weight from 0 to 1 over `secs`.
    pub fn reset_and_fade_in(&mut self, key: usize, secs: f32) {
        if let Some(a) = self.action_mut(key) {
            a.reset();
            a.enabled = true;
            a.schedule_fade(0.0, 1.0, secs);
        }
    }

    /// Ramp the weight of slot `key` to 0 over `secs`, then stop it.
    pub fn fade_out(&mut self, key: usize, secs: f32) {
        if let Some(a) = self.action_mut(key)
            && a.enabled
        {
            let from = a.weight;
            a.schedule_fade(from, 0.0, secs);
        }
    }

    /// Stop slot `key` immediately.
    pub fn stop(&mut self, key: usize) {
        if let Some(a) = self.action_mut(key) {
            a.enabled = false;
            a.fade = None;
            a.weight = 0.0;
        }
    }

    /// Advance every running action by `dt` seconds, appending events to `events`.
    pub fn update(&mut self, dt: f32, events: &mut Vec<MixerEvent>) {
        let dt = dt.max(0.0);
        for (key, slot) in self.actions.iter_mut().enumerate() {
            let Some(a) = slot else {
                continue;
            };
            if !a.enabled {
                continue;
            }

            if !a.paused {
                a.time += dt;
                let duration = a.clip.duration;
                match a.policy {
                    LoopPolicy::Repeat => {
                        a.time = if duration > 0.0 {
                            a.time.rem_euclid(duration)
                        } else {
                            0.0
                        };
                    }
                    LoopPolicy::Once => {
                        if a.time >= duration {
                            a.time = duration;
                            a.paused = true;
                            if !a.finished {
                                a.finished = true;
                                events.push(MixerEvent::Finished(key));
                            }
                        }
                    }
                }
            }

            if let Some(fade) = a.fade.as_mut() {
                fade.elapsed += dt;
                let t = (fade.elapsed / fade.duration).min(1.0);
                a.weight = fade.from + (fade.to - fade.from) * t;
                if t >= 1.0 {
                    let to = fade.to;
                    a.fade = None;
                    if to <= 0.0 {
                        a.enabled = false;
                    }
                }
            }
        }
    }

    /// Blend all running actions over the rig's rest pose into `pose`.
    ///
    /// Multiple actions on one bone average by weight; a total weight below 1 leaves the
    /// remainder on the rest value.
    pub fn evaluate(&mut self, rig: &Rig, pose: &mut Pose) {
        let bones = rig.bones();
        self.scratch.clear();
        self.scratch.resize(bones.len(), Accum::default());

        for a in self.actions.iter().flatten() {
            if !a.enabled || a.weight <= 0.0 {
                continue;
            }
            let w = a.weight;
            for (track, binding) in a.clip.tracks.iter().zip(&a.bindings) {
                let Some(bone) = *binding else {
                    continue;
                };
                let Some(acc) = self.scratch.get_mut(bone) else {
                    continue;
                };
                match track.sample(a.time) {
                    Some(TrackSample::Rotation(q)) => {
                        acc.rotation = Some(match acc.rotation {
                            None => (q, w),
                            Some((prev, total)) => (prev.slerp(q, w / (total + w)), total + w),
                        });
                    }
                    Some(TrackSample::Translation(t)) => {
                        acc.translation = Some(match acc.translation {
                            None => (t, w),
                            Some((prev, total)) => (prev.lerp(t, w / (total + w)), total + w),
                        });
                    }
                    None => {}
                }
            }
        }

        pose.locals.clear();
        pose.locals.extend(bones.iter().map(|b| b.rest));
        for (local, acc) in pose.locals.iter_mut().zip(&self.scratch) {
            if let Some((q, total)) = acc.rotation {
                local.rotation = if total >= 1.0 {
                    q
                } else {
                    local.rotation.slerp(q, total)
                };
            }
            if let Some((t, total)) = acc.translation {
                local.translation = if total >= 1.0 {
                    t
                } else {
                    local.translation.lerp(t, total)
                };
            }
        }
    }

    fn action(&self, key: usize) -> Option<&ClipAction> {
        self.actions.get(key).and_then(Option::as_ref)
    }

    fn action_mut(&mut self, key: usize) -> Option<&mut ClipAction> {
        self.actions.get_mut(key).and_then(Option::as_mut)
    }
}

impl ClipAction {
    fn reset(&mut self) {
        self.time = 0.0;
        self.paused = false;
        self.finished = false;
        self.fade = None;
    }

    fn schedule_fade(&mut self, from: f32, to: f32, secs: f32) {
        if secs <= 0.0 {
            self.weight = to;
            self.fade = None;
            if to <= 0.0 {
                self.enabled = false;
            }
            return;
        }
        self.weight = from;
        self.fade = Some(WeightFade {
            from,
            to,
            elapsed: 0.0,
            duration: secs,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/mixer.rs"]
mod tests;
