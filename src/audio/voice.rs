use std::sync::Arc;

use crate::audio::clip::AudioClip;

/// Handle identifying one completion registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CompletionToken(u64);

/// Emitted by [`AudioBank::advance`] when a voice plays to its end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioEnded {
    /// Voice slot that stopped.
    pub voice: usize,
    /// Completion registration consumed by this end, if one was active.
    pub completion: Option<CompletionToken>,
}

#[derive(Debug)]
struct Voice {
    clip: Arc<AudioClip>,
    cursor: f32,
    playing: bool,
    completion: Option<CompletionToken>,
}

impl Voice {
    fn halt(&mut self) {
        self.playing = false;
        self.cursor = 0.0;
        self.completion = None;
    }
}

/// Headless playback for a fixed set of audio voices, one per slot.
///
/// Voices advance with the frame clock. Each voice has at most one completion registration,
/// fired once when the voice reaches its end and dropped whenever the voice is stopped.
#[derive(Debug)]
pub struct AudioBank {
    voices: Vec<Option<Voice>>,
    analyzer_window: f32,
    next_token: u64,
}

impl AudioBank {
    /// Create a bank with `slots` empty voices.
    pub fn new(slots: usize, analyzer_window: f32) -> Self {
        Self {
            voices: (0..slots).map(|_| None).collect(),
            analyzer_window,
            next_token: 0,
        }
    }

    /// Attach a decoded clip to `slot`, replacing any previous voice.
    pub fn insert(&mut self, slot: usize, clip: Arc<AudioClip>) {
        if let Some(entry) = self.voices.get_mut(slot) {
            *entry = Some(Voice {
                clip,
                cursor: 0.0,
                playing: false,
                completion: None,
            });
        }
    }

    /// Whether `slot` holds a clip.
    pub fn contains(&self, slot: usize) -> bool {
        self.voice(slot).is_some()
    }

    /// Clip length of `slot`.
    pub fn duration(&self, slot: usize) -> Option<f32> {
        self.voice(slot).map(|v| v.clip.duration_secs())
    }

    /// Playback position of `slot`.
    pub fn position(&self, slot: usize) -> Option<f32> {
        self.voice(slot).map(|v| v.cursor)
    }

    /// Whether `slot` is currently playing.
    pub fn is_playing(&self, slot: usize) -> bool {
        self.voice(slot).is_some_and(|v| v.playing)
    }

    /// Whether any voice is playing.
    pub fn any_playing(&self) -> bool {
        self.voices.iter().flatten().any(|v| v.playing)
    }

    /// Start `slot` from the beginning. Returns `false` when the slot is empty.
    pub fn play(&mut self, slot: usize) -> bool {
        match self.voice_mut(slot) {
            Some(v) => {
                v.cursor = 0.0;
                v.playing = true;
                true
            }
            None => false,
        }
    }

    /// Stop every voice except `keep`, dropping their completion registrations.
    pub fn stop_all_except(&mut self, keep: Option<usize>) {
        for (slot, v) in self.voices.iter_mut().enumerate() {
            if Some(slot) != keep
                && let Some(v) = v
            {
                v.halt();
            }
        }
    }

    /// Register a completion for `slot`, replacing any earlier one.
    pub fn subscribe_completion(&mut self, slot: usize) -> Option<CompletionToken> {
        let token = CompletionToken(self.next_token);
        let v = self.voices.get_mut(slot)?.as_mut()?;
        v.completion = Some(token);
        self.next_token += 1;
        Some(token)
    }

    /// Drop the completion registration of `slot`.
    pub fn clear_completion(&mut self, slot: usize) {
        if let Some(v) = self.voice_mut(slot) {
            v.completion = None;
        }
    }

    /// Active completion registration of `slot`.
    pub fn completion(&self, slot: usize) -> Option<CompletionToken> {
        self.voice(slot).and_then(|v| v.completion)
    }

    /// Analyzer reading of `slot`: the RMS level behind the cursor while playing, 0 otherwise.
    pub fn level(&self, slot: usize) -> Option<f32> {
        let v = self.voice(slot)?;
        if !v.playing {
            return Some(0.0);
        }
        Some(v.clip.level_at(v.cursor, self.analyzer_window))
    }

    /// Advance every playing voice by `dt` seconds, appending an event per voice that ended.
    pub fn advance(&mut self, dt: f32, out: &mut Vec<AudioEnded>) {
        let dt = dt.max(0.0);
        for (slot, v) in self.voices.iter_mut().enumerate() {
            let Some(v) = v else { continue };
            if !v.playing {
                continue;
            }
            v.cursor += dt;
            let end = v.clip.duration_secs();
            if v.cursor >= end {
                v.cursor = end;
                v.playing = false;
                out.push(AudioEnded {
                    voice: slot,
                    completion: v.completion.take(),
                });
            }
        }
    }

    fn voice(&self, slot: usize) -> Option<&Voice> {
        self.voices.get(slot).and_then(Option::as_ref)
    }

    fn voice_mut(&mut self, slot: usize) -> Option<&mut Voice> {
        self.voices.get_mut(slot).and_then(Option::as_mut)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/voice.rs"]
mod tests;
