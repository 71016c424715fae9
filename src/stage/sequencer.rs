use crate::animation::mixer::{AnimationMixer, LoopPolicy, MixerEvent};
use crate::audio::voice::{AudioBank, AudioEnded, CompletionToken};
use crate::face::expression::ExpressionBlender;
use crate::face::lipsync::LipSync;
use crate::stage::registry::{ActionId, ActionTable};

/// Externally visible sequencer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "action")]
pub enum SequencerState {
    /// Resting on the idle loop (or on nothing, when idle failed to load).
    Idle,
    /// A reaction action is current.
    Playing(ActionId),
}

/// Components the sequencer drives, borrowed for the duration of one call.
pub struct Channels<'a> {
    pub mixer: &'a mut AnimationMixer,
    pub audio: &'a mut AudioBank,
    pub expressions: &'a mut ExpressionBlender,
    pub lips: &'a mut LipSync,
}

/// Fade durations used for transitions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fades {
    /// Between triggered actions.
    pub crossfade: f32,
    /// From a finished action back to idle.
    pub idle_return: f32,
}

/// Idle/playing state machine over the action table.
#[derive(Debug)]
pub struct Sequencer {
    table: ActionTable,
    usable: Vec<bool>,
    current: Option<ActionId>,
    // completion registration expected per action
    pending: Vec<Option<CompletionToken>>,
    fades: Fades,
}

impl Sequencer {
    /// Create a sequencer; `usable[i]` says whether action `i` loaded.
    pub fn new(table: ActionTable, usable: Vec<bool>, fades: Fades) -> Self {
        let pending = vec![None; table.len()];
        Self {
            table,
            usable,
            current: None,
            pending,
            fades,
        }
    }

    pub fn table(&self) -> &ActionTable {
        &self.table
    }

    /// Currently active action.
    pub fn current(&self) -> Option<ActionId> {
        self.current
    }

    pub fn state(&self) -> SequencerState {
        match self.current {
            Some(id) if id != self.table.idle() => SequencerState::Playing(id),
            _ => SequencerState::Idle,
        }
    }

    /// Replace the per-action load status after the load phase.
    pub fn set_usable(&mut self, usable: Vec<bool>) {
        self.usable = usable;
    }

    /// Whether `id` loaded and can be triggered.
    pub fn is_usable(&self, id: ActionId) -> bool {
        self.usable.get(id.0).copied().unwrap_or(false)
    }

    /// Start the idle loop at full weight. Does nothing when idle failed to load.
    pub fn start(&mut self, cx: &mut Channels<'_>) {
        let idle = self.table.idle();
        if !self.is_usable(idle) {
            tracing::warn!(action = self.table.name(idle), "idle action unavailable");
            return;
        }
        cx.mixer.set_loop(idle.0, LoopPolicy::Repeat);
        cx.mixer.play(idle.0);
        self.current = Some(idle);
    }

    /// Trigger an action by name. Unknown or unusable names are ignored.
    ///
    /// Returns `true` when the action is current afterwards.
    pub fn play(&mut self, name: &str, cx: &mut Channels<'_>) -> bool {
        let Some(id) = self.table.id(name) else {
            tracing::debug!(action = name, "ignoring unknown action");
            return false;
        };
        if !self.is_usable(id) {
            tracing::debug!(action = name, "ignoring action that failed to load");
            return false;
        }
        self.play_id(id, cx);
        true
    }

    fn play_id(&mut self, id: ActionId, cx: &mut Channels<'_>) {
        let retrigger = self.current == Some(id);

        let policy = if id == self.table.idle() {
            LoopPolicy::Repeat
        } else {
            let clip = cx.mixer.duration(id.0).unwrap_or(0.0);
            LoopPolicy::for_durations(clip, cx.audio.duration(id.0))
        };
        cx.mixer.set_loop(id.0, policy);

        let expression = self.table.get(id).and_then(|a| a.expression.as_deref());
        cx.expressions.set_target(expression);

        cx.audio.stop_all_except(Some(id.0));
        for (slot, pending) in self.pending.iter_mut().enumerate() {
            if slot != id.0 {
                *pending = None;
            }
        }
        if cx.audio.contains(id.0) {
            if !(retrigger && cx.audio.is_playing(id.0)) {
                cx.audio.play(id.0);
            }
            self.pending[id.0] = cx.audio.subscribe_completion(id.0);
            cx.lips.bind_source(id.0);
        } else {
            cx.lips.release_source();
        }

        if retrigger {
            tracing::debug!(action = self.table.name(id), "action already current");
            return;
        }

        if let Some(prev) = self.current {
            cx.mixer.fade_out(prev.0, self.fades.crossfade);
        }
        cx.mixer.reset_and_fade_in(id.0, self.fades.crossfade);
        self.current = Some(id);
        tracing::debug!(action = self.table.name(id), ?policy, "crossfading to action");
    }

    /// Fade `id` out and idle back in, clearing the expression target.
    ///
    /// Does nothing when `id` is idle or no longer current.
    pub fn return_to_idle(&mut self, id: ActionId, cx: &mut Channels<'_>) -> bool {
        let idle = self.table.idle();
        if id == idle || self.current != Some(id) {
            return false;
        }

        cx.mixer.fade_out(id.0, self.fades.idle_return);
        cx.audio.clear_completion(id.0);
        self.pending[id.0] = None;

        if self.is_usable(idle) {
            cx.mixer.set_loop(idle.0, LoopPolicy::Repeat);
            cx.mixer.reset_and_fade_in(idle.0, self.fades.idle_return);
            self.current = Some(idle);
        } else {
            self.current = None;
        }
        cx.expressions.set_target(None);
        tracing::debug!(action = self.table.name(id), "returned to idle");
        true
    }

    /// React to a voice reaching its end.
    pub fn on_audio_ended(&mut self, ended: AudioEnded, cx: &mut Channels<'_>) {
        if cx.lips.source() == Some(ended.voice) {
            cx.lips.release_source();
        }
        let Some(token) = ended.completion else {
            return;
        };
        if self.pending.get(ended.voice).copied().flatten() != Some(token) {
            return;
        }
        self.pending[ended.voice] = None;
        self.return_to_idle(ActionId(ended.voice), cx);
    }

    /// React to a mixer notification.
    pub fn on_mixer_event(&mut self, event: MixerEvent, cx: &mut Channels<'_>) {
        match event {
            MixerEvent::Finished(key) => {
                self.return_to_idle(ActionId(key), cx);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/sequencer.rs"]
mod tests;
