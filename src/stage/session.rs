use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::animation::mixer::{AnimationMixer, LoopPolicy, MixerEvent};
use crate::assets::background::BackgroundImage;
use crate::assets::paths::AssetRoot;
use crate::audio::voice::{AudioBank, AudioEnded};
use crate::face::expression::{BlinkState, ExpressionBlender, ExpressionSettings};
use crate::face::lipsync::{LipSettings, LipSync};
use crate::foundation::core::Viewport;
use crate::foundation::error::{StageError, StageResult};
use crate::rig::skeleton::{Pose, Rig};
use crate::stage::config::StageConfig;
use crate::stage::loader::{LoadReport, load_assets};
use crate::stage::registry::{ActionId, ActionTable};
use crate::stage::render::{Camera, Renderer, SceneFrame};
use crate::stage::sequencer::{Channels, Fades, Sequencer, SequencerState};

/// Session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Constructed; assets not loaded yet.
    Created,
    /// Loaded and ticking.
    Running,
    /// Torn down; ticks and triggers are ignored.
    Disposed,
}

/// Frame counter and elapsed time.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameClock {
    pub frame: u64,
    pub elapsed: f32,
    #[serde(skip)]
    last_instant: Option<Instant>,
}

impl FrameClock {
    /// Advance by one frame of `dt` seconds and return the delta actually applied.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.frame += 1;
        self.elapsed += dt;
        dt
    }

    /// Delta since the previous call, measured on the monotonic clock. The first call yields 0.
    pub fn delta_since_last(&mut self, now: Instant) -> f32 {
        let dt = self
            .last_instant
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last_instant = Some(now);
        dt
    }
}

/// Serializable view of the observable session state after a tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StageSnapshot {
    pub frame: u64,
    pub elapsed: f32,
    pub state: SequencerState,
    pub action: Option<String>,
    pub expression_target: Option<String>,
    pub expressions: BTreeMap<String, f32>,
    pub blink: BlinkState,
    pub mouth: BTreeMap<String, f32>,
    pub amplitude: f32,
    pub audio_playing: bool,
}

/// One avatar viewer: owns every piece of mutable animation state.
///
/// Lifecycle: [`StageSession::new`] → [`StageSession::load`] → [`StageSession::tick`] per frame
/// with [`StageSession::play_action`] between frames → [`StageSession::dispose`].
pub struct StageSession {
    config: StageConfig,
    root: AssetRoot,
    lifecycle: Lifecycle,

    sequencer: Sequencer,
    mixer: AnimationMixer,
    audio: AudioBank,
    expressions: ExpressionBlender,
    lips: LipSync,

    rig: Option<Rig>,
    pose: Pose,
    background: Option<Arc<BackgroundImage>>,
    report: LoadReport,

    viewport: Viewport,
    camera: Camera,
    renderer: Box<dyn Renderer>,
    frame: SceneFrame,
    clock: FrameClock,

    mixer_events: Vec<MixerEvent>,
    audio_events: Vec<AudioEnded>,
}

impl StageSession {
    /// Build a session from a configuration; nothing is loaded until [`StageSession::load`].
    pub fn new(
        config: StageConfig,
        root: AssetRoot,
        renderer: Box<dyn Renderer>,
    ) -> StageResult<Self> {
        config.validate()?;
        let table = ActionTable::from_config(&config).ok_or_else(|| {
            StageError::config(format!("idle action '{}' is not declared", config.idle))
        })?;
        let tuning = &config.tuning;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut seeds = StdRng::seed_from_u64(seed);
        let expressions = ExpressionBlender::new(
            config.expressions.iter().map(String::as_str),
            Some(config.happy_expression.as_str()),
            ExpressionSettings {
                smoothing: tuning.expression_smoothing,
                blink_interval: tuning.blink_interval()?,
                blink_duration: tuning.blink_duration_secs,
            },
            seeds.gen_range(0..=u64::MAX),
        );
        let lips = LipSync::new(
            &config.lip_shapes,
            LipSettings {
                smoothing: tuning.lip_smoothing,
                hold: tuning.lip_hold()?,
                amplitude_ceiling: tuning.amplitude_ceiling,
            },
            seeds.gen_range(0..=u64::MAX),
        )?;

        let slots = table.len();
        let usable = vec![false; slots];
        let sequencer = Sequencer::new(
            table,
            usable,
            Fades {
                crossfade: tuning.crossfade_secs,
                idle_return: tuning.idle_return_secs,
            },
        );
        let viewport = Viewport::default();
        let camera = Camera::new(tuning.camera_fov_deg, viewport);

        Ok(Self {
            mixer: AnimationMixer::new(slots),
            audio: AudioBank::new(slots, tuning.analyzer_window_secs),
            config,
            root,
            lifecycle: Lifecycle::Created,
            sequencer,
            expressions,
            lips,
            rig: None,
            pose: Pose::default(),
            background: None,
            report: LoadReport::default(),
            viewport,
            camera,
            renderer,
            frame: SceneFrame::default(),
            clock: FrameClock::default(),
            mixer_events: Vec::new(),
            audio_events: Vec::new(),
        })
    }

    /// Load every asset, then start the idle loop.
    ///
    /// Individual failures degrade the affected action and are listed in the report.
    #[tracing::instrument(skip_all)]
    pub fn load(&mut self) -> &LoadReport {
        if self.lifecycle != Lifecycle::Created {
            tracing::warn!(lifecycle = ?self.lifecycle, "load ignored");
            return &self.report;
        }

        let loaded = load_assets(&self.config, self.sequencer.table(), &self.root);
        let mut usable = Vec::with_capacity(loaded.actions.len());
        for (slot, runtime) in loaded.actions.into_iter().enumerate() {
            usable.push(runtime.is_usable());
            if !runtime.is_usable() {
                continue;
            }
            if let (Some(rig), Some(clip)) = (loaded.rig.as_ref(), runtime.clip) {
                self.mixer.insert(slot, clip, rig);
            }
            if let Some(audio) = runtime.audio {
                self.audio.insert(slot, audio);
            }
        }

        self.pose = loaded.rig.as_ref().map(Rig::rest_pose).unwrap_or_default();
        self.rig = loaded.rig;
        self.background = loaded.background.map(Arc::new);
        self.report = loaded.report;
        self.sequencer.set_usable(usable);

        if let Err(e) = self.renderer.resize(self.viewport) {
            tracing::warn!(error = %e, "renderer rejected initial size");
        }
        let mut cx = channels(
            &mut self.mixer,
            &mut self.audio,
            &mut self.expressions,
            &mut self.lips,
        );
        self.sequencer.start(&mut cx);
        self.lifecycle = Lifecycle::Running;
        tracing::info!(
            usable = self.report.usable_actions(),
            rig = self.rig.is_some(),
            "stage session running"
        );
        &self.report
    }

    /// Trigger an action by name; unknown or unusable names leave the state unchanged.
    pub fn play_action(&mut self, name: &str) -> bool {
        if self.lifecycle != Lifecycle::Running {
            tracing::debug!(action = name, lifecycle = ?self.lifecycle, "trigger ignored");
            return false;
        }
        let mut cx = channels(
            &mut self.mixer,
            &mut self.audio,
            &mut self.expressions,
            &mut self.lips,
        );
        self.sequencer.play(name, &mut cx)
    }

    /// Run one frame: animation, audio, expressions, lip-sync, pose, then render.
    pub fn tick(&mut self, dt: f32) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        let dt = self.clock.advance(dt);

        self.mixer_events.clear();
        self.audio_events.clear();
        self.mixer.update(dt, &mut self.mixer_events);
        self.audio.advance(dt, &mut self.audio_events);
        {
            let mut cx = channels(
                &mut self.mixer,
                &mut self.audio,
                &mut self.expressions,
                &mut self.lips,
            );
            for ended in self.audio_events.drain(..) {
                self.sequencer.on_audio_ended(ended, &mut cx);
            }
            for event in self.mixer_events.drain(..) {
                self.sequencer.on_mixer_event(event, &mut cx);
            }
        }

        self.expressions.tick(dt);
        let level = self.lips.source().and_then(|voice| self.audio.level(voice));
        self.lips.tick(dt, level);

        if let Some(rig) = &self.rig {
            self.mixer.evaluate(rig, &mut self.pose);
            rig.world_transforms(&self.pose, &mut self.frame.bones);
        }

        self.fill_frame();
        if let Err(e) = self.renderer.render(&self.frame) {
            tracing::warn!(frame = self.clock.frame, error = %e, "render failed");
        }
    }

    /// Run one frame with the delta taken from the monotonic clock at `now`.
    pub fn tick_at(&mut self, now: Instant) {
        let dt = self.clock.delta_since_last(now);
        self.tick(dt);
    }

    /// Update the output surface size and camera projection.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = Viewport::new(width, height);
        self.camera.set_viewport(self.viewport);
        if let Err(e) = self.renderer.resize(self.viewport) {
            tracing::warn!(error = %e, "renderer rejected resize");
        }
    }

    /// Stop all animation and audio, then ignore further ticks and triggers.
    pub fn dispose(&mut self) {
        if self.lifecycle == Lifecycle::Disposed {
            return;
        }
        for slot in 0..self.sequencer.table().len() {
            self.mixer.stop(slot);
        }
        self.audio.stop_all_except(None);
        self.lips.release_source();
        self.lifecycle = Lifecycle::Disposed;
        tracing::info!(frames = self.clock.frame, "stage session disposed");
    }

    fn fill_frame(&mut self) {
        let action = self.current_action().map(str::to_owned);
        let f = &mut self.frame;
        f.index = self.clock.frame;
        f.elapsed = self.clock.elapsed;
        f.viewport = self.viewport;
        f.view_projection = self.camera.view_projection();
        f.action = action;
        f.background_uv = self.background.as_ref().map(|bg| bg.cover_uv(self.viewport));
        f.background.clone_from(&self.background);
        f.expressions.clear();
        f.expressions.extend(
            self.expressions
                .channels()
                .map(|(name, w)| (name.to_owned(), w)),
        );
        f.mouth.clear();
        f.mouth
            .extend(self.lips.channels().map(|(name, w)| (name.to_owned(), w)));
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn rig(&self) -> Option<&Rig> {
        self.rig.as_ref()
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_deref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    /// Scene handed to the renderer on the last tick.
    pub fn frame(&self) -> &SceneFrame {
        &self.frame
    }

    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    /// Name of the current action.
    pub fn current_action(&self) -> Option<&str> {
        self.sequencer
            .current()
            .map(|id| self.sequencer.table().name(id))
    }

    /// Whether the named action loaded and can be triggered.
    pub fn is_action_usable(&self, name: &str) -> bool {
        self.sequencer
            .table()
            .id(name)
            .is_some_and(|id| self.sequencer.is_usable(id))
    }

    /// Animation time cursor of the named action.
    pub fn action_time(&self, name: &str) -> Option<f32> {
        let id = self.sequencer.table().id(name)?;
        self.mixer.time(id.0)
    }

    /// Blend weight of the named action.
    pub fn action_weight(&self, name: &str) -> Option<f32> {
        let id = self.sequencer.table().id(name)?;
        self.mixer.weight(id.0)
    }

    /// Loop policy last applied to the named action.
    pub fn action_policy(&self, name: &str) -> Option<LoopPolicy> {
        let id = self.sequencer.table().id(name)?;
        self.mixer.policy(id.0)
    }

    /// Whether the named action's audio is playing.
    pub fn is_audio_playing(&self, name: &str) -> bool {
        self.sequencer
            .table()
            .id(name)
            .is_some_and(|id| self.audio.is_playing(id.0))
    }

    /// Whether the named action has a pending completion registration.
    pub fn has_completion(&self, name: &str) -> bool {
        self.sequencer
            .table()
            .id(name)
            .is_some_and(|id| self.audio.completion(id.0).is_some())
    }

    pub fn expression_weight(&self, name: &str) -> Option<f32> {
        self.expressions.weight(name)
    }

    pub fn expression_target(&self) -> Option<&str> {
        self.expressions.active_target()
    }

    pub fn blink(&self) -> &BlinkState {
        self.expressions.blink()
    }

    pub fn lip_weight(&self, name: &str) -> Option<f32> {
        self.lips.weight(name)
    }

    /// Lip-sync amplitude computed on the last tick.
    pub fn lip_amplitude(&self) -> f32 {
        self.lips.amplitude()
    }

    /// Name of the action whose analyzer drives lip-sync.
    pub fn lip_source(&self) -> Option<&str> {
        self.lips
            .source()
            .map(|voice| self.sequencer.table().name(ActionId(voice)))
    }

    /// Observable state as a serializable value.
    pub fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            frame: self.clock.frame,
            elapsed: self.clock.elapsed,
            state: self.state(),
            action: self.current_action().map(str::to_owned),
            expression_target: self.expression_target().map(str::to_owned),
            expressions: self
                .expressions
                .channels()
                .map(|(n, w)| (n.to_owned(), w))
                .collect(),
            blink: *self.expressions.blink(),
            mouth: self
                .lips
                .channels()
                .map(|(n, w)| (n.to_owned(), w))
                .collect(),
            amplitude: self.lips.amplitude(),
            audio_playing: self.audio.any_playing(),
        }
    }
}

fn channels<'a>(
    mixer: &'a mut AnimationMixer,
    audio: &'a mut AudioBank,
    expressions: &'a mut ExpressionBlender,
    lips: &'a mut LipSync,
) -> Channels<'a> {
    Channels {
        mixer,
        audio,
        expressions,
        lips,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/session.rs"]
mod tests;
