use std::collections::BTreeMap;
use std::sync::Arc;

use super::*;
use crate::animation::clip::{Clip, Track};
use crate::audio::clip::AudioClip;
use crate::face::expression::ExpressionSettings;
use crate::face::lipsync::LipSettings;
use crate::foundation::core::{BoneTransform, Quat, SecsRange};
use crate::rig::skeleton::{Bone, Rig};
use crate::stage::config::StageConfig;

const IDLE: ActionId = ActionId(0);
const YES: ActionId = ActionId(1);
const NO: ActionId = ActionId(2);
const NOD: ActionId = ActionId(3);
const BROKEN: ActionId = ActionId(4);

struct Harness {
    seq: Sequencer,
    mixer: AnimationMixer,
    audio: AudioBank,
    expressions: ExpressionBlender,
    lips: LipSync,
}

fn clip(name: &str, secs: f32) -> Arc<Clip> {
    Arc::new(Clip::from_tracks(
        name,
        vec![Track::rotation(
            "hips",
            vec![0.0, secs],
            vec![Quat::IDENTITY, Quat::from_rotation_y(0.5)],
        )],
    ))
}

fn wav(secs: f32) -> Arc<AudioClip> {
    let n = (secs * 100.0).round() as usize;
    Arc::new(AudioClip::from_samples(100, vec![0.3; n]).unwrap())
}

fn harness() -> Harness {
    let config = StageConfig::from_json(
        r#"{
          "rig": "rig.json",
          "expressions": ["happy", "angry"],
          "actions": [
            {"name": "idle", "animation": {"path": "idle.json"}},
            {"name": "yes", "animation": {"path": "yes.json"}, "audio": "yes.wav",
             "expression": "happy"},
            {"name": "no", "animation": {"path": "no.json"}, "audio": "no.wav",
             "expression": "angry"},
            {"name": "nod", "animation": {"path": "nod.json"}},
            {"name": "broken", "animation": {"path": "broken.json"}}
          ]
        }"#,
    )
    .unwrap();
    let table = ActionTable::from_config(&config).unwrap();
    let rig = Rig::new(
        vec![Bone {
            name: "hips".to_owned(),
            parent: None,
            rest: BoneTransform::default(),
        }],
        &BTreeMap::new(),
    )
    .unwrap();

    let mut mixer = AnimationMixer::new(table.len());
    mixer.insert(IDLE.0, clip("idle", 4.0), &rig);
    mixer.insert(YES.0, clip("yes", 2.0), &rig);
    mixer.insert(NO.0, clip("no", 1.5), &rig);
    mixer.insert(NOD.0, clip("nod", 1.0), &rig);

    let mut audio = AudioBank::new(table.len(), 0.05);
    audio.insert(YES.0, wav(3.5));
    audio.insert(NO.0, wav(1.0));

    let expressions = ExpressionBlender::new(
        ["happy", "angry"],
        Some("happy"),
        ExpressionSettings {
            smoothing: 0.1,
            blink_interval: SecsRange::new(1.0, 5.0).unwrap(),
            blink_duration: 0.2,
        },
        1,
    );
    let lips = LipSync::new(
        &[("aa".to_owned(), 1.0)].into_iter().collect(),
        LipSettings {
            smoothing: 0.3,
            hold: SecsRange::new(0.08, 0.2).unwrap(),
            amplitude_ceiling: 50.0,
        },
        1,
    )
    .unwrap();

    let usable = vec![true, true, true, true, false];
    let seq = Sequencer::new(
        table,
        usable,
        Fades {
            crossfade: 0.5,
            idle_return: 1.0,
        },
    );
    let mut h = Harness {
        seq,
        mixer,
        audio,
        expressions,
        lips,
    };
    h.with(|seq, cx| seq.start(cx));
    h
}

impl Harness {
    fn with<T>(&mut self, f: impl FnOnce(&mut Sequencer, &mut Channels<'_>) -> T) -> T {
        let mut cx = Channels {
            mixer: &mut self.mixer,
            audio: &mut self.audio,
            expressions: &mut self.expressions,
            lips: &mut self.lips,
        };
        f(&mut self.seq, &mut cx)
    }

    fn play(&mut self, name: &str) -> bool {
        self.with(|seq, cx| seq.play(name, cx))
    }

    fn advance(&mut self, secs: f32) {
        let dt = 1.0 / 60.0;
        let steps = (secs / dt).round() as usize;
        for _ in 0..steps {
            let mut mixer_events = Vec::new();
            let mut audio_events = Vec::new();
            self.mixer.update(dt, &mut mixer_events);
            self.audio.advance(dt, &mut audio_events);
            self.with(|seq, cx| {
                for e in audio_events {
                    seq.on_audio_ended(e, cx);
                }
                for e in mixer_events {
                    seq.on_mixer_event(e, cx);
                }
            });
        }
    }
}

#[test]
fn start_runs_idle_at_full_weight() {
    let h = harness();
    assert_eq!(h.seq.current(), Some(IDLE));
    assert_eq!(h.seq.state(), SequencerState::Idle);
    assert_eq!(h.mixer.weight(IDLE.0), Some(1.0));
    assert_eq!(h.mixer.policy(IDLE.0), Some(LoopPolicy::Repeat));
}

#[test]
fn shorter_clip_than_audio_loops_until_audio_ends() {
    let mut h = harness();
    assert!(h.play("yes"));
    assert_eq!(h.seq.state(), SequencerState::Playing(YES));
    assert_eq!(h.mixer.policy(YES.0), Some(LoopPolicy::Repeat));
    assert_eq!(h.expressions.target("happy"), Some(1.0));
    assert!(h.audio.is_playing(YES.0));
    assert_eq!(h.lips.source(), Some(YES.0));

    h.advance(3.0);
    assert_eq!(h.seq.current(), Some(YES));
    assert!(h.mixer.is_running(YES.0));

    h.advance(0.6);
    assert_eq!(h.seq.current(), Some(IDLE));
    assert_eq!(h.expressions.active_target(), None);
    assert_eq!(h.lips.source(), None);
}

#[test]
fn retrigger_does_not_restart() {
    let mut h = harness();
    h.play("yes");
    h.advance(0.7);
    let time = h.mixer.time(YES.0).unwrap();
    let position = h.audio.position(YES.0).unwrap();
    assert!(time > 0.6);

    for _ in 0..5 {
        assert!(h.play("yes"));
    }
    assert_eq!(h.mixer.time(YES.0), Some(time));
    assert_eq!(h.audio.position(YES.0), Some(position));
    assert_eq!(h.seq.current(), Some(YES));
    assert!(h.audio.completion(YES.0).is_some());
}

#[test]
fn switching_actions_cancels_previous_completion() {
    let mut h = harness();
    h.play("no");
    h.advance(0.2);
    assert!(h.play("yes"));

    assert!(!h.audio.is_playing(NO.0));
    assert_eq!(h.audio.completion(NO.0), None);
    assert_eq!(h.seq.current(), Some(YES));
    assert_eq!(h.expressions.target("happy"), Some(1.0));
    assert_eq!(h.expressions.target("angry"), Some(0.0));
    assert_eq!(h.lips.source(), Some(YES.0));

    // "no" would have ended here; "yes" must stay current
    h.advance(1.5);
    assert_eq!(h.seq.current(), Some(YES));
    assert!(!h.mixer.is_running(NO.0));
}

#[test]
fn single_shot_without_audio_returns_on_finish() {
    let mut h = harness();
    assert!(h.play("nod"));
    assert_eq!(h.mixer.policy(NOD.0), Some(LoopPolicy::Once));
    assert_eq!(h.lips.source(), None);
    h.advance(0.9);
    assert_eq!(h.seq.current(), Some(NOD));
    h.advance(0.2);
    assert_eq!(h.seq.current(), Some(IDLE));
}

#[test]
fn unknown_and_unusable_actions_are_ignored() {
    let mut h = harness();
    h.play("yes");
    assert!(!h.play("maybe"));
    assert!(!h.play("broken"));
    assert_eq!(h.seq.current(), Some(YES));
    assert!(!h.seq.is_usable(BROKEN));
    assert!(h.audio.is_playing(YES.0));
}

#[test]
fn return_to_idle_is_reentrant_safe() {
    let mut h = harness();
    assert!(!h.with(|seq, cx| seq.return_to_idle(IDLE, cx)));
    h.play("yes");
    assert!(!h.with(|seq, cx| seq.return_to_idle(NO, cx)));
    assert!(h.with(|seq, cx| seq.return_to_idle(YES, cx)));
    assert!(!h.with(|seq, cx| seq.return_to_idle(YES, cx)));
    assert_eq!(h.seq.current(), Some(IDLE));
}

#[test]
fn playing_idle_explicitly_keeps_it_looping() {
    let mut h = harness();
    h.play("nod");
    assert!(h.play("idle"));
    assert_eq!(h.seq.state(), SequencerState::Idle);
    assert_eq!(h.mixer.policy(IDLE.0), Some(LoopPolicy::Repeat));
}
