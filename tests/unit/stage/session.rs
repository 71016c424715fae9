use super::*;
use crate::stage::render::HeadlessRenderer;

fn config() -> StageConfig {
    StageConfig::from_json(
        r#"{
          "rig": "missing/rig.json",
          "background": "missing/bg.png",
          "expressions": ["happy"],
          "seed": 5,
          "actions": [
            {"name": "idle", "animation": {"path": "missing/idle.json"}},
            {"name": "yes", "animation": {"path": "missing/yes.json"}, "audio": "missing/yes.wav"}
          ]
        }"#,
    )
    .unwrap()
}

fn session() -> StageSession {
    let root = AssetRoot::new(std::env::temp_dir().join("avatar_stage_no_such_dir"));
    StageSession::new(config(), root, Box::new(HeadlessRenderer::new())).unwrap()
}

#[test]
fn clock_ignores_negative_and_non_finite_deltas() {
    let mut clock = FrameClock::default();
    assert_eq!(clock.advance(0.5), 0.5);
    assert_eq!(clock.advance(-1.0), 0.0);
    assert_eq!(clock.advance(f32::NAN), 0.0);
    assert_eq!(clock.frame, 3);
    assert_eq!(clock.elapsed, 0.5);
}

#[test]
fn monotonic_delta_starts_at_zero() {
    let mut clock = FrameClock::default();
    let t0 = std::time::Instant::now();
    assert_eq!(clock.delta_since_last(t0), 0.0);
    let dt = clock.delta_since_last(t0 + std::time::Duration::from_millis(250));
    assert!((dt - 0.25).abs() < 1e-4);
    // Going backwards never produces a negative delta.
    assert_eq!(clock.delta_since_last(t0), 0.0);
}

#[test]
fn tick_at_uses_spacing_between_instants() {
    let mut s = session();
    s.load();
    let t0 = std::time::Instant::now();
    s.tick_at(t0);
    assert_eq!(s.clock().frame, 1);
    assert_eq!(s.clock().elapsed, 0.0);

    s.tick_at(t0 + std::time::Duration::from_millis(100));
    assert_eq!(s.clock().frame, 2);
    assert!((s.clock().elapsed - 0.1).abs() < 1e-4);
}

#[test]
fn triggers_before_load_are_ignored() {
    let mut s = session();
    assert_eq!(s.lifecycle(), Lifecycle::Created);
    assert!(!s.play_action("yes"));
    s.tick(0.016);
    assert_eq!(s.clock().frame, 1);
    assert_eq!(s.current_action(), None);
}

#[test]
fn missing_assets_degrade_without_failing() {
    let mut s = session();
    let report = s.load().clone();
    assert!(report.rig_error.is_some());
    assert!(report.background_error.is_some());
    assert_eq!(report.usable_actions(), 0);
    assert_eq!(s.lifecycle(), Lifecycle::Running);
    assert_eq!(s.current_action(), None);
    assert_eq!(s.state(), SequencerState::Idle);

    assert!(!s.play_action("yes"));
    for _ in 0..30 {
        s.tick(1.0 / 60.0);
    }
    assert_eq!(s.frame().index, 30);
    assert!(s.frame().bones.is_empty());
    assert_eq!(s.frame().expressions.len(), 2);
}

#[test]
fn second_load_is_ignored() {
    let mut s = session();
    s.load();
    s.tick(0.1);
    s.load();
    assert_eq!(s.lifecycle(), Lifecycle::Running);
    assert_eq!(s.clock().frame, 1);
}

#[test]
fn resize_reaches_camera_and_frame() {
    let mut s = session();
    s.load();
    s.resize(800.0, 400.0);
    assert_eq!(s.camera().aspect, 2.0);
    s.tick(0.01);
    assert_eq!(s.frame().viewport, Viewport::new(800.0, 400.0));
}

#[test]
fn dispose_stops_ticking() {
    let mut s = session();
    s.load();
    s.tick(0.01);
    s.dispose();
    s.tick(0.01);
    assert_eq!(s.lifecycle(), Lifecycle::Disposed);
    assert_eq!(s.clock().frame, 1);
    assert!(!s.play_action("idle"));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut cfg = config();
    cfg.idle = "rest".to_owned();
    let root = AssetRoot::new(".");
    assert!(StageSession::new(cfg, root, Box::new(HeadlessRenderer::new())).is_err());
}
