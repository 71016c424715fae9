use super::*;

fn ramp() -> Track {
    Track::translation(
        "hips",
        vec![0.0, 1.0, 2.0],
        vec![Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 2.0, 4.0)],
    )
}

#[test]
fn translation_interpolates_between_keys() {
    let Some(TrackSample::Translation(v)) = ramp().sample(0.5) else {
        panic!("expected translation sample");
    };
    assert!(v.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
}

#[test]
fn sampling_outside_key_range_holds_end_keys() {
    let track = ramp();
    assert_eq!(track.sample(-1.0), Some(TrackSample::Translation(Vec3::ZERO)));
    assert_eq!(
        track.sample(10.0),
        Some(TrackSample::Translation(Vec3::new(0.0, 2.0, 4.0)))
    );
}

#[test]
fn rotation_samples_are_normalized_slerps() {
    let track = Track::rotation(
        "spine",
        vec![0.0, 1.0],
        vec![Quat::IDENTITY, Quat::from_rotation_x(1.0)],
    );
    let Some(TrackSample::Rotation(q)) = track.sample(0.5) else {
        panic!("expected rotation sample");
    };
    assert!(q.is_normalized());
    assert!(q.abs_diff_eq(Quat::from_rotation_x(0.5), 1e-5));
}

#[test]
fn duration_comes_from_last_key() {
    let clip = Clip::from_tracks(
        "walk",
        vec![ramp(), Track::rotation("spine", vec![0.0, 3.5], vec![Quat::IDENTITY; 2])],
    );
    assert_eq!(clip.duration, 3.5);
    assert!(clip.validate().is_ok());
}

#[test]
fn validate_rejects_unsorted_and_mismatched_tracks() {
    let unsorted = Track::rotation("a", vec![1.0, 0.0], vec![Quat::IDENTITY; 2]);
    assert!(unsorted.validate().is_err());

    let mismatched = Track::rotation("a", vec![0.0, 1.0], vec![Quat::IDENTITY]);
    assert!(mismatched.validate().is_err());

    let empty = Track::translation("a", vec![], vec![]);
    assert!(empty.validate().is_err());
}

#[test]
fn track_json_uses_kind_tag() {
    let json = serde_json::json!({
        "bone": "hips",
        "times": [0.0, 1.0],
        "kind": "translation",
        "values": [[0.0, 1.0, 0.0], [0.0, 1.5, 0.0]]
    });
    let track: Track = serde_json::from_value(json).unwrap();
    assert!(track.is_translation());
    assert_eq!(track.values.len(), 2);
}

#[test]
fn track_json_rejects_wrong_arity() {
    let json = serde_json::json!({
        "bone": "hips",
        "times": [0.0],
        "kind": "rotation",
        "values": [[0.0, 1.0, 0.0]]
    });
    assert!(serde_json::from_value::<Track>(json).is_err());
}
