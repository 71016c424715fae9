use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(StageError::config("x").to_string().contains("config error:"));
    assert!(StageError::asset("x").to_string().contains("asset error:"));
    assert!(StageError::audio("x").to_string().contains("audio error:"));
    assert!(
        StageError::from(RetargetError::EmptyClip)
            .to_string()
            .contains("retarget error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StageError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
