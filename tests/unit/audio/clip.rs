use super::*;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "avatar_stage_audio_{name}_{}_{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn decode_wav_downmixes_int_stereo() {
    let dir = temp_dir("stereo");
    let path = dir.join("tone.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..4_000 {
        writer.write_sample(i16::MAX / 2).unwrap();
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let clip = AudioClip::decode_wav(&path).unwrap();
    assert_eq!(clip.sample_rate, 8_000);
    assert_eq!(clip.samples.len(), 4_000);
    assert!((clip.duration_secs() - 0.5).abs() < 1e-6);
    assert!((clip.samples[0] - 0.25).abs() < 1e-3);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn decode_wav_reports_missing_file() {
    let err = AudioClip::decode_wav(std::path::Path::new("/definitely/not/here.wav")).unwrap_err();
    assert!(err.to_string().starts_with("audio error:"));
}

#[test]
fn level_tracks_rms_behind_cursor() {
    let mut samples = vec![0.0; 1_000];
    samples.extend(std::iter::repeat_n(0.5, 1_000));
    let clip = AudioClip::from_samples(1_000, samples).unwrap();
    assert_eq!(clip.level_at(0.5, 0.05), 0.0);
    assert!((clip.level_at(1.5, 0.05) - 0.5 * LEVEL_MAX).abs() < 1e-3);
    assert_eq!(clip.level_at(0.0, 0.05), 0.0);
}

#[test]
fn zero_sample_rate_is_rejected() {
    assert!(AudioClip::from_samples(0, vec![0.0]).is_err());
}
