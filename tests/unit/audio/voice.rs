use super::*;

fn clip(secs: f32) -> Arc<AudioClip> {
    let rate = 100;
    let n = (secs * rate as f32).round() as usize;
    Arc::new(AudioClip::from_samples(rate, vec![0.4; n]).unwrap())
}

fn bank() -> AudioBank {
    let mut bank = AudioBank::new(3, 0.05);
    bank.insert(0, clip(1.0));
    bank.insert(1, clip(0.5));
    bank
}

#[test]
fn completion_fires_once_at_end() {
    let mut b = bank();
    assert!(b.play(1));
    let token = b.subscribe_completion(1).unwrap();
    let mut events = Vec::new();
    b.advance(0.3, &mut events);
    assert!(events.is_empty());
    assert!(b.is_playing(1));
    b.advance(0.3, &mut events);
    assert_eq!(
        events,
        vec![AudioEnded {
            voice: 1,
            completion: Some(token)
        }]
    );
    assert!(!b.is_playing(1));
    assert_eq!(b.completion(1), None);

    events.clear();
    b.advance(1.0, &mut events);
    assert!(events.is_empty());
}

#[test]
fn stop_all_except_clears_other_registrations() {
    let mut b = bank();
    b.play(0);
    b.subscribe_completion(0);
    b.play(1);
    b.subscribe_completion(1);
    b.stop_all_except(Some(1));
    assert!(!b.is_playing(0));
    assert_eq!(b.completion(0), None);
    assert!(b.is_playing(1));
    assert!(b.completion(1).is_some());

    let mut events = Vec::new();
    b.advance(2.0, &mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].voice, 1);
}

#[test]
fn resubscribing_replaces_token() {
    let mut b = bank();
    b.play(0);
    let first = b.subscribe_completion(0).unwrap();
    let second = b.subscribe_completion(0).unwrap();
    assert_ne!(first, second);
    assert_eq!(b.completion(0), Some(second));
    b.clear_completion(0);
    assert_eq!(b.completion(0), None);
}

#[test]
fn empty_slots_are_inert() {
    let mut b = bank();
    assert!(!b.contains(2));
    assert!(!b.play(2));
    assert_eq!(b.subscribe_completion(2), None);
    assert_eq!(b.level(2), None);
    assert_eq!(b.duration(7), None);
}

#[test]
fn level_is_zero_unless_playing() {
    let mut b = bank();
    assert_eq!(b.level(0), Some(0.0));
    b.play(0);
    let mut events = Vec::new();
    b.advance(0.2, &mut events);
    let level = b.level(0).unwrap();
    assert!((level - 0.4 * crate::audio::clip::LEVEL_MAX).abs() < 1e-2, "{level}");
    assert!(b.any_playing());
}
