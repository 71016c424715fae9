pub mod clip;
pub mod mixer;
pub mod retarget;

pub use clip::{Clip, Track, TrackSample, TrackValues};
pub use mixer::{AnimationMixer, LoopPolicy, MixerEvent};
pub use retarget::{RetargetError, SourceClip, retarget_mapped, retarget_native};
