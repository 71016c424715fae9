//! Real-time humanoid avatar control: retargets animation clips onto a rig, blends facial
//! expressions and lip-sync, and sequences reaction actions over an idle loop.
//!
//! [`StageSession`] is the entry point. It is built from a [`StageConfig`], loads its assets
//! once, and is then ticked once per display frame while external code calls
//! [`StageSession::play_action`].

#![forbid(unsafe_code)]

pub mod animation;
pub mod assets;
pub mod audio;
pub mod face;
pub mod foundation;
pub mod rig;
pub mod stage;

pub use animation::{
    AnimationMixer, Clip, LoopPolicy, MixerEvent, RetargetError, SourceClip, Track,
    TrackValues, retarget_mapped, retarget_native,
};
pub use assets::{AssetRoot, BackgroundImage, load_native_clip, load_rig, load_source_clip};
pub use audio::{AudioBank, AudioClip, AudioEnded, CompletionToken};
pub use face::{ExpressionBlender, LipSync};
pub use foundation::core::{BoneTransform, Lerp, SecsRange, Viewport};
pub use foundation::error::{StageError, StageResult};
pub use rig::{Bone, BoneMap, Pose, Rig};
pub use stage::{
    HeadlessRenderer, LoadReport, Renderer, SceneFrame, SequencerState, StageConfig,
    StageSession, StageSnapshot,
};
