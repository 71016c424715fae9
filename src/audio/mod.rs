pub mod clip;
pub mod voice;

pub use clip::{AudioClip, LEVEL_MAX};
pub use voice::{AudioBank, AudioEnded, CompletionToken};
