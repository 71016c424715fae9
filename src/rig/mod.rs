pub mod humanoid;
pub mod skeleton;

pub use humanoid::BoneMap;
pub use skeleton::{Bone, Pose, Rig};
