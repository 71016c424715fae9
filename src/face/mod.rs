pub mod expression;
pub mod lipsync;

pub use expression::{BLINK, BlinkState, ExpressionBlender, ExpressionSettings, Weight};
pub use lipsync::{LipSettings, LipSync};
