use crate::foundation::error::{StageError, StageResult};

pub use glam::{Affine3A, Mat4, Quat, Vec3};

/// Interpolation contract for animated value types.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t` in `[0, 1]`.
    fn lerp(a: &Self, b: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Quat {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        a.slerp(*b, t)
    }
}

/// Move `current` toward `target` by a fixed fraction of the remaining distance.
///
/// The factor is applied once per frame, so convergence speed follows the tick rate.
pub fn approach(current: f32, target: f32, factor: f32) -> f32 {
    <f32 as Lerp>::lerp(&current, &target, factor)
}

/// Local translation/rotation/scale of one bone.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoneTransform {
    /// Translation relative to the parent bone.
    pub translation: Vec3,
    /// Rotation relative to the parent bone.
    pub rotation: Quat,
    /// Non-uniform scale.
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTransform {
    /// Compose into an affine matrix (scale, then rotate, then translate).
    pub fn to_affine(self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Closed interval of seconds `[min, max]` used for randomized timers.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SecsRange {
    /// Lower bound in seconds.
    pub min: f32,
    /// Upper bound in seconds.
    pub max: f32,
}

impl SecsRange {
    /// Create a validated range with `0 <= min <= max`.
    pub fn new(min: f32, max: f32) -> StageResult<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Validate ordering and finiteness.
    pub fn validate(self) -> StageResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(StageError::config("time range bounds must be finite"));
        }
        if self.min < 0.0 || self.min > self.max {
            return Err(StageError::config("time range must satisfy 0 <= min <= max"));
        }
        Ok(())
    }

    /// Draw a duration uniformly from the range.
    pub fn sample(self, rng: &mut impl rand::Rng) -> f32 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// Output surface size, updated on window resize.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Surface size in pixels.
    pub size: kurbo::Size,
}

impl Viewport {
    /// Create a viewport; zero-sized surfaces are allowed and report an aspect of 1.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: kurbo::Size::new(width.max(0.0), height.max(0.0)),
        }
    }

    /// Width over height, falling back to 1 for degenerate surfaces.
    pub fn aspect(self) -> f32 {
        if self.size.height <= 0.0 || self.size.width <= 0.0 {
            return 1.0;
        }
        (self.size.width / self.size.height) as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
