use std::sync::Arc;

use crate::assets::background::{BackgroundImage, UvRect};
use crate::foundation::core::{Affine3A, Mat4, Vec3, Viewport};
use crate::foundation::error::StageResult;

/// Perspective camera framing the avatar.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub target: Vec3,
}

impl Camera {
    /// Camera at head height looking at the upper body.
    pub fn new(fov_y_deg: f32, viewport: Viewport) -> Self {
        Self {
            fov_y_deg,
            aspect: viewport.aspect(),
            near: 0.1,
            far: 20.0,
            eye: Vec3::new(0.0, 1.4, 1.6),
            target: Vec3::new(0.0, 1.3, 0.0),
        }
    }

    /// Follow a resized output surface.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct SceneFrame {
    /// Monotonic frame counter.
    pub index: u64,
    /// Seconds since the session started ticking.
    pub elapsed: f32,
    pub viewport: Viewport,
    pub view_projection: Mat4,
    /// Current action name.
    pub action: Option<String>,
    /// World transform per rig bone.
    pub bones: Vec<Affine3A>,
    /// Expression channel weights, blink included.
    pub expressions: Vec<(String, f32)>,
    /// Mouth-shape weights.
    pub mouth: Vec<(String, f32)>,
    /// Background image and the crop that covers the viewport.
    pub background: Option<Arc<BackgroundImage>>,
    pub background_uv: Option<UvRect>,
}

/// Drawing capability the session renders into once per tick.
pub trait Renderer: Send {
    /// Called when the output surface changes size, and once when the session starts.
    fn resize(&mut self, viewport: Viewport) -> StageResult<()>;
    /// Draw one frame.
    fn render(&mut self, frame: &SceneFrame) -> StageResult<()>;
}

/// Frames a [`HeadlessRenderer::new`] renderer retains.
pub const DEFAULT_FRAME_HISTORY: usize = 120;

/// Renderer that records the most recent frames in memory; for tests and headless runs.
#[derive(Debug)]
pub struct HeadlessRenderer {
    viewport: Option<Viewport>,
    frames: Vec<SceneFrame>,
    keep_last: usize,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::keep_last(DEFAULT_FRAME_HISTORY)
    }
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the most recent `n` frames.
    pub fn keep_last(n: usize) -> Self {
        Self {
            viewport: None,
            frames: Vec::new(),
            keep_last: n.max(1),
        }
    }

    /// Surface size from the last `resize`.
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Recorded frames, oldest first.
    pub fn frames(&self) -> &[SceneFrame] {
        &self.frames
    }
}

impl Renderer for HeadlessRenderer {
    fn resize(&mut self, viewport: Viewport) -> StageResult<()> {
        self.viewport = Some(viewport);
        Ok(())
    }

    fn render(&mut self, frame: &SceneFrame) -> StageResult<()> {
        if self.frames.len() >= self.keep_last {
            let excess = self.frames.len() + 1 - self.keep_last;
            self.frames.drain(..excess);
        }
        self.frames.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stage/render.rs"]
mod tests;
