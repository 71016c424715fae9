use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::Viewport;
use crate::foundation::error::StageResult;

/// Decoded background image, straight RGBA8.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub rgba8: Arc<[u8]>,
}

/// Normalized texture rectangle `[u0, v0, u1, v1]`.
pub type UvRect = [f32; 4];

impl BackgroundImage {
    /// Crop that fills `viewport` without stretching, centered on the image.
    pub fn cover_uv(&self, viewport: Viewport) -> UvRect {
        let image_aspect = self.width.max(1) as f32 / self.height.max(1) as f32;
        let view_aspect = viewport.aspect();
        if view_aspect > image_aspect {
            // wider view: crop top and bottom
            let h = image_aspect / view_aspect;
            let v0 = (1.0 - h) * 0.5;
            [0.0, v0, 1.0, v0 + h]
        } else {
            let w = view_aspect / image_aspect;
            let u0 = (1.0 - w) * 0.5;
            [u0, 0.0, u0 + w, 1.0]
        }
    }
}

/// Read and decode a background image (any format the `image` crate recognizes).
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_background(path: &Path) -> StageResult<BackgroundImage> {
    let rgba = image::open(path)
        .with_context(|| format!("decode background image '{}'", path.display()))?
        .into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(BackgroundImage {
        width,
        height,
        rgba8: rgba.into_raw().into(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/background.rs"]
mod tests;
