pub mod background;
pub mod files;
pub mod gltf_import;
pub mod paths;

pub use background::{BackgroundImage, UvRect, load_background};
pub use files::{AssetFormat, load_native_clip, load_rig, load_source_clip};
pub use paths::{AssetRoot, normalize_rel_path};
