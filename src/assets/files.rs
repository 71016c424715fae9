use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use crate::animation::clip::Clip;
use crate::animation::retarget::SourceClip;
use crate::assets::gltf_import;
use crate::foundation::core::{BoneTransform, Quat, Vec3};
use crate::foundation::error::{StageError, StageResult};
use crate::rig::skeleton::{Bone, Rig};

/// On-disk encodings accepted for rigs and clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetFormat {
    /// Crate-native JSON documents.
    Json,
    /// glTF 2.0, including binary GLB and VRM containers.
    Gltf,
}

impl AssetFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> StageResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("gltf" | "glb" | "vrm") => Ok(Self::Gltf),
            _ => Err(StageError::asset(format!(
                "unsupported asset extension for '{}'",
                path.display()
            ))),
        }
    }
}

#[derive(serde::Deserialize)]
struct RigDoc {
    bones: Vec<BoneDoc>,
    /// humanoid bone -> node name
    #[serde(default)]
    humanoid: BTreeMap<String, String>,
}

#[derive(serde::Deserialize)]
struct BoneDoc {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    translation: Vec3,
    #[serde(default)]
    rotation: Quat,
    #[serde(default = "unit_scale")]
    scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// Load a rig from JSON or glTF.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_rig(path: &Path) -> StageResult<Rig> {
    match AssetFormat::from_path(path)? {
        AssetFormat::Gltf => gltf_import::import_rig(path),
        AssetFormat::Json => {
            let doc: RigDoc = read_json(path)?;
            rig_from_doc(doc)
        }
    }
}

fn rig_from_doc(doc: RigDoc) -> StageResult<Rig> {
    let index: BTreeMap<&str, usize> = doc
        .bones
        .iter()
        .enumerate()
        .map(|(i, b)| (b.name.as_str(), i))
        .collect();

    let mut bones = Vec::with_capacity(doc.bones.len());
    for b in &doc.bones {
        let parent = match b.parent.as_deref() {
            Some(p) => Some(*index.get(p).ok_or_else(|| {
                StageError::asset(format!("bone '{}' has unknown parent '{p}'", b.name))
            })?),
            None => None,
        };
        bones.push(Bone {
            name: b.name.clone(),
            parent,
            rest: BoneTransform {
                translation: b.translation,
                rotation: b.rotation.normalize(),
                scale: b.scale,
            },
        });
    }
    Rig::new(bones, &doc.humanoid)
}

/// Load a clip authored on a foreign skeleton, for name-mapped retargeting.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_source_clip(path: &Path) -> StageResult<SourceClip> {
    match AssetFormat::from_path(path)? {
        AssetFormat::Gltf => gltf_import::import_clip(path),
        AssetFormat::Json => {
            let mut source: SourceClip = read_json(path)?;
            source.clip = finish_clip(source.clip, path)?;
            Ok(source)
        }
    }
}

/// Load a clip authored against humanoid bone names.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_native_clip(path: &Path) -> StageResult<Clip> {
    match AssetFormat::from_path(path)? {
        AssetFormat::Gltf => Ok(gltf_import::import_clip(path)?.clip),
        AssetFormat::Json => {
            let clip: Clip = read_json(path)?;
            finish_clip(clip, path)
        }
    }
}

fn finish_clip(mut clip: Clip, path: &Path) -> StageResult<Clip> {
    if clip.name.is_empty()
        && let Some(stem) = path.file_stem()
    {
        clip.name = stem.to_string_lossy().into_owned();
    }
    let clip = clip.with_derived_duration();
    clip.validate()?;
    Ok(clip)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StageResult<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read asset '{}'", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|e| StageError::asset(format!("invalid JSON in '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/files.rs"]
mod tests;
