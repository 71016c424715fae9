use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;

use crate::animation::clip::{Clip, Track};
use crate::animation::retarget::SourceClip;
use crate::foundation::core::{BoneTransform, Quat, Vec3};
use crate::foundation::error::{StageError, StageResult};
use crate::rig::skeleton::{Bone, Rig};

/// Import every node of a glTF/GLB/VRM file as a rig bone.
///
/// The humanoid table comes from the `VRMC_vrm` (VRM 1) or `VRM` (VRM 0) extension when
/// present; otherwise humanoid bones are detected by node name.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn import_rig(path: &Path) -> StageResult<Rig> {
    let bytes = std::fs::read(path)
        .map_err(|e| StageError::asset(format!("failed to read '{}': {e}", path.display())))?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .map_err(|e| StageError::asset(format!("invalid glTF '{}': {e}", path.display())))?;
    let doc = &gltf.document;

    let names = node_names(doc);
    let mut parents = vec![None; names.len()];
    for node in doc.nodes() {
        for child in node.children() {
            parents[child.index()] = Some(node.index());
        }
    }

    let bones = doc
        .nodes()
        .map(|node| Bone {
            name: names[node.index()].clone(),
            parent: parents[node.index()],
            rest: rest_transform(&node),
        })
        .collect();

    let humanoid = vrm_humanoid(&bytes, &names)?;
    tracing::debug!(nodes = names.len(), humanoid = humanoid.len(), "imported glTF rig");
    Rig::new(bones, &humanoid)
}

/// Import the first animation of a glTF file, with the rest translation of every node.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn import_clip(path: &Path) -> StageResult<SourceClip> {
    let gltf = gltf::Gltf::open(path)
        .map_err(|e| StageError::asset(format!("invalid glTF '{}': {e}", path.display())))?;
    let buffers = gltf::import_buffers(&gltf.document, path.parent(), gltf.blob.clone())
        .map_err(|e| {
            StageError::asset(format!("failed to load buffers of '{}': {e}", path.display()))
        })?;
    let doc = &gltf.document;
    let names = node_names(doc);

    let anim = doc.animations().next().ok_or_else(|| {
        StageError::asset(format!("'{}' contains no animations", path.display()))
    })?;

    let mut tracks = Vec::new();
    for channel in anim.channels() {
        let bone = names[channel.target().node().index()].clone();
        let spline = channel.sampler().interpolation() == Interpolation::CubicSpline;
        let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                let values = spline_values(values.map(Vec3::from).collect(), spline);
                tracks.push(Track::translation(bone, times, values));
            }
            Some(ReadOutputs::Rotations(values)) => {
                let values =
                    spline_values(values.into_f32().map(Quat::from_array).collect(), spline);
                tracks.push(Track::rotation(bone, times, values));
            }
            _ => {}
        }
    }

    let name = anim
        .name()
        .map(str::to_owned)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let clip = Clip::from_tracks(name, tracks);
    clip.validate()?;

    let skeleton = doc
        .nodes()
        .map(|node| (names[node.index()].clone(), rest_transform(&node).translation))
        .collect();

    Ok(SourceClip { clip, skeleton })
}

fn rest_transform(node: &gltf::Node<'_>) -> BoneTransform {
    let (t, r, s) = node.transform().decomposed();
    BoneTransform {
        translation: Vec3::from(t),
        rotation: Quat::from_array(r),
        scale: Vec3::from(s),
    }
}

// Unnamed or repeated node names get an index suffix so every bone name is unique.
fn node_names(doc: &gltf::Document) -> Vec<String> {
    let mut seen = BTreeSet::new();
    doc.nodes()
        .map(|node| {
            let base = node
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("node_{}", node.index()));
            let name = if seen.contains(&base) {
                format!("{base}#{}", node.index())
            } else {
                base
            };
            seen.insert(name.clone());
            name
        })
        .collect()
}

// Cubic spline outputs store (in-tangent, value, out-tangent) per key.
fn spline_values<T: Copy>(values: Vec<T>, spline: bool) -> Vec<T> {
    if !spline {
        return values;
    }
    values.chunks_exact(3).map(|c| c[1]).collect()
}

fn vrm_humanoid(bytes: &[u8], names: &[String]) -> StageResult<BTreeMap<String, String>> {
    let json: Cow<'_, [u8]> = if bytes.starts_with(b"glTF") {
        gltf::Glb::from_slice(bytes)
            .map_err(|e| StageError::asset(format!("invalid GLB container: {e}")))?
            .json
    } else {
        Cow::Borrowed(bytes)
    };
    let root: serde_json::Value = serde_json::from_slice(&json)
        .map_err(|e| StageError::asset(format!("invalid glTF json: {e}")))?;
    let ext = &root["extensions"];

    let mut pairs: Vec<(String, u64)> = Vec::new();
    if let Some(bones) = ext["VRMC_vrm"]["humanoid"]["humanBones"].as_object() {
        for (human, entry) in bones {
            if let Some(node) = entry["node"].as_u64() {
                pairs.push((human.clone(), node));
            }
        }
    } else if let Some(bones) = ext["VRM"]["humanoid"]["humanBones"].as_array() {
        for entry in bones {
            if let (Some(human), Some(node)) = (entry["bone"].as_str(), entry["node"].as_u64()) {
                pairs.push((human.to_owned(), node));
            }
        }
    }

    let mut out = BTreeMap::new();
    for (human, node) in pairs {
        match names.get(node as usize) {
            Some(name) => {
                out.insert(human, name.clone());
            }
            None => tracing::warn!(bone = %human, node, "VRM humanoid bone references missing node"),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/gltf_import.rs"]
mod tests;
