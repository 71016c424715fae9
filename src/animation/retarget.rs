//! Mapping externally authored clips onto the rig's humanoid bones.

use std::collections::BTreeMap;

use crate::animation::clip::{Clip, Track, TrackValues};
use crate::foundation::core::Vec3;
use crate::rig::humanoid::{BoneMap, HIPS};
use crate::rig::skeleton::Rig;

const MIN_SOURCE_HIP_HEIGHT: f32 = 1e-6;

/// Structural failures that make a clip unusable for the rig.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RetargetError {
    /// The source clip carries no tracks.
    #[error("clip has no animation data")]
    EmptyClip,

    /// The source skeleton has no node mapped to the named humanoid bone.
    #[error("source skeleton has no bone mapped to '{bone}'")]
    MissingSourceBone {
        /// Humanoid bone that could not be found.
        bone: String,
    },

    /// The target rig exposes no node for the named humanoid bone.
    #[error("target rig has no humanoid bone '{bone}'")]
    MissingTargetBone {
        /// Humanoid bone that could not be found.
        bone: String,
    },

    /// The source clip does not translate its root bone.
    #[error("clip has no root translation track")]
    MissingRootTranslation,

    /// The source root rests at a height that cannot be used as a divisor.
    #[error("source hip height {0} cannot be used for scaling")]
    DegenerateHipHeight(f32),
}

/// A clip as authored, plus the rest translations of the skeleton it was authored on.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceClip {
    /// Keyframe data keyed by source bone names.
    #[serde(flatten)]
    pub clip: Clip,
    /// Rest local translation per source bone.
    #[serde(default)]
    pub skeleton: BTreeMap<String, Vec3>,
}

/// Retarget a clip authored on a foreign skeleton.
///
/// Tracks resolve through `map` to humanoid bones and then to rig nodes; unmapped tracks are
/// dropped. Rotations are copied verbatim. Only the hips keep translation, with the vertical
/// component scaled by `rig hip height / source hip height`.
#[tracing::instrument(skip_all, fields(clip = %source.clip.name))]
pub fn retarget_mapped(
    source: &SourceClip,
    map: &BoneMap,
    rig: &Rig,
) -> Result<Clip, RetargetError> {
    if source.clip.tracks.is_empty() {
        return Err(RetargetError::EmptyClip);
    }

    let source_hip_y = source
        .skeleton
        .iter()
        .find(|(name, _)| map.humanoid_for(name) == Some(HIPS))
        .map(|(_, rest)| rest.y)
        .ok_or_else(|| RetargetError::MissingSourceBone {
            bone: HIPS.to_owned(),
        })?;

    let target_hip_height = rig.hip_height().ok_or_else(|| RetargetError::MissingTargetBone {
        bone: HIPS.to_owned(),
    })?;

    let has_root_translation = source
        .clip
        .tracks
        .iter()
        .any(|t| t.is_translation() && map.humanoid_for(&t.bone) == Some(HIPS));
    if !has_root_translation {
        return Err(RetargetError::MissingRootTranslation);
    }

    if !source_hip_y.is_finite() || source_hip_y.abs() < MIN_SOURCE_HIP_HEIGHT {
        return Err(RetargetError::DegenerateHipHeight(source_hip_y));
    }
    let scale = target_hip_height / source_hip_y;

    let mut tracks = Vec::with_capacity(source.clip.tracks.len());
    for track in &source.clip.tracks {
        let Some(humanoid) = map.humanoid_for(&track.bone) else {
            continue;
        };
        let Some(node) = rig.humanoid_node_name(humanoid) else {
            continue;
        };
        match &track.values {
            TrackValues::Rotation(values) => {
                tracks.push(Track::rotation(node, track.times.clone(), values.clone()));
            }
            TrackValues::Translation(values) if humanoid == HIPS => {
                let scaled = values
                    .iter()
                    .map(|v| Vec3::new(v.x, v.y * scale, v.z))
                    .collect();
                tracks.push(Track::translation(node, track.times.clone(), scaled));
            }
            TrackValues::Translation(_) => {}
        }
    }

    tracing::debug!(
        kept = tracks.len(),
        dropped = source.clip.tracks.len() - tracks.len(),
        scale,
        "retargeted mapped clip"
    );

    Ok(Clip {
        name: source.clip.name.clone(),
        duration: source.clip.duration,
        tracks,
    })
}

/// Retarget a clip already authored against humanoid bone names.
///
/// Tracks bind to the rig node of the same humanoid bone; bones the rig lacks are dropped, and
/// translation survives only on the hips. No height compensation is applied.
#[tracing::instrument(skip_all, fields(clip = %source.name))]
pub fn retarget_native(source: &Clip, rig: &Rig) -> Result<Clip, RetargetError> {
    if source.tracks.is_empty() {
        return Err(RetargetError::EmptyClip);
    }

    let tracks: Vec<Track> = source
        .tracks
        .iter()
        .filter(|t| !t.is_translation() || t.bone == HIPS)
        .filter_map(|t| {
            let node = rig.humanoid_node_name(&t.bone)?;
            Some(Track {
                bone: node.to_owned(),
                times: t.times.clone(),
                values: t.values.clone(),
            })
        })
        .collect();

    tracing::debug!(
        kept = tracks.len(),
        dropped = source.tracks.len() - tracks.len(),
        "retargeted native clip"
    );

    Ok(Clip {
        name: source.name.clone(),
        duration: source.duration,
        tracks,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/animation/retarget.rs"]
mod tests;
