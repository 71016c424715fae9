//! Humanoid bone vocabulary and the default source-skeleton name table.

use std::collections::BTreeMap;

/// Humanoid bone that carries the free translation channel.
pub const HIPS: &str = "hips";

/// Normalized humanoid bone names (VRM naming).
pub const HUMANOID_BONES: &[&str] = &[
    "hips",
    "spine",
    "chest",
    "upperChest",
    "neck",
    "head",
    "leftEye",
    "rightEye",
    "jaw",
    "leftShoulder",
    "leftUpperArm",
    "leftLowerArm",
    "leftHand",
    "rightShoulder",
    "rightUpperArm",
    "rightLowerArm",
    "rightHand",
    "leftUpperLeg",
    "leftLowerLeg",
    "leftFoot",
    "leftToes",
    "rightUpperLeg",
    "rightLowerLeg",
    "rightFoot",
    "rightToes",
    "leftThumbMetacarpal",
    "leftThumbProximal",
    "leftThumbDistal",
    "leftIndexProximal",
    "leftIndexIntermediate",
    "leftIndexDistal",
    "leftMiddleProximal",
    "leftMiddleIntermediate",
    "leftMiddleDistal",
    "leftRingProximal",
    "leftRingIntermediate",
    "leftRingDistal",
    "leftLittleProximal",
    "leftLittleIntermediate",
    "leftLittleDistal",
    "rightThumbMetacarpal",
    "rightThumbProximal",
    "rightThumbDistal",
    "rightIndexProximal",
    "rightIndexIntermediate",
    "rightIndexDistal",
    "rightMiddleProximal",
    "rightMiddleIntermediate",
    "rightMiddleDistal",
    "rightRingProximal",
    "rightRingIntermediate",
    "rightRingDistal",
    "rightLittleProximal",
    "rightLittleIntermediate",
    "rightLittleDistal",
];

/// Mixamo skeleton names (separator stripped) to humanoid bone names.
const MIXAMO_TABLE: &[(&str, &str)] = &[
    ("mixamorigHips", "hips"),
    ("mixamorigSpine", "spine"),
    ("mixamorigSpine1", "chest"),
    ("mixamorigSpine2", "upperChest"),
    ("mixamorigNeck", "neck"),
    ("mixamorigHead", "head"),
    ("mixamorigLeftShoulder", "leftShoulder"),
    ("mixamorigLeftArm", "leftUpperArm"),
    ("mixamorigLeftForeArm", "leftLowerArm"),
    ("mixamorigLeftHand", "leftHand"),
    ("mixamorigLeftHandThumb1", "leftThumbMetacarpal"),
    ("mixamorigLeftHandThumb2", "leftThumbProximal"),
    ("mixamorigLeftHandThumb3", "leftThumbDistal"),
    ("mixamorigLeftHandIndex1", "leftIndexProximal"),
    ("mixamorigLeftHandIndex2", "leftIndexIntermediate"),
    ("mixamorigLeftHandIndex3", "leftIndexDistal"),
    ("mixamorigLeftHandMiddle1", "leftMiddleProximal"),
    ("mixamorigLeftHandMiddle2", "leftMiddleIntermediate"),
    ("mixamorigLeftHandMiddle3", "leftMiddleDistal"),
    ("mixamorigLeftHandRing1", "leftRingProximal"),
    ("mixamorigLeftHandRing2", "leftRingIntermediate"),
    ("mixamorigLeftHandRing3", "leftRingDistal"),
    ("mixamorigLeftHandPinky1", "leftLittleProximal"),
    ("mixamorigLeftHandPinky2", "leftLittleIntermediate"),
    ("mixamorigLeftHandPinky3", "leftLittleDistal"),
    ("mixamorigRightShoulder", "rightShoulder"),
    ("mixamorigRightArm", "rightUpperArm"),
    ("mixamorigRightForeArm", "rightLowerArm"),
    ("mixamorigRightHand", "rightHand"),
    ("mixamorigRightHandPinky1", "rightLittleProximal"),
    ("mixamorigRightHandPinky2", "rightLittleIntermediate"),
    ("mixamorigRightHandPinky3", "rightLittleDistal"),
    ("mixamorigRightHandRing1", "rightRingProximal"),
    ("mixamorigRightHandRing2", "rightRingIntermediate"),
    ("mixamorigRightHandRing3", "rightRingDistal"),
    ("mixamorigRightHandMiddle1", "rightMiddleProximal"),
    ("mixamorigRightHandMiddle2", "rightMiddleIntermediate"),
    ("mixamorigRightHandMiddle3", "rightMiddleDistal"),
    ("mixamorigRightHandIndex1", "rightIndexProximal"),
    ("mixamorigRightHandIndex2", "rightIndexIntermediate"),
    ("mixamorigRightHandIndex3", "rightIndexDistal"),
    ("mixamorigRightHandThumb1", "rightThumbMetacarpal"),
    ("mixamorigRightHandThumb2", "rightThumbProximal"),
    ("mixamorigRightHandThumb3", "rightThumbDistal"),
    ("mixamorigLeftUpLeg", "leftUpperLeg"),
    ("mixamorigLeftLeg", "leftLowerLeg"),
    ("mixamorigLeftFoot", "leftFoot"),
    ("mixamorigLeftToeBase", "leftToes"),
    ("mixamorigRightUpLeg", "rightUpperLeg"),
    ("mixamorigRightLeg", "rightLowerLeg"),
    ("mixamorigRightFoot", "rightFoot"),
    ("mixamorigRightToeBase", "rightToes"),
];

/// Return `true` if `name` is a normalized humanoid bone name.
pub fn is_humanoid_bone(name: &str) -> bool {
    HUMANOID_BONES.contains(&name)
}

/// Immutable lookup from source-skeleton bone names to humanoid bone names.
///
/// Lookups ignore `:` separators so `mixamorig:Hips` and `mixamorigHips` resolve alike.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoneMap {
    entries: BTreeMap<String, String>,
}

impl BoneMap {
    /// Build a map from explicit `(source, humanoid)` pairs.
    pub fn from_pairs<I, S, H>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, H)>,
        S: AsRef<str>,
        H: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(s, h)| (normalize_source_name(s.as_ref()), h.into()))
            .collect();
        Self { entries }
    }

    /// The standard Mixamo table.
    pub fn mixamo() -> Self {
        Self::from_pairs(MIXAMO_TABLE.iter().copied())
    }

    /// Return a copy of `self` with `overrides` replacing or extending entries.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> Self {
        let mut entries = self.entries.clone();
        for (src, humanoid) in overrides {
            entries.insert(normalize_source_name(src), humanoid.clone());
        }
        Self { entries }
    }

    /// Resolve a source bone name to its humanoid bone name.
    pub fn humanoid_for(&self, source: &str) -> Option<&str> {
        self.entries
            .get(&normalize_source_name(source))
            .map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BoneMap {
    fn default() -> Self {
        Self::mixamo()
    }
}

fn normalize_source_name(name: &str) -> String {
    name.replace(':', "")
}

#[cfg(test)]
#[path = "../../tests/unit/rig/humanoid.rs"]
mod tests;
