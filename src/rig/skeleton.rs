use std::collections::BTreeMap;

use crate::foundation::core::{Affine3A, BoneTransform, Vec3};
use crate::foundation::error::{StageError, StageResult};
use crate::rig::humanoid::{self, HIPS};

/// One node of the rig hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct Bone {
    /// Node name, unique within the rig.
    pub name: String,
    /// Index of the parent bone, `None` for roots.
    pub parent: Option<usize>,
    /// Rest (bind) local transform.
    pub rest: BoneTransform,
}

/// Local transforms for every bone of a rig, indexed like [`Rig::bones`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    /// Per-bone local transforms.
    pub locals: Vec<BoneTransform>,
}

/// Humanoid rig: bone hierarchy, named-bone lookup, humanoid mapping and rest pose.
#[derive(Clone, Debug)]
pub struct Rig {
    bones: Vec<Bone>,
    by_name: BTreeMap<String, usize>,
    humanoid: BTreeMap<String, usize>,
    // Parents precede children.
    order: Vec<usize>,
    rest_world: Vec<Affine3A>,
}

impl Rig {
    /// Build a rig from bones and a humanoid table (`humanoid name -> node name`).
    ///
    /// When `humanoid` is empty, bones whose names are humanoid bone names map to themselves.
    pub fn new(bones: Vec<Bone>, humanoid: &BTreeMap<String, String>) -> StageResult<Self> {
        let mut by_name = BTreeMap::new();
        for (idx, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent
                && parent >= bones.len()
            {
                return Err(StageError::asset(format!(
                    "bone '{}' references missing parent index {parent}",
                    bone.name
                )));
            }
            if by_name.insert(bone.name.clone(), idx).is_some() {
                return Err(StageError::asset(format!(
                    "duplicate bone name '{}'",
                    bone.name
                )));
            }
        }

        let order = topological_order(&bones)?;

        let mut humanoid_idx = BTreeMap::new();
        if humanoid.is_empty() {
            for (idx, bone) in bones.iter().enumerate() {
                if humanoid::is_humanoid_bone(&bone.name) {
                    humanoid_idx.insert(bone.name.clone(), idx);
                }
            }
        } else {
            for (human, node) in humanoid {
                let idx = *by_name.get(node).ok_or_else(|| {
                    StageError::asset(format!(
                        "humanoid bone '{human}' maps to missing node '{node}'"
                    ))
                })?;
                humanoid_idx.insert(human.clone(), idx);
            }
        }

        let mut rig = Self {
            bones,
            by_name,
            humanoid: humanoid_idx,
            order,
            rest_world: Vec::new(),
        };
        let rest = rig.rest_pose();
        let mut world = Vec::new();
        rig.world_transforms(&rest, &mut world);
        rig.rest_world = world;
        Ok(rig)
    }

    /// All bones in declaration order.
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Look up a bone by node name.
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Look up a bone by humanoid name.
    pub fn humanoid_bone(&self, humanoid: &str) -> Option<usize> {
        self.humanoid.get(humanoid).copied()
    }

    /// Node name bound to a humanoid bone.
    pub fn humanoid_node_name(&self, humanoid: &str) -> Option<&str> {
        self.humanoid_bone(humanoid)
            .map(|idx| self.bones[idx].name.as_str())
    }

    /// Rest pose (bind locals).
    pub fn rest_pose(&self) -> Pose {
        Pose {
            locals: self.bones.iter().map(|b| b.rest).collect(),
        }
    }

    /// Compute world transforms for `pose` into `out` (resized to the bone count).
    pub fn world_transforms(&self, pose: &Pose, out: &mut Vec<Affine3A>) {
        out.clear();
        out.resize(self.bones.len(), Affine3A::IDENTITY);
        for &idx in &self.order {
            let local = pose
                .locals
                .get(idx)
                .copied()
                .unwrap_or(self.bones[idx].rest)
                .to_affine();
            out[idx] = match self.bones[idx].parent {
                Some(parent) => out[parent] * local,
                None => local,
            };
        }
    }

    /// World-space position of a bone in the rest pose.
    pub fn rest_world_position(&self, idx: usize) -> Option<Vec3> {
        self.rest_world.get(idx).map(|m| Vec3::from(m.translation))
    }

    /// Resting height of the hips above the rig origin.
    pub fn hip_height(&self) -> Option<f32> {
        let hips = self.humanoid_bone(HIPS)?;
        let y = self.rest_world_position(hips)?.y;
        Some(y.abs())
    }
}

fn topological_order(bones: &[Bone]) -> StageResult<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Visiting,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; bones.len()];
    let mut order = Vec::with_capacity(bones.len());

    for start in 0..bones.len() {
        let mut chain = Vec::new();
        let mut cur = Some(start);
        while let Some(idx) = cur {
            match marks[idx] {
                Mark::Done => break,
                Mark::Visiting => {
                    return Err(StageError::asset(format!(
                        "bone hierarchy has a cycle through '{}'",
                        bones[idx].name
                    )));
                }
                Mark::Unvisited => {
                    marks[idx] = Mark::Visiting;
                    chain.push(idx);
                    cur = bones[idx].parent;
                }
            }
        }
        for &idx in chain.iter().rev() {
            marks[idx] = Mark::Done;
            order.push(idx);
        }
    }
    Ok(order)
}

#[cfg(test)]
#[path = "../../tests/unit/rig/skeleton.rs"]
mod tests;
