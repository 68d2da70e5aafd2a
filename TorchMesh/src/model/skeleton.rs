//! Skeleton and bone types

use std::collections::{HashMap, HashSet};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::animation::Animation;
use crate::error::{Error, Result};

/// Persistent bone handle, as stored in skeleton and mesh files.
pub type BoneId = u16;

/// Relative length below which a non-root bone counts as degenerate.
pub const DEGENERATE_BONE_EPSILON: f32 = 1e-4;

/// Local translation/rotation/scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation, scale: Vec3::ONE }
    }

    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// How animations on this skeleton combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Average,
    Cumulative,
}

impl BlendMode {
    #[must_use]
    pub fn from_u16(v: u16) -> Self {
        if v == 1 { Self::Cumulative } else { Self::Average }
    }

    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Average => 0,
            Self::Cumulative => 1,
        }
    }
}

/// A bone in bind pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub id: BoneId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<BoneId>,
    pub transform: Transform,
}

/// A bone forest plus the animations authored against it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation>,
}

impl Skeleton {
    #[must_use]
    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.iter().find(|b| b.id == id)
    }

    #[must_use]
    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Map of bone name to id.
    #[must_use]
    pub fn ids_by_name(&self) -> HashMap<&str, BoneId> {
        self.bones.iter().map(|b| (b.name.as_str(), b.id)).collect()
    }

    /// Largest bind id in the skeleton.
    #[must_use]
    pub fn max_id(&self) -> Option<BoneId> {
        self.bones.iter().map(|b| b.id).max()
    }

    #[must_use]
    pub fn roots(&self) -> Vec<&Bone> {
        self.bones.iter().filter(|b| b.parent.is_none()).collect()
    }

    #[must_use]
    pub fn children_of(&self, id: BoneId) -> Vec<&Bone> {
        self.bones.iter().filter(|b| b.parent == Some(id)).collect()
    }

    /// Verify the parent graph is a forest over unique ids.
    ///
    /// # Errors
    /// [`Error::DuplicateBoneId`], [`Error::UnknownBone`] for a dangling
    /// parent, or [`Error::CyclicSkeleton`] when an ancestor walk revisits a
    /// bone.
    pub fn validate(&self) -> Result<()> {
        let mut parents: HashMap<BoneId, Option<BoneId>> = HashMap::with_capacity(self.bones.len());
        for bone in &self.bones {
            if parents.insert(bone.id, bone.parent).is_some() {
                return Err(Error::DuplicateBoneId { bone_id: bone.id });
            }
        }

        for bone in &self.bones {
            if let Some(parent) = bone.parent
                && !parents.contains_key(&parent)
            {
                return Err(Error::UnknownBone { bone_id: parent });
            }
        }

        for bone in &self.bones {
            let mut visited = HashSet::with_capacity(self.bones.len());
            visited.insert(bone.id);
            let mut current = bone.parent;
            while let Some(id) = current {
                // Bounded: every step inserts a distinct id or bails out.
                if !visited.insert(id) {
                    return Err(Error::CyclicSkeleton { bone_id: bone.id });
                }
                current = parents.get(&id).copied().flatten();
            }
        }
        Ok(())
    }

    /// Non-root bones whose bind translation is effectively zero relative to
    /// the skeleton's size.
    #[must_use]
    pub fn degenerate_bones(&self) -> Vec<BoneId> {
        let scale = self
            .bones
            .iter()
            .map(|b| b.transform.translation.length())
            .fold(0.0_f32, f32::max);
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let threshold = DEGENERATE_BONE_EPSILON * scale;

        self.bones
            .iter()
            .filter(|b| b.parent.is_some() && b.transform.translation.length() < threshold)
            .map(|b| b.id)
            .collect()
    }

    /// Model-space bind matrix per bone id.
    ///
    /// Assumes [`Skeleton::validate`] has passed.
    #[must_use]
    pub fn world_matrices(&self) -> HashMap<BoneId, Mat4> {
        let by_id: HashMap<BoneId, &Bone> = self.bones.iter().map(|b| (b.id, b)).collect();
        let mut out: HashMap<BoneId, Mat4> = HashMap::with_capacity(self.bones.len());

        fn resolve(
            id: BoneId,
            by_id: &HashMap<BoneId, &Bone>,
            out: &mut HashMap<BoneId, Mat4>,
            depth: usize,
        ) -> Mat4 {
            if let Some(m) = out.get(&id) {
                return *m;
            }
            let Some(bone) = by_id.get(&id) else {
                return Mat4::IDENTITY;
            };
            let local = bone.transform.to_matrix();
            let world = match bone.parent {
                Some(parent) if depth < by_id.len() => resolve(parent, by_id, out, depth + 1) * local,
                _ => local,
            };
            out.insert(id, world);
            world
        }

        for bone in &self.bones {
            resolve(bone.id, &by_id, &mut out, 0);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(id: BoneId, parent: Option<BoneId>, t: Vec3) -> Bone {
        Bone {
            id,
            name: format!("bone{id}"),
            parent,
            transform: Transform::new(t, Quat::IDENTITY),
        }
    }

    #[test]
    fn test_validate_forest() {
        let skeleton = Skeleton {
            bones: vec![
                bone(0, None, Vec3::ZERO),
                bone(1, Some(0), Vec3::Y),
                bone(2, Some(1), Vec3::Y),
                bone(5, None, Vec3::X),
            ],
            ..Skeleton::default()
        };
        skeleton.validate().unwrap();
        assert_eq!(skeleton.roots().len(), 2);
        assert_eq!(skeleton.children_of(1).len(), 1);
    }

    #[test]
    fn test_validate_cycle() {
        let skeleton = Skeleton {
            bones: vec![
                bone(0, Some(2), Vec3::Y),
                bone(1, Some(0), Vec3::Y),
                bone(2, Some(1), Vec3::Y),
            ],
            ..Skeleton::default()
        };
        assert!(matches!(skeleton.validate(), Err(Error::CyclicSkeleton { bone_id: 0 })));
    }

    #[test]
    fn test_validate_self_parent() {
        let skeleton = Skeleton { bones: vec![bone(3, Some(3), Vec3::Y)], ..Skeleton::default() };
        assert!(matches!(skeleton.validate(), Err(Error::CyclicSkeleton { bone_id: 3 })));
    }

    #[test]
    fn test_validate_duplicate_and_dangling() {
        let dup = Skeleton { bones: vec![bone(1, None, Vec3::ZERO), bone(1, None, Vec3::ZERO)], ..Skeleton::default() };
        assert!(matches!(dup.validate(), Err(Error::DuplicateBoneId { bone_id: 1 })));

        let dangling = Skeleton { bones: vec![bone(1, Some(9), Vec3::ZERO)], ..Skeleton::default() };
        assert!(matches!(dangling.validate(), Err(Error::UnknownBone { bone_id: 9 })));
    }

    #[test]
    fn test_degenerate_bones() {
        let skeleton = Skeleton {
            bones: vec![
                bone(0, None, Vec3::ZERO),
                bone(1, Some(0), Vec3::new(0.0, 2.0, 0.0)),
                bone(2, Some(1), Vec3::new(0.0, 1e-6, 0.0)),
                bone(3, Some(1), Vec3::new(0.0, 0.5, 0.0)),
            ],
            ..Skeleton::default()
        };
        assert_eq!(skeleton.degenerate_bones(), vec![2]);
    }

    #[test]
    fn test_world_matrices() {
        let skeleton = Skeleton {
            bones: vec![bone(0, None, Vec3::X), bone(1, Some(0), Vec3::Y)],
            ..Skeleton::default()
        };
        let world = skeleton.world_matrices();
        let p = world[&1].transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }
}
