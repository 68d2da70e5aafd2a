//! Persistent bone identifiers across re-exports
//!
//! Meshes store skin weights against numeric bone handles, so a skeleton that
//! is exported again must keep the handles it had before. Bones are matched
//! by name; new bones get fresh handles above every handle already in use.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Bone, BoneId, Skeleton, Transform};

/// A bone as read from the host, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub transform: Transform,
}

impl BoneDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<&str>, transform: Transform) -> Self {
        Self { name: name.into(), parent: parent.map(str::to_string), transform }
    }
}

/// Hands out bone ids, reusing those of a previous skeleton by name.
#[derive(Debug, Default)]
pub struct BoneIdAllocator {
    previous: HashMap<String, BoneId>,
    used: HashSet<BoneId>,
    /// Next fresh id; u32 so running past `u16::MAX` is detectable.
    next: u32,
}

impl BoneIdAllocator {
    #[must_use]
    pub fn new(previous: Option<&Skeleton>) -> Self {
        let mut allocator = Self::default();
        if let Some(skeleton) = previous {
            for bone in &skeleton.bones {
                allocator.previous.insert(bone.name.clone(), bone.id);
                allocator.next = allocator.next.max(u32::from(bone.id) + 1);
            }
        }
        allocator
    }

    /// Id for the bone called `name`.
    ///
    /// # Errors
    /// [`Error::InvalidMesh`] once the 16-bit id space is exhausted.
    pub fn allocate(&mut self, name: &str) -> Result<BoneId> {
        if let Some(&id) = self.previous.get(name)
            && self.used.insert(id)
        {
            return Ok(id);
        }
        let id = BoneId::try_from(self.next)
            .map_err(|_| Error::InvalidMesh(format!("no bone id left for '{name}'")))?;
        self.next += 1;
        self.used.insert(id);
        Ok(id)
    }
}

/// Build a skeleton from drafts, keeping ids stable against `previous`.
///
/// Bones keep draft order. Re-running with the result as `previous` and the
/// same drafts yields identical ids.
///
/// # Errors
/// [`Error::DuplicateBoneName`], [`Error::UnknownBoneName`] for a parent that
/// is not among the drafts, or [`Error::CyclicSkeleton`].
pub fn assign_bone_ids(drafts: &[BoneDraft], previous: Option<&Skeleton>) -> Result<Skeleton> {
    let mut allocator = BoneIdAllocator::new(previous);
    let mut ids: HashMap<&str, BoneId> = HashMap::with_capacity(drafts.len());
    for draft in drafts {
        if ids.contains_key(draft.name.as_str()) {
            return Err(Error::DuplicateBoneName { name: draft.name.clone() });
        }
        let id = allocator.allocate(&draft.name)?;
        ids.insert(&draft.name, id);
    }

    let mut bones = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let parent = match &draft.parent {
            Some(name) => Some(
                *ids.get(name.as_str())
                    .ok_or_else(|| Error::UnknownBoneName { name: name.clone() })?,
            ),
            None => None,
        };
        bones.push(Bone {
            id: ids[draft.name.as_str()],
            name: draft.name.clone(),
            parent,
            transform: draft.transform,
        });
    }

    let skeleton = Skeleton {
        bones,
        blend_mode: previous.map(|s| s.blend_mode).unwrap_or_default(),
        animations: Vec::new(),
    };
    skeleton.validate()?;
    Ok(skeleton)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drafts(names: &[(&str, Option<&str>)]) -> Vec<BoneDraft> {
        names.iter().map(|(n, p)| BoneDraft::new(*n, *p, Transform::IDENTITY)).collect()
    }

    fn id_of(skeleton: &Skeleton, name: &str) -> BoneId {
        skeleton.bone_by_name(name).map(|b| b.id).unwrap()
    }

    #[test]
    fn test_fresh_ids_follow_draft_order() {
        let s = assign_bone_ids(&drafts(&[("root", None), ("spine", Some("root"))]), None).unwrap();
        assert_eq!(id_of(&s, "root"), 0);
        assert_eq!(id_of(&s, "spine"), 1);
        assert_eq!(s.bones[1].parent, Some(0));
    }

    #[test]
    fn test_reexport_keeps_ids() {
        let first = assign_bone_ids(
            &drafts(&[("root", None), ("spine", Some("root")), ("head", Some("spine"))]),
            None,
        )
        .unwrap();
        let again = assign_bone_ids(
            &drafts(&[("root", None), ("spine", Some("root")), ("head", Some("spine"))]),
            Some(&first),
        )
        .unwrap();
        assert_eq!(first, again);

        // Reordered drafts, a removed bone and a new one.
        let edited = assign_bone_ids(
            &drafts(&[("head", Some("root")), ("root", None), ("tail", Some("root"))]),
            Some(&first),
        )
        .unwrap();
        assert_eq!(id_of(&edited, "head"), id_of(&first, "head"));
        assert_eq!(id_of(&edited, "root"), id_of(&first, "root"));
        assert_eq!(id_of(&edited, "tail"), 3);
    }

    #[test]
    fn test_fresh_ids_skip_past_sparse_previous() {
        let previous = Skeleton {
            bones: vec![Bone { id: 40, name: "old".into(), parent: None, transform: Transform::IDENTITY }],
            ..Skeleton::default()
        };
        let s = assign_bone_ids(&drafts(&[("new", None), ("old", None)]), Some(&previous)).unwrap();
        assert_eq!(id_of(&s, "new"), 41);
        assert_eq!(id_of(&s, "old"), 40);
    }

    #[test]
    fn test_errors() {
        let err = assign_bone_ids(&drafts(&[("a", Some("ghost"))]), None).unwrap_err();
        assert!(matches!(err, Error::UnknownBoneName { name } if name == "ghost"));

        let err = assign_bone_ids(&drafts(&[("a", None), ("a", None)]), None).unwrap_err();
        assert!(matches!(err, Error::DuplicateBoneName { .. }));

        let err = assign_bone_ids(&drafts(&[("a", Some("b")), ("b", Some("a"))]), None).unwrap_err();
        assert!(matches!(err, Error::CyclicSkeleton { .. }));
    }
}
