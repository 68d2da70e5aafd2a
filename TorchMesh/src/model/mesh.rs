//! Mesh, submesh and vertex types

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::animation::Animation;
use super::skeleton::BoneId;
use crate::error::{Error, Result};

/// Maximum number of bone influences stored per vertex.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// A single skin weight: how strongly one bone moves a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub bone: BoneId,
    pub weight: f32,
}

impl BoneWeight {
    #[must_use]
    pub fn new(bone: BoneId, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// One vertex of a submesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// xyz = tangent direction, w = handedness (+1.0 or -1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangent: Option<Vec4>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binormal: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uvs: Vec<Vec2>,
    /// RGBA in 0..=1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<Vec4>,
    /// Sorted by descending weight.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<BoneWeight>,
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            tangent: None,
            binormal: None,
            uvs: Vec::new(),
            colour: None,
            weights: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uvs.push(uv);
        self
    }

    #[must_use]
    pub fn with_colour(mut self, colour: Vec4) -> Self {
        self.colour = Some(colour);
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: Vec<BoneWeight>) -> Self {
        self.weights = weights;
        self
    }
}

/// Sort weights by descending influence, drop everything past
/// [`MAX_BONE_INFLUENCES`], and rescale the remainder to sum to 1.0.
///
/// Returns `true` when influences were dropped.
pub fn normalize_weights(weights: &mut Vec<BoneWeight>) -> bool {
    weights.retain(|w| w.weight.is_finite() && w.weight > 0.0);
    weights.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.bone.cmp(&b.bone)));

    let truncated = weights.len() > MAX_BONE_INFLUENCES;
    weights.truncate(MAX_BONE_INFLUENCES);

    let total: f32 = weights.iter().map(|w| w.weight).sum();
    if total > 0.0 {
        for w in weights.iter_mut() {
            w.weight /= total;
        }
    }
    truncated
}

/// A mesh partition with one material and its own vertex/index buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub material: String,
    pub vertices: Vec<Vertex>,
    /// Triangle list.
    pub indices: Vec<u32>,
}

impl Submesh {
    #[must_use]
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            name: None,
            material: material.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Check the index buffer against the vertex list.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMesh`] when the index count is not a multiple of
    /// three and [`Error::InvalidIndex`] for out-of-range indices.
    pub fn validate(&self, position: usize) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "submesh {position}: index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::InvalidIndex { submesh: position, index, vertex_count });
        }
        Ok(())
    }

    /// Whether any vertex carries skin weights.
    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.vertices.iter().any(|v| !v.weights.is_empty())
    }
}

/// A shape key stored as per-vertex offsets on one submesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub name: String,
    /// Index of the submesh the pose deforms.
    pub submesh: usize,
    /// (vertex index, position offset) pairs.
    pub offsets: Vec<(u32, Vec3)>,
    /// Per-offset normals, parallel to `offsets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<Vec3>>,
}

/// Axis-aligned bounds plus bounding sphere radius around the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
    pub radius: f32,
}

/// A complete mesh file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub submeshes: Vec<Submesh>,
    /// File name of the companion `.skeleton`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poses: Vec<Pose>,
    /// Morph (shape key) animations. Bone animations live in the skeleton.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation>,
    /// Edge list as decoded from a file; rebuilt on encode when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_list: Option<super::EdgeList>,
}

impl Mesh {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.vertices.len()).sum()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Submesh::triangle_count).sum()
    }

    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.submeshes.iter().any(Submesh::is_skinned)
    }

    /// Bounds over every vertex, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let mut positions = self.submeshes.iter().flat_map(|s| s.vertices.iter().map(|v| v.position));
        let first = positions.next()?;
        let (min, max, radius_sq) = positions.fold(
            (first, first, first.length_squared()),
            |(min, max, r), p| (min.min(p), max.max(p), r.max(p.length_squared())),
        );
        Some(Bounds { min, max, radius: radius_sq.sqrt() })
    }

    /// Check every submesh's index buffer and the pose targets.
    ///
    /// # Errors
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<()> {
        for (i, submesh) in self.submeshes.iter().enumerate() {
            submesh.validate(i)?;
        }
        for pose in &self.poses {
            let Some(submesh) = self.submeshes.get(pose.submesh) else {
                return Err(Error::InvalidMesh(format!(
                    "pose '{}' targets missing submesh {}",
                    pose.name, pose.submesh
                )));
            };
            if let Some(&(index, _)) = pose.offsets.iter().find(|(i, _)| *i as usize >= submesh.vertices.len()) {
                return Err(Error::InvalidIndex {
                    submesh: pose.submesh,
                    index,
                    vertex_count: submesh.vertices.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weights_truncates_and_renormalizes() {
        let mut weights = vec![
            BoneWeight::new(0, 0.1),
            BoneWeight::new(1, 0.4),
            BoneWeight::new(2, 0.05),
            BoneWeight::new(3, 0.2),
            BoneWeight::new(4, 0.25),
        ];
        assert!(normalize_weights(&mut weights));
        assert_eq!(weights.len(), MAX_BONE_INFLUENCES);
        let bones: Vec<BoneId> = weights.iter().map(|w| w.bone).collect();
        assert_eq!(bones, vec![1, 4, 3, 0]);
        let total: f32 = weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_weights_drops_zero_entries() {
        let mut weights = vec![BoneWeight::new(7, 0.0), BoneWeight::new(2, 2.0)];
        assert!(!normalize_weights(&mut weights));
        assert_eq!(weights, vec![BoneWeight::new(2, 1.0)]);
    }

    #[test]
    fn test_bounds() {
        let mut submesh = Submesh::new("mat");
        submesh.vertices.push(Vertex::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::Y));
        submesh.vertices.push(Vertex::new(Vec3::new(3.0, -4.0, 0.0), Vec3::Y));
        let mesh = Mesh { submeshes: vec![submesh], ..Mesh::default() };

        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 0.0, 2.0));
        assert!((bounds.radius - 5.0).abs() < 1e-6);
        assert!(Mesh::default().bounds().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut submesh = Submesh::new("mat");
        submesh.vertices.push(Vertex::new(Vec3::ZERO, Vec3::Y));
        submesh.indices = vec![0, 0, 3];
        let err = submesh.validate(2).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { submesh: 2, index: 3, vertex_count: 1 }));
    }
}
