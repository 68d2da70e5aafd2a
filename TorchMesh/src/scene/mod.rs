//! Host scene boundary
//!
//! The codecs never see host objects. An editor integration implements
//! [`SceneAdapter`] to hand its scene over as plain [`SceneMesh`] /
//! [`SceneArmature`] / [`SceneAction`] values on export, and to receive the
//! decoded model on import. [`MemoryScene`] is a complete in-memory adapter
//! that can be saved as JSON.

mod memory;

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::converter::material::MaterialScript;
use crate::error::Result;
use crate::geometry::UpAxis;
use crate::model::{Animation, BoneId, Keyframe, Mesh, MorphKey, Skeleton, Transform};

pub use memory::MemoryScene;

/// One polygon corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCorner {
    /// Index into [`SceneMesh::positions`].
    pub vertex: u32,
    pub normal: Vec3,
    /// One entry per [`SceneMesh::uv_layers`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uvs: Vec<Vec2>,
    /// RGB, one entry per [`SceneMesh::colour_layers`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colours: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePolygon {
    /// Index into [`SceneMesh::materials`].
    #[serde(default)]
    pub material: usize,
    pub corners: Vec<SceneCorner>,
}

/// A vertex group membership.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupWeight {
    /// Index into [`SceneMesh::vertex_groups`].
    pub group: usize,
    pub weight: f32,
}

/// A shape key as absolute vertex positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneShapeKey {
    pub name: String,
    /// Parallel to [`SceneMesh::positions`].
    pub positions: Vec<Vec3>,
}

/// A host mesh object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneMesh {
    pub name: String,
    /// Object to world transform.
    #[serde(default = "identity")]
    pub transform: Mat4,
    pub positions: Vec<Vec3>,
    pub polygons: Vec<ScenePolygon>,
    /// Material slot names.
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub uv_layers: Vec<String>,
    #[serde(default)]
    pub colour_layers: Vec<String>,
    /// Group names; groups named after bones carry skin weights.
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    /// Per position, its group memberships.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weights: Vec<Vec<GroupWeight>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shape_keys: Vec<SceneShapeKey>,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBone {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Bind transform relative to the parent.
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneArmature {
    pub name: String,
    pub bones: Vec<SceneBone>,
}

/// Samples for one bone, relative to its bind transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneSamples {
    pub bone: String,
    pub samples: Vec<Keyframe>,
}

/// Weight samples for one shape key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSamples {
    pub shape: String,
    pub samples: Vec<MorphKey>,
}

/// A host action. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneAction {
    pub name: String,
    /// Explicit length; the last sample time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bones: Vec<BoneSamples>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<ShapeSamples>,
}

impl SceneAction {
    /// Length in seconds.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.length.unwrap_or_else(|| {
            let bone_times = self.bones.iter().flat_map(|b| b.samples.iter().map(|k| k.time));
            let shape_times = self.shapes.iter().flat_map(|s| s.samples.iter().map(|k| k.time));
            bone_times.chain(shape_times).fold(0.0, f32::max)
        })
    }
}

/// A host material and the texture files it uses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SceneMaterial {
    pub name: String,
    /// Texture paths as the host knows them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<String>,
}

/// A skeleton already on disk that an exported mesh can link to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedSkeleton {
    /// File name written into the mesh's skeleton link.
    pub file: String,
    pub skeleton: Skeleton,
}

/// A decoded mesh ready to become host geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMesh {
    /// Object name (the file stem).
    pub name: String,
    pub mesh: Mesh,
    /// Names for the bone ids used by skin weights.
    pub bone_names: Vec<(BoneId, String)>,
    /// Whether normals should be applied as custom split normals.
    pub custom_normals: bool,
}

impl ImportedMesh {
    /// Vertex group name for a bone id.
    #[must_use]
    pub fn bone_name(&self, bone: BoneId) -> String {
        self.bone_names
            .iter()
            .find(|(id, _)| *id == bone)
            .map_or_else(|| format!("bone_{bone}"), |(_, name)| name.clone())
    }
}

/// A decoded skeleton ready to become a host armature.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSkeleton {
    /// Armature name (the skeleton file stem).
    pub name: String,
    /// File name the mesh linked to.
    pub file: String,
    pub skeleton: Skeleton,
}

/// The host side of import and export.
///
/// Export calls only the read methods; import stages everything first and
/// then calls the `create_*` methods.
pub trait SceneAdapter {
    // ===== Export (read host) =====

    /// Mesh objects to export, with modifiers applied when asked.
    fn meshes(&self, apply_modifiers: bool) -> Result<Vec<SceneMesh>>;

    /// The armature deforming the exported meshes.
    fn armature(&self) -> Result<Option<SceneArmature>>;

    /// Actions on the armature and shape keys.
    fn actions(&self) -> Result<Vec<SceneAction>>;

    fn materials(&self) -> Result<Vec<SceneMaterial>>;

    /// An existing skeleton to link with and take bone ids from.
    fn linked_skeleton(&self) -> Result<Option<LinkedSkeleton>>;

    fn up_axis(&self) -> UpAxis;

    // ===== Import (write host) =====

    fn create_geometry(&mut self, mesh: &ImportedMesh) -> Result<()>;

    fn create_armature(&mut self, skeleton: &ImportedSkeleton) -> Result<()>;

    /// Create an action. `skeleton` names the bones of bone tracks.
    fn create_action(&mut self, animation: &Animation, skeleton: Option<&Skeleton>) -> Result<()>;

    fn create_material(&mut self, material: &MaterialScript) -> Result<()>;

    fn set_frame_rate(&mut self, fps: u32) -> Result<()>;

    /// The armature a skinned mesh without its own skeleton binds to.
    fn selected_armature(&self) -> Option<SceneArmature>;
}
