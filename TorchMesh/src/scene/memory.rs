//! In-memory scene adapter

use std::path::Path;

use glam::{Vec2, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{
    BoneSamples, GroupWeight, ImportedMesh, ImportedSkeleton, LinkedSkeleton, SceneAction, SceneAdapter,
    SceneArmature, SceneBone, SceneCorner, SceneMaterial, SceneMesh, ScenePolygon, SceneShapeKey, ShapeSamples,
};
use crate::config::DEFAULT_ALPHA_LAYER;
use crate::converter::material::MaterialScript;
use crate::converter::output::write_atomic;
use crate::error::{Error, Result};
use crate::geometry::UpAxis;
use crate::model::{Animation, BoneId, Skeleton, Submesh};

/// Colour layer holding imported RGB.
const COLOUR_LAYER: &str = "Col";

/// A scene held entirely in memory, serializable as JSON.
///
/// Export reads the stored objects back as-is; import appends to them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryScene {
    pub up_axis: UpAxis,
    pub meshes: Vec<SceneMesh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub armature: Option<SceneArmature>,
    pub actions: Vec<SceneAction>,
    pub materials: Vec<SceneMaterial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_skeleton: Option<LinkedSkeleton>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
}

impl MemoryScene {
    #[must_use]
    pub fn new(up_axis: UpAxis) -> Self {
        Self { up_axis, ..Self::default() }
    }

    /// Load a scene saved with [`MemoryScene::save`].
    ///
    /// # Errors
    /// IO or JSON errors, wrapped with the file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::from(e).in_file(path))?;
        serde_json::from_str(&text).map_err(|e| Error::from(e).in_file(path))
    }

    /// Save as pretty JSON, replacing `path` atomically.
    ///
    /// # Errors
    /// IO or JSON errors.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path.as_ref(), json.as_bytes())
    }

    fn scene_mesh(imported: &ImportedMesh, position: usize, submesh: &Submesh) -> SceneMesh {
        let name = match (&submesh.name, imported.mesh.submeshes.len()) {
            (Some(name), _) => name.clone(),
            (None, 1) => imported.name.clone(),
            (None, _) => format!("{}.{position:03}", imported.name),
        };

        let uv_count = submesh.vertices.iter().map(|v| v.uvs.len()).max().unwrap_or(0);
        let uv_layers: Vec<String> = (0..uv_count)
            .map(|i| if i == 0 { "UVMap".to_string() } else { format!("UVMap.{i:03}") })
            .collect();

        let has_colour = submesh.vertices.iter().any(|v| v.colour.is_some());
        let has_alpha = submesh.vertices.iter().any(|v| v.colour.is_some_and(|c| c.w < 1.0));
        let mut colour_layers = Vec::new();
        if has_colour {
            colour_layers.push(COLOUR_LAYER.to_string());
        }
        if has_alpha {
            colour_layers.push(DEFAULT_ALPHA_LAYER.to_string());
        }

        let mut groups: IndexMap<BoneId, usize> = IndexMap::new();
        let weights: Vec<Vec<GroupWeight>> = submesh
            .vertices
            .iter()
            .map(|v| {
                v.weights
                    .iter()
                    .map(|w| {
                        let next = groups.len();
                        let group = *groups.entry(w.bone).or_insert(next);
                        GroupWeight { group, weight: w.weight }
                    })
                    .collect()
            })
            .collect();
        let vertex_groups = groups.keys().map(|&bone| imported.bone_name(bone)).collect();

        let polygons = submesh
            .triangles()
            .map(|tri| {
                let [a, b, c] = tri.map(|i| submesh.vertices[i as usize].position);
                let face_normal = (b - a).cross(c - a).normalize_or_zero();
                let corners = tri
                    .iter()
                    .map(|&i| {
                        let v = &submesh.vertices[i as usize];
                        let mut uvs = v.uvs.clone();
                        uvs.resize(uv_count, Vec2::ZERO);
                        let mut colours = Vec::new();
                        if has_colour {
                            let c = v.colour.unwrap_or(glam::Vec4::ONE);
                            colours.push(c.truncate());
                            if has_alpha {
                                colours.push(Vec3::splat(c.w));
                            }
                        }
                        SceneCorner {
                            vertex: i,
                            normal: if imported.custom_normals { v.normal } else { face_normal },
                            uvs,
                            colours,
                        }
                    })
                    .collect();
                ScenePolygon { material: 0, corners }
            })
            .collect();

        let base: Vec<Vec3> = submesh.vertices.iter().map(|v| v.position).collect();
        let shape_keys = imported
            .mesh
            .poses
            .iter()
            .filter(|p| p.submesh == position)
            .map(|pose| {
                let mut positions = base.clone();
                for &(index, offset) in &pose.offsets {
                    if let Some(p) = positions.get_mut(index as usize) {
                        *p += offset;
                    }
                }
                SceneShapeKey { name: pose.name.clone(), positions }
            })
            .collect();

        SceneMesh {
            name,
            transform: glam::Mat4::IDENTITY,
            positions: base,
            polygons,
            materials: vec![submesh.material.clone()],
            uv_layers,
            colour_layers,
            vertex_groups,
            weights,
            shape_keys,
        }
    }
}

impl SceneAdapter for MemoryScene {
    fn meshes(&self, _apply_modifiers: bool) -> Result<Vec<SceneMesh>> {
        Ok(self.meshes.clone())
    }

    fn armature(&self) -> Result<Option<SceneArmature>> {
        Ok(self.armature.clone())
    }

    fn actions(&self) -> Result<Vec<SceneAction>> {
        Ok(self.actions.clone())
    }

    fn materials(&self) -> Result<Vec<SceneMaterial>> {
        Ok(self.materials.clone())
    }

    fn linked_skeleton(&self) -> Result<Option<LinkedSkeleton>> {
        Ok(self.linked_skeleton.clone())
    }

    fn up_axis(&self) -> UpAxis {
        self.up_axis
    }

    fn create_geometry(&mut self, mesh: &ImportedMesh) -> Result<()> {
        for (position, submesh) in mesh.mesh.submeshes.iter().enumerate() {
            let scene_mesh = Self::scene_mesh(mesh, position, submesh);
            self.meshes.push(scene_mesh);
        }
        Ok(())
    }

    fn create_armature(&mut self, imported: &ImportedSkeleton) -> Result<()> {
        let skeleton = &imported.skeleton;
        let bones = skeleton
            .bones
            .iter()
            .map(|bone| SceneBone {
                name: bone.name.clone(),
                parent: bone.parent.and_then(|p| skeleton.bone(p)).map(|p| p.name.clone()),
                transform: bone.transform,
            })
            .collect();
        self.armature = Some(SceneArmature { name: imported.name.clone(), bones });
        self.linked_skeleton = Some(LinkedSkeleton { file: imported.file.clone(), skeleton: skeleton.clone() });
        Ok(())
    }

    fn create_action(&mut self, animation: &Animation, skeleton: Option<&Skeleton>) -> Result<()> {
        let bones = animation
            .tracks
            .iter()
            .map(|track| BoneSamples {
                bone: skeleton
                    .and_then(|s| s.bone(track.bone))
                    .map_or_else(|| format!("bone_{}", track.bone), |b| b.name.clone()),
                samples: track.keyframes.clone(),
            })
            .collect();
        let shapes = animation
            .morph_tracks
            .iter()
            .map(|track| ShapeSamples { shape: track.shape.clone(), samples: track.keys.clone() })
            .collect();
        self.actions.push(SceneAction { name: animation.name.clone(), length: Some(animation.length), bones, shapes });
        Ok(())
    }

    fn create_material(&mut self, material: &MaterialScript) -> Result<()> {
        let scene_material = SceneMaterial { name: material.name.clone(), textures: material.textures.clone() };
        match self.materials.iter_mut().find(|m| m.name == material.name) {
            Some(existing) => *existing = scene_material,
            None => self.materials.push(scene_material),
        }
        Ok(())
    }

    fn set_frame_rate(&mut self, fps: u32) -> Result<()> {
        self.frame_rate = Some(fps);
        Ok(())
    }

    fn selected_armature(&self) -> Option<SceneArmature> {
        self.armature.clone()
    }
}
