//! Export pipeline: scene into `.mesh`, `.skeleton` and `.material` files
//!
//! The scene is read once, turned into a normalized model, and every output
//! buffer is encoded before the first file is written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};
use indexmap::IndexMap;

use super::material::{MaterialScript, material_path, render_materials};
use super::output::{PendingFile, write_pending};
use super::types::{ConvertPhase, ConvertProgress, ProgressCallback, no_progress};
use crate::config::ExportOptions;
use crate::error::{Error, Result};
use crate::formats::{BoneDraft, assign_bone_ids, encode_mesh_bytes, encode_skeleton_bytes};
use crate::geometry::{self, AxisConversion, UpAxis, transform, triangulate_polygon};
use crate::model::{
    Animation, BoneId, BoneTrack, BoneWeight, Mesh, MorphTrack, Pose, Skeleton, Submesh, Vertex, normalize_weights,
};
use crate::scene::{SceneAction, SceneAdapter, SceneArmature, SceneMaterial, SceneMesh, ScenePolygon};

/// OGRE's fallback material for geometry without a material slot.
pub const DEFAULT_MATERIAL: &str = "BaseWhite";

/// Shape key offsets shorter than this are left out of a pose.
const MIN_POSE_OFFSET_SQ: f32 = 1e-12;

/// The model built from a scene, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    pub mesh: Mesh,
    /// Skeleton to write, when exporting one.
    pub skeleton: Option<Skeleton>,
    pub materials: Vec<MaterialScript>,
    /// Texture files to copy next to the material script.
    pub textures: Vec<PathBuf>,
}

/// Summary of a finished export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    pub mesh_path: PathBuf,
    pub skeleton_path: Option<PathBuf>,
    pub material_path: Option<PathBuf>,
    pub intermediate: Vec<PathBuf>,
    pub copied_textures: Vec<PathBuf>,
    pub submeshes: usize,
    pub vertices: usize,
    pub triangles: usize,
}

/// Bone name to id, plus the skeleton link the mesh should carry.
struct BoneBinding {
    ids: HashMap<String, BoneId>,
    link: String,
}

impl BoneBinding {
    fn from_skeleton(skeleton: &Skeleton, link: String) -> Self {
        Self { ids: skeleton.bones.iter().map(|b| (b.name.clone(), b.id)).collect(), link }
    }
}

/// Turn a scene into a normalized model named after `stem`.
///
/// # Errors
/// Adapter errors, [`Error::InvalidMesh`] for inconsistent scene data,
/// [`Error::UnknownBoneName`] for animated bones missing from the skeleton,
/// and bone id allocation errors.
pub fn build_export<A: SceneAdapter + ?Sized>(adapter: &A, stem: &str, options: &ExportOptions) -> Result<ExportBundle> {
    build_export_with_progress(adapter, stem, options, &no_progress)
}

fn build_export_with_progress<A: SceneAdapter + ?Sized>(
    adapter: &A,
    stem: &str,
    options: &ExportOptions,
    progress: ProgressCallback,
) -> Result<ExportBundle> {
    let axis = AxisConversion::between(adapter.up_axis(), UpAxis::Y);

    progress(&ConvertProgress::new(ConvertPhase::ReadingScene, 1, 4));
    let scene_meshes = adapter.meshes(options.apply_modifiers)?;
    let armature = adapter.armature()?;
    let linked = adapter.linked_skeleton()?;

    progress(&ConvertProgress::new(ConvertPhase::BuildingSkeleton, 2, 4));
    let mut skeleton = None;
    let binding = match (&armature, options.export_skeleton) {
        (Some(armature), true) => {
            let previous = linked.as_ref().map(|l| &l.skeleton);
            let mut built = build_skeleton(armature, previous)?;
            if let Some(conversion) = axis {
                conversion.apply_skeleton(&mut built);
            }
            let binding = BoneBinding::from_skeleton(&built, format!("{stem}.skeleton"));
            skeleton = Some(built);
            Some(binding)
        }
        _ => linked.as_ref().map(|l| BoneBinding::from_skeleton(&l.skeleton, l.file.clone())),
    };
    if binding.is_none() && scene_meshes.iter().any(|m| !m.weights.is_empty()) {
        tracing::warn!("No skeleton to bind to; skin weights are not exported");
    }

    progress(&ConvertProgress::new(ConvertPhase::BuildingMeshes, 3, 4));
    let mut mesh = Mesh { skeleton_link: binding.as_ref().map(|b| b.link.clone()), ..Mesh::default() };
    for scene_mesh in &scene_meshes {
        append_scene_mesh(&mut mesh, scene_mesh, binding.as_ref(), options)?;
    }

    progress(&ConvertProgress::new(ConvertPhase::BuildingAnimations, 4, 4));
    if options.export_animation {
        for action in adapter.actions()? {
            let (bone_animation, morph_animation) = build_animation(&action, binding.as_ref(), options)?;
            if let Some(mut animation) = bone_animation {
                match &mut skeleton {
                    Some(skeleton) => {
                        if let Some(conversion) = axis {
                            conversion.apply_animation(&mut animation);
                        }
                        skeleton.animations.push(animation);
                    }
                    None => tracing::warn!(
                        "Action '{}' animates bones but no skeleton is exported; skipped",
                        action.name
                    ),
                }
            }
            if let Some(animation) = morph_animation {
                mesh.animations.push(animation);
            }
        }
    }

    if let Some(conversion) = axis {
        conversion.apply_mesh(&mut mesh);
    }

    let (materials, textures) = if options.export_materials {
        build_materials(&mesh, &adapter.materials()?)
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(ExportBundle { mesh, skeleton, materials, textures })
}

fn build_skeleton(armature: &SceneArmature, previous: Option<&Skeleton>) -> Result<Skeleton> {
    let drafts: Vec<BoneDraft> = armature
        .bones
        .iter()
        .map(|b| BoneDraft::new(b.name.clone(), b.parent.as_deref(), b.transform))
        .collect();
    assign_bone_ids(&drafts, previous)
}

/// Convert one polygon corner to a vertex.
fn corner_vertex(
    scene_mesh: &SceneMesh,
    corner: &crate::scene::SceneCorner,
    face_normal: Vec3,
    colour_layers: (Option<usize>, Option<usize>),
    binding: Option<&BoneBinding>,
) -> Vertex {
    let position = scene_mesh.positions[corner.vertex as usize];
    let normal = corner.normal.try_normalize().unwrap_or(face_normal);
    let mut vertex = Vertex::new(position, normal);
    vertex.uvs.clone_from(&corner.uvs);

    let (rgb_layer, alpha_layer) = colour_layers;
    if rgb_layer.is_some() || alpha_layer.is_some() {
        let rgb = rgb_layer.and_then(|i| corner.colours.get(i)).copied().unwrap_or(Vec3::ONE);
        let alpha = alpha_layer
            .and_then(|i| corner.colours.get(i))
            .map_or(1.0, |c| (c.x + c.y + c.z) / 3.0);
        vertex.colour = Some(Vec4::new(rgb.x, rgb.y, rgb.z, alpha));
    }

    if let Some(binding) = binding
        && let Some(memberships) = scene_mesh.weights.get(corner.vertex as usize)
    {
        vertex.weights = memberships
            .iter()
            .filter_map(|m| {
                let group = scene_mesh.vertex_groups.get(m.group)?;
                let bone = binding.ids.get(group)?;
                Some(BoneWeight::new(*bone, m.weight))
            })
            .collect();
        normalize_weights(&mut vertex.weights);
    }
    vertex
}

/// Triangulate, weld and bake one scene object, appending its submeshes
/// and poses to `mesh`.
fn append_scene_mesh(
    mesh: &mut Mesh,
    scene_mesh: &SceneMesh,
    binding: Option<&BoneBinding>,
    options: &ExportOptions,
) -> Result<()> {
    let vertex_count = scene_mesh.positions.len();
    let invalid = |what: String| Error::InvalidMesh(format!("object '{}': {what}", scene_mesh.name));

    for polygon in &scene_mesh.polygons {
        if let Some(corner) = polygon.corners.iter().find(|c| c.vertex as usize >= vertex_count) {
            return Err(invalid(format!("corner references vertex {} of {vertex_count}", corner.vertex)));
        }
    }
    for key in &scene_mesh.shape_keys {
        if key.positions.len() != vertex_count {
            return Err(invalid(format!(
                "shape key '{}' has {} positions for {vertex_count} vertices",
                key.name,
                key.positions.len()
            )));
        }
    }

    let colour_layers = if options.colours {
        (
            scene_mesh.colour_layers.iter().position(|n| *n != options.alpha_layer),
            scene_mesh.colour_layers.iter().position(|n| *n == options.alpha_layer),
        )
    } else {
        (None, None)
    };

    // Polygons per material slot, in slot order of first use.
    let mut buckets: IndexMap<usize, Vec<&ScenePolygon>> = IndexMap::new();
    for polygon in &scene_mesh.polygons {
        let slot = if options.group_by_material { polygon.material } else { 0 };
        buckets.entry(slot).or_default().push(polygon);
    }

    for (slot, polygons) in buckets {
        let material = scene_mesh.materials.get(slot).cloned().unwrap_or_else(|| DEFAULT_MATERIAL.to_string());
        let mut submesh = Submesh::new(material);
        submesh.name = Some(scene_mesh.name.clone());
        let mut sources: Vec<u32> = Vec::new();

        for polygon in polygons {
            let points: Vec<Vec3> = polygon.corners.iter().map(|c| scene_mesh.positions[c.vertex as usize]).collect();
            let face_normal = geometry::triangulate::newell_normal(&points).normalize_or_zero();
            let base = submesh.vertices.len() as u32;
            for corner in &polygon.corners {
                submesh.vertices.push(corner_vertex(scene_mesh, corner, face_normal, colour_layers, binding));
                sources.push(corner.vertex);
            }
            for tri in triangulate_polygon(&points) {
                submesh.indices.extend(tri.map(|i| base + i as u32));
            }
        }

        // Coincident source vertices may move apart under a shape key.
        let (welded, remap) = if options.shape_keys && !scene_mesh.shape_keys.is_empty() {
            geometry::weld_keyed(&submesh.vertices, &sources, &options.weld_tolerance)
        } else {
            geometry::weld(&submesh.vertices, &options.weld_tolerance)
        };
        let mut welded_sources = vec![0u32; welded.len()];
        for (corner, &target) in remap.iter().enumerate().rev() {
            welded_sources[target as usize] = sources[corner];
        }
        for index in &mut submesh.indices {
            *index = remap[*index as usize];
        }
        submesh.vertices = welded;

        if options.apply_transform {
            transform::bake(&mut submesh, scene_mesh.transform);
        }
        geometry::cull_degenerate_triangles(&mut submesh);

        let submesh_index = mesh.submeshes.len();
        if options.shape_keys {
            for key in &scene_mesh.shape_keys {
                let offsets = welded_sources
                    .iter()
                    .enumerate()
                    .filter_map(|(vertex, &source)| {
                        let delta = key.positions[source as usize] - scene_mesh.positions[source as usize];
                        (delta.length_squared() > MIN_POSE_OFFSET_SQ).then_some((vertex as u32, delta))
                    })
                    .collect();
                let mut pose = Pose { name: key.name.clone(), submesh: submesh_index, offsets, normals: None };
                if options.apply_transform {
                    transform::bake_pose(&mut pose, scene_mesh.transform);
                }
                mesh.poses.push(pose);
            }
        }
        mesh.submeshes.push(submesh);
    }
    Ok(())
}

/// Split an action into a bone animation and a morph animation.
fn build_animation(
    action: &SceneAction,
    binding: Option<&BoneBinding>,
    options: &ExportOptions,
) -> Result<(Option<Animation>, Option<Animation>)> {
    let length = action.duration();

    let bone_animation = match binding {
        Some(binding) if !action.bones.is_empty() => {
            let mut animation = Animation::new(action.name.clone(), length);
            for samples in &action.bones {
                let bone = *binding
                    .ids
                    .get(&samples.bone)
                    .ok_or_else(|| Error::UnknownBoneName { name: samples.bone.clone() })?;
                animation.tracks.push(BoneTrack { bone, keyframes: samples.samples.clone() });
            }
            Some(animation)
        }
        None if !action.bones.is_empty() => {
            tracing::warn!("Action '{}' animates bones but there is no skeleton; bone tracks skipped", action.name);
            None
        }
        _ => None,
    };

    let morph_animation = (options.shape_keys && !action.shapes.is_empty()).then(|| {
        let mut animation = Animation::new(action.name.clone(), length);
        animation.morph_tracks = action
            .shapes
            .iter()
            .map(|s| MorphTrack { shape: s.shape.clone(), keys: s.samples.clone() })
            .collect();
        animation
    });

    Ok((bone_animation, morph_animation))
}

/// One script entry per material used, in order of first use, plus the
/// texture files they name.
fn build_materials(mesh: &Mesh, scene_materials: &[SceneMaterial]) -> (Vec<MaterialScript>, Vec<PathBuf>) {
    let mut scripts: IndexMap<&str, MaterialScript> = IndexMap::new();
    let mut textures = Vec::new();
    for submesh in &mesh.submeshes {
        if scripts.contains_key(submesh.material.as_str()) {
            continue;
        }
        let mut script = MaterialScript::new(submesh.material.clone());
        if let Some(found) = scene_materials.iter().find(|m| m.name == submesh.material) {
            for texture in &found.textures {
                let path = PathBuf::from(texture);
                let file = path.file_name().map_or_else(|| texture.clone(), |f| f.to_string_lossy().into_owned());
                script.textures.push(file);
                textures.push(path);
            }
        }
        scripts.insert(submesh.material.as_str(), script);
    }
    (scripts.into_values().collect(), textures)
}

/// Export a scene to `dest` (a `.mesh` path).
///
/// # Errors
/// See [`build_export`]; encode errors; IO errors while writing. Nothing is
/// written unless every buffer encodes.
pub fn export_scene<A: SceneAdapter + ?Sized>(adapter: &A, dest: &Path, options: &ExportOptions) -> Result<ExportResult> {
    export_scene_with_progress(adapter, dest, options, &no_progress)
}

/// Export with progress updates.
///
/// # Errors
/// See [`export_scene`].
pub fn export_scene_with_progress<A: SceneAdapter + ?Sized>(
    adapter: &A,
    dest: &Path,
    options: &ExportOptions,
    progress: ProgressCallback,
) -> Result<ExportResult> {
    tracing::info!("Exporting {}", dest.display());
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(dest.display().to_string()))?;
    let bundle = build_export_with_progress(adapter, &stem, options, progress)?;

    progress(&ConvertProgress::new(ConvertPhase::Encoding, 1, 1));
    let mut pending = vec![PendingFile::new(dest, encode_mesh_bytes(&bundle.mesh, &options.mesh_encode_options())?)];
    let mut result = ExportResult {
        mesh_path: dest.to_path_buf(),
        submeshes: bundle.mesh.submeshes.len(),
        vertices: bundle.mesh.vertex_count(),
        triangles: bundle.mesh.triangle_count(),
        ..ExportResult::default()
    };
    if options.keep_intermediate {
        pending.push(PendingFile::json(dest, &bundle.mesh)?);
    }

    if let (Some(skeleton), Some(link)) = (&bundle.skeleton, &bundle.mesh.skeleton_link) {
        let path = dest.with_file_name(link);
        pending.push(PendingFile::new(&path, encode_skeleton_bytes(skeleton, &options.skeleton_encode_options())?));
        if options.keep_intermediate {
            pending.push(PendingFile::json(&path, skeleton)?);
        }
        result.skeleton_path = Some(path);
    }

    if options.export_materials && !bundle.materials.is_empty() {
        let path = material_path(dest);
        if path.exists() && !options.overwrite_material {
            tracing::info!("Keeping existing {}", path.display());
        } else {
            pending.push(PendingFile::new(&path, render_materials(&bundle.materials).into_bytes()));
            result.material_path = Some(path);
        }
    }

    progress(&ConvertProgress::new(ConvertPhase::WritingFiles, 1, 1));
    write_pending(&pending)?;
    result.intermediate = pending.iter().filter(|f| f.path.extension().is_some_and(|e| e == "json")).map(|f| f.path.clone()).collect();

    if options.copy_textures {
        result.copied_textures = copy_textures(&bundle.textures, dest);
    }

    progress(&ConvertProgress::new(ConvertPhase::Complete, 1, 1));
    tracing::info!(
        "Exported {}: {} submeshes, {} vertices, {} triangles",
        dest.display(),
        result.submeshes,
        result.vertices,
        result.triangles
    );
    Ok(result)
}

/// Copy texture files next to `dest`; missing sources are warned about.
fn copy_textures(textures: &[PathBuf], dest: &Path) -> Vec<PathBuf> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut copied = Vec::new();
    for source in textures {
        let Some(file) = source.file_name() else { continue };
        let target = dir.join(file);
        if target == *source {
            continue;
        }
        match std::fs::copy(source, &target) {
            Ok(_) => copied.push(target),
            Err(e) => tracing::warn!("Could not copy texture {}: {e}", source.display()),
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{GroupWeight, MemoryScene, SceneBone, SceneCorner, SceneShapeKey, ShapeSamples};
    use crate::formats::chunk::ids::mesh as mesh_ids;
    use crate::formats::chunk::{ChunkNode, chunk_tree};
    use crate::formats::{ChunkFamily, decode_mesh_bytes};
    use crate::model::{MorphKey, Transform};
    use glam::{Mat4, Vec2};

    fn corner(vertex: u32, uv: Vec2) -> SceneCorner {
        SceneCorner { vertex, normal: Vec3::Z, uvs: vec![uv], colours: vec![Vec3::ONE, Vec3::splat(0.5)] }
    }

    /// Two quads sharing an edge, the second with a different material.
    fn scene() -> MemoryScene {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
        ];
        let quad = |ids: [u32; 4], material| ScenePolygon {
            material,
            corners: ids.iter().map(|&i| corner(i, positions[i as usize].truncate())).collect(),
        };
        let mut moved = positions.clone();
        moved[2].z = 0.5;
        MemoryScene {
            meshes: vec![SceneMesh {
                name: "slab".into(),
                transform: Mat4::IDENTITY,
                polygons: vec![quad([0, 1, 2, 3], 0), quad([1, 4, 5, 2], 1)],
                positions,
                materials: vec!["stone".into(), "moss".into()],
                uv_layers: vec!["UVMap".into()],
                colour_layers: vec!["Col".into(), "Alpha".into()],
                vertex_groups: vec!["Root".into(), "not a bone".into()],
                weights: vec![vec![GroupWeight { group: 0, weight: 1.0 }, GroupWeight { group: 1, weight: 1.0 }]; 6],
                shape_keys: vec![SceneShapeKey { name: "bump".into(), positions: moved }],
            }],
            armature: Some(SceneArmature {
                name: "rig".into(),
                bones: vec![SceneBone { name: "Root".into(), parent: None, transform: Transform::IDENTITY }],
            }),
            ..MemoryScene::default()
        }
    }

    #[test]
    fn test_build_welds_and_splits_by_material() {
        let options = ExportOptions {
            group_by_material: true,
            colours: true,
            shape_keys: true,
            export_skeleton: true,
            ..ExportOptions::default()
        };
        let bundle = build_export(&scene(), "slab", &options).unwrap();
        let mesh = &bundle.mesh;
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[0].material, "stone");
        assert_eq!(mesh.submeshes[0].vertices.len(), 4);
        assert_eq!(mesh.submeshes[0].indices.len(), 6);
        assert_eq!(mesh.skeleton_link.as_deref(), Some("slab.skeleton"));

        let v = &mesh.submeshes[0].vertices[0];
        assert_eq!(v.colour, Some(Vec4::new(1.0, 1.0, 1.0, 0.5)));
        assert_eq!(v.weights, vec![BoneWeight::new(0, 1.0)]);

        // Only the moved vertex carries an offset, once per submesh using it.
        assert_eq!(mesh.poses.len(), 2);
        assert_eq!(mesh.poses[0].offsets.len(), 1);
        assert_eq!(mesh.poses[0].offsets[0].1, Vec3::new(0.0, 0.0, 0.5));
        assert_eq!(mesh.poses[1].submesh, 1);
    }

    #[test]
    fn test_without_grouping_one_submesh() {
        let bundle = build_export(&scene(), "slab", &ExportOptions::default()).unwrap();
        let mesh = &bundle.mesh;
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].material, "stone");
        // Shared edge corners weld across the two quads.
        assert_eq!(mesh.submeshes[0].vertices.len(), 6);
        assert!(mesh.poses.is_empty());
        assert!(mesh.submeshes[0].vertices.iter().all(|v| v.colour.is_none()));
        // No skeleton exported or linked, so no weights.
        assert!(!mesh.is_skinned());
    }

    #[test]
    fn test_unknown_animated_bone() {
        let mut scene = scene();
        scene.actions.push(SceneAction {
            name: "wave".into(),
            bones: vec![crate::scene::BoneSamples {
                bone: "Arm".into(),
                samples: vec![crate::model::Keyframe::new(0.0, Vec3::ZERO, glam::Quat::IDENTITY)],
            }],
            ..SceneAction::default()
        });
        let options = ExportOptions { export_skeleton: true, export_animation: true, ..ExportOptions::default() };
        let err = build_export(&scene, "slab", &options).unwrap_err();
        assert!(matches!(err, Error::UnknownBoneName { name } if name == "Arm"));
    }

    fn count_chunks(nodes: &[ChunkNode], id: u16) -> usize {
        nodes.iter().map(|n| usize::from(n.id == id) + count_chunks(&n.children, id)).sum()
    }

    #[test]
    fn test_animated_shape_key_across_materials() {
        let mut scene = scene();
        scene.actions.push(SceneAction {
            name: "talk".into(),
            shapes: vec![ShapeSamples {
                shape: "bump".into(),
                samples: vec![MorphKey { time: 0.0, weight: 0.0 }, MorphKey { time: 1.0, weight: 1.0 }],
            }],
            ..SceneAction::default()
        });
        let options = ExportOptions {
            group_by_material: true,
            shape_keys: true,
            export_animation: true,
            ..ExportOptions::default()
        };
        let bundle = build_export(&scene, "slab", &options).unwrap();
        let data = encode_mesh_bytes(&bundle.mesh, &options.mesh_encode_options()).unwrap();

        // One pose track per submesh, each key referencing that submesh's pose.
        let tree = chunk_tree(&data, ChunkFamily::Mesh).unwrap();
        assert_eq!(count_chunks(&tree, mesh_ids::ANIMATION_TRACK), 2);
        assert_eq!(count_chunks(&tree, mesh_ids::ANIMATION_POSE_REF), 4);

        let mesh = decode_mesh_bytes(&data).unwrap();
        let poses: Vec<(&str, usize)> = mesh.poses.iter().map(|p| (p.name.as_str(), p.submesh)).collect();
        assert_eq!(poses, vec![("bump", 0), ("bump", 1)]);
        assert_eq!(mesh.animations.len(), 1);
        assert_eq!(mesh.animations[0].morph_tracks.len(), 1);
        assert_eq!(mesh.animations[0].morph_tracks[0].keys, scene.actions[0].shapes[0].samples);
    }

    #[test]
    fn test_coincident_vertices_split_by_shape_key() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(0.5, 1.0, 0.0),
        ];
        let tri = |ids: [u32; 3]| ScenePolygon {
            material: 0,
            corners: ids.iter().map(|&i| corner(i, positions[i as usize].truncate())).collect(),
        };
        let mut parted = positions.clone();
        parted[2].y -= 0.5;
        parted[5].y += 0.5;
        let scene = MemoryScene {
            meshes: vec![SceneMesh {
                name: "lips".into(),
                transform: Mat4::IDENTITY,
                polygons: vec![tri([0, 1, 2]), tri([3, 5, 4])],
                positions,
                materials: vec!["skin".into()],
                uv_layers: vec!["UVMap".into()],
                colour_layers: Vec::new(),
                vertex_groups: Vec::new(),
                weights: Vec::new(),
                shape_keys: vec![SceneShapeKey { name: "open".into(), positions: parted }],
            }],
            ..MemoryScene::default()
        };

        // Without shape keys the tips weld.
        let plain = build_export(&scene, "lips", &ExportOptions::default()).unwrap();
        assert_eq!(plain.mesh.submeshes[0].vertices.len(), 5);

        let options = ExportOptions { shape_keys: true, ..ExportOptions::default() };
        let bundle = build_export(&scene, "lips", &options).unwrap();
        assert_eq!(bundle.mesh.submeshes[0].vertices.len(), 6);
        let mut offsets: Vec<Vec3> = bundle.mesh.poses[0].offsets.iter().map(|(_, d)| *d).collect();
        offsets.sort_by(|a, b| a.y.total_cmp(&b.y));
        assert_eq!(offsets, vec![Vec3::new(0.0, -0.5, 0.0), Vec3::new(0.0, 0.5, 0.0)]);
    }
}
