//! Import pipeline: `.mesh` (plus linked skeleton and materials) into a scene
//!
//! Everything is decoded and checked before the adapter sees any of it, so a
//! bad file never leaves half-created host objects behind.

use std::path::{Path, PathBuf};

use super::material::{MaterialScript, material_path, read_materials};
use super::output::{PendingFile, write_pending};
use super::types::{ConvertPhase, ConvertProgress, ProgressCallback, no_progress};
use crate::config::ImportOptions;
use crate::error::Result;
use crate::formats::{read_mesh, read_skeleton};
use crate::geometry::{AxisConversion, UpAxis};
use crate::model::{Animation, BoneId, Mesh, suggest_frame_rate};
use crate::scene::{ImportedMesh, ImportedSkeleton, SceneAdapter, SceneArmature};

/// A mesh file and its companions, decoded and converted to the host's axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedModel {
    /// File stem of the mesh.
    pub name: String,
    pub mesh: Mesh,
    pub skeleton: Option<ImportedSkeleton>,
    pub materials: Vec<MaterialScript>,
    /// Frame rate implied by the animations, when requested.
    pub frame_rate: Option<u32>,
}

/// Summary of a finished import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub submeshes: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub bones: usize,
    pub animations: usize,
    pub materials: usize,
    pub frame_rate: Option<u32>,
    /// Intermediate JSON files written.
    pub intermediate: Vec<PathBuf>,
}

fn stem_of(path: &Path) -> String {
    path.file_stem().map_or_else(|| "mesh".to_string(), |s| s.to_string_lossy().into_owned())
}

/// Where a mesh's skeleton link points, resolved next to the mesh.
///
/// Torchlight links sometimes carry a resource directory; only the file name
/// is used.
#[must_use]
pub fn skeleton_path(mesh_path: &Path, link: &str) -> PathBuf {
    let file = Path::new(link).file_name().map_or_else(|| PathBuf::from(link), PathBuf::from);
    mesh_path.with_file_name(file)
}

/// Decode a mesh, its linked skeleton and its material script.
///
/// `up_axis` is the host's convention; the model comes back converted to it.
///
/// # Errors
/// Any decode error for the mesh or an existing linked skeleton. A missing
/// skeleton or material file is only a warning.
pub fn load_model(path: &Path, options: &ImportOptions, up_axis: UpAxis) -> Result<ImportedModel> {
    load_model_with_progress(path, options, up_axis, &no_progress)
}

fn load_model_with_progress(
    path: &Path,
    options: &ImportOptions,
    up_axis: UpAxis,
    progress: ProgressCallback,
) -> Result<ImportedModel> {
    let name = stem_of(path);

    progress(&ConvertProgress::with_file(ConvertPhase::ReadingMesh, 1, 4, path.display().to_string()));
    let mut mesh = read_mesh(path)?;
    if !options.import_shape_keys {
        mesh.poses.clear();
        mesh.animations.clear();
    }
    if !options.import_animations {
        mesh.animations.clear();
    }

    progress(&ConvertProgress::new(ConvertPhase::ReadingSkeleton, 2, 4));
    let mut skeleton = None;
    if let Some(link) = mesh.skeleton_link.clone()
        && !options.use_selected_skeleton
    {
        let skel_path = skeleton_path(path, &link);
        if skel_path.is_file() {
            let mut decoded = read_skeleton(&skel_path)?;
            if !options.import_animations {
                decoded.animations.clear();
            }
            skeleton = Some(ImportedSkeleton { name: stem_of(&skel_path), file: link, skeleton: decoded });
        } else {
            tracing::warn!("Linked skeleton {} not found; importing without it", skel_path.display());
        }
    }

    if let Some(imported) = &skeleton {
        let unknown = mesh
            .submeshes
            .iter()
            .flat_map(|s| s.vertices.iter())
            .flat_map(|v| v.weights.iter())
            .filter(|w| imported.skeleton.bone(w.bone).is_none())
            .count();
        if unknown > 0 {
            tracing::warn!("{unknown} skin weights reference bones missing from {}", imported.file);
        }
    }

    progress(&ConvertProgress::new(ConvertPhase::ReadingMaterials, 3, 4));
    let script = material_path(path);
    let materials = if script.is_file() { read_materials(&script)? } else { Vec::new() };

    let frame_rate = if options.adjust_frame_rate && options.import_animations {
        let mut all: Vec<Animation> = mesh.animations.clone();
        if let Some(imported) = &skeleton {
            all.extend(imported.skeleton.animations.iter().cloned());
        }
        suggest_frame_rate(&all)
    } else {
        None
    };

    if let Some(conversion) = AxisConversion::between(UpAxis::Y, up_axis) {
        conversion.apply_mesh(&mut mesh);
        if let Some(imported) = &mut skeleton {
            conversion.apply_skeleton(&mut imported.skeleton);
        }
    }

    Ok(ImportedModel { name, mesh, skeleton, materials, frame_rate })
}

/// Bone names for weights when binding to an armature already in the scene.
///
/// OGRE hands out bone handles in file order, so the n-th bone gets id n.
fn selected_bone_names(armature: &SceneArmature) -> Vec<(BoneId, String)> {
    armature.bones.iter().enumerate().map(|(i, bone)| (i as BoneId, bone.name.clone())).collect()
}

/// Import a `.mesh` file into `adapter`.
///
/// # Errors
/// Decode errors (before any adapter call) and adapter errors.
pub fn import_mesh<A: SceneAdapter + ?Sized>(adapter: &mut A, path: &Path, options: &ImportOptions) -> Result<ImportResult> {
    import_mesh_with_progress(adapter, path, options, &no_progress)
}

/// Import with progress updates.
///
/// # Errors
/// See [`import_mesh`].
pub fn import_mesh_with_progress<A: SceneAdapter + ?Sized>(
    adapter: &mut A,
    path: &Path,
    options: &ImportOptions,
    progress: ProgressCallback,
) -> Result<ImportResult> {
    tracing::info!("Importing {}", path.display());
    let model = load_model_with_progress(path, options, adapter.up_axis(), progress)?;

    let bone_names = match (&model.skeleton, options.use_selected_skeleton) {
        (_, true) => match adapter.selected_armature() {
            Some(armature) => selected_bone_names(&armature),
            None => {
                tracing::warn!("No armature selected; skin weights get placeholder group names");
                Vec::new()
            }
        },
        (Some(imported), false) => imported.skeleton.bones.iter().map(|b| (b.id, b.name.clone())).collect(),
        (None, false) => Vec::new(),
    };

    let mut result = ImportResult {
        submeshes: model.mesh.submeshes.len(),
        vertices: model.mesh.vertex_count(),
        triangles: model.mesh.triangle_count(),
        bones: model.skeleton.as_ref().map_or(0, |s| s.skeleton.bones.len()),
        animations: model.mesh.animations.len() + model.skeleton.as_ref().map_or(0, |s| s.skeleton.animations.len()),
        materials: model.materials.len(),
        frame_rate: model.frame_rate,
        intermediate: Vec::new(),
    };

    if options.keep_intermediate {
        let mut pending = vec![PendingFile::json(path, &model.mesh)?];
        if let Some(imported) = &model.skeleton {
            pending.push(PendingFile::json(&skeleton_path(path, &imported.file), &imported.skeleton)?);
        }
        write_pending(&pending)?;
        result.intermediate = pending.into_iter().map(|f| f.path).collect();
    }

    let steps = 3 + model.materials.len();
    progress(&ConvertProgress::new(ConvertPhase::PopulatingScene, 1, steps));
    for material in &model.materials {
        adapter.create_material(material)?;
    }
    if let Some(imported) = &model.skeleton {
        adapter.create_armature(imported)?;
    }
    adapter.create_geometry(&ImportedMesh {
        name: model.name.clone(),
        mesh: model.mesh.clone(),
        bone_names,
        custom_normals: options.import_normals,
    })?;
    if let Some(imported) = &model.skeleton {
        for animation in &imported.skeleton.animations {
            adapter.create_action(animation, Some(&imported.skeleton))?;
        }
    }
    for animation in &model.mesh.animations {
        adapter.create_action(animation, None)?;
    }
    if let Some(fps) = model.frame_rate {
        adapter.set_frame_rate(fps)?;
    }

    progress(&ConvertProgress::new(ConvertPhase::Complete, steps, steps));
    tracing::info!(
        "Imported {}: {} submeshes, {} vertices, {} bones, {} animations",
        model.name,
        result.submeshes,
        result.vertices,
        result.bones,
        result.animations
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_path_drops_directories() {
        let p = skeleton_path(Path::new("/data/hero.mesh"), "media/models/hero.skeleton");
        assert_eq!(p, PathBuf::from("/data/hero.skeleton"));
    }

    #[test]
    fn test_selected_bone_names_follow_order() {
        let armature = SceneArmature {
            name: "rig".into(),
            bones: ["Root", "Spine"]
                .iter()
                .map(|n| crate::scene::SceneBone {
                    name: (*n).to_string(),
                    parent: None,
                    transform: crate::model::Transform::IDENTITY,
                })
                .collect(),
        };
        assert_eq!(selected_bone_names(&armature), vec![(0, "Root".to_string()), (1, "Spine".to_string())]);
    }
}
