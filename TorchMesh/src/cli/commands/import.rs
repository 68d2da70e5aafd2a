//! Import a `.mesh` into a scene JSON file

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{print_done, print_progress};
use crate::config::ImportOptions;
use crate::converter::import_mesh_with_progress;
use crate::geometry::UpAxis;
use crate::scene::MemoryScene;

/// Import `mesh` into a [`MemoryScene`] and save it to `output`.
///
/// With `into`, the mesh is added to that existing scene (whose armature is
/// the selected one for `use_selected_skeleton`).
pub fn execute(
    mesh: &Path,
    output: &Path,
    into: Option<&Path>,
    up_axis: UpAxis,
    options: &ImportOptions,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut scene = match into {
        Some(path) => MemoryScene::load(path)?,
        None => MemoryScene::new(up_axis),
    };

    let result = import_mesh_with_progress(&mut scene, mesh, options, &print_progress)?;
    scene.save(output)?;

    println!(
        "Imported {} submeshes, {} vertices, {} triangles, {} bones, {} animations, {} materials",
        result.submeshes, result.vertices, result.triangles, result.bones, result.animations, result.materials
    );
    if let Some(fps) = result.frame_rate {
        println!("Frame rate: {fps} fps");
    }
    for path in &result.intermediate {
        println!("Kept intermediate: {}", path.display());
    }
    println!("Scene written to {}", output.display());
    print_done(start.elapsed());
    Ok(())
}
