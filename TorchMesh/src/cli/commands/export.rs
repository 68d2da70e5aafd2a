//! Export a scene JSON file to `.mesh`

use std::path::Path;
use std::time::Instant;

use crate::cli::progress::{print_done, print_progress};
use crate::config::ExportOptions;
use crate::converter::export_scene_with_progress;
use crate::scene::MemoryScene;

/// Export the scene saved at `scene` to `output`.
pub fn execute(scene: &Path, output: &Path, options: &ExportOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let scene = MemoryScene::load(scene)?;
    let result = export_scene_with_progress(&scene, output, options, &print_progress)?;

    println!(
        "Exported {} submeshes, {} vertices, {} triangles",
        result.submeshes, result.vertices, result.triangles
    );
    println!("Mesh:     {}", result.mesh_path.display());
    if let Some(path) = &result.skeleton_path {
        println!("Skeleton: {}", path.display());
    }
    if let Some(path) = &result.material_path {
        println!("Material: {}", path.display());
    }
    for path in &result.copied_textures {
        println!("Texture:  {}", path.display());
    }
    for path in &result.intermediate {
        println!("Kept intermediate: {}", path.display());
    }
    print_done(start.elapsed());
    Ok(())
}
