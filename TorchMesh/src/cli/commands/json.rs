//! Binary ↔ JSON model documents

use std::path::{Path, PathBuf};

use crate::config::ExportOptions;
use crate::converter::output::intermediate_path;
use crate::converter::{ModelDocument, convert_from_json, convert_to_json};

fn describe(document: &ModelDocument) -> String {
    match document {
        ModelDocument::Mesh(mesh) => {
            format!("mesh: {} submeshes, {} vertices", mesh.submeshes.len(), mesh.vertex_count())
        }
        ModelDocument::Skeleton(skeleton) => format!(
            "skeleton: {} bones, {} animations",
            skeleton.bones.len(),
            skeleton.animations.len()
        ),
    }
}

/// Decode `source` to JSON; `<source>.json` when no output is given.
pub fn to_json(source: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let dest: PathBuf = output.map_or_else(|| intermediate_path(source), Path::to_path_buf);
    let document = convert_to_json(source, &dest)?;
    println!("Wrote {} ({})", dest.display(), describe(&document));
    Ok(())
}

/// Encode a JSON document using the saved export options.
pub fn from_json(source: &Path, output: &Path, options: &ExportOptions) -> anyhow::Result<()> {
    let document = convert_from_json(
        source,
        output,
        &options.mesh_encode_options(),
        &options.skeleton_encode_options(),
    )?;
    println!("Wrote {} ({})", output.display(), describe(&document));
    Ok(())
}
