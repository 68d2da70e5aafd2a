//! Conversion pipelines
//!
//! - `.mesh` (+ `.skeleton`, `.material`) → host scene: [`import_mesh`]
//! - host scene → `.mesh` (+ `.skeleton`, `.material`): [`export_scene`]
//! - binary ↔ JSON model documents: [`convert_to_json`], [`convert_from_json`]

pub mod export;
pub mod import;
pub mod material;
pub mod output;
pub mod types;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::{
    ChunkFamily, MeshEncodeOptions, SkeletonEncodeOptions, decode_mesh_bytes, decode_skeleton_bytes, detect_family,
    encode_mesh_bytes, encode_skeleton_bytes,
};
use crate::model::{Mesh, Skeleton};

pub use export::{ExportBundle, ExportResult, build_export, export_scene, export_scene_with_progress};
pub use import::{ImportResult, ImportedModel, import_mesh, import_mesh_with_progress, load_model};
pub use material::MaterialScript;
pub use output::write_atomic;
pub use types::{ConvertPhase, ConvertProgress, ProgressCallback};

/// A decoded file in its JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelDocument {
    Mesh(Mesh),
    Skeleton(Skeleton),
}

impl ModelDocument {
    /// Decode a `.mesh` or `.skeleton` buffer, choosing by its header.
    ///
    /// # Errors
    /// [`Error::UnsupportedVersion`] or any decode error.
    pub fn decode(data: &[u8]) -> Result<Self> {
        match detect_family(data)? {
            ChunkFamily::Mesh => Ok(Self::Mesh(decode_mesh_bytes(data)?)),
            ChunkFamily::Skeleton => Ok(Self::Skeleton(decode_skeleton_bytes(data)?)),
        }
    }

    /// # Errors
    /// Any encode error.
    pub fn encode(&self, mesh: &MeshEncodeOptions, skeleton: &SkeletonEncodeOptions) -> Result<Vec<u8>> {
        match self {
            Self::Mesh(m) => encode_mesh_bytes(m, mesh),
            Self::Skeleton(s) => encode_skeleton_bytes(s, skeleton),
        }
    }

    #[must_use]
    pub fn family(&self) -> ChunkFamily {
        match self {
            Self::Mesh(_) => ChunkFamily::Mesh,
            Self::Skeleton(_) => ChunkFamily::Skeleton,
        }
    }
}

/// Read and decode a `.mesh` or `.skeleton` file.
///
/// # Errors
/// IO or decode errors, wrapped with the file path.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<ModelDocument> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::from(e).in_file(path))?;
    ModelDocument::decode(&data).map_err(|e| e.in_file(path))
}

/// Decode `source` and write it as pretty JSON to `dest`.
///
/// # Errors
/// Decode, JSON or IO errors.
pub fn convert_to_json(source: &Path, dest: &Path) -> Result<ModelDocument> {
    let document = read_document(source)?;
    let json = serde_json::to_string_pretty(&document)?;
    write_atomic(dest, json.as_bytes())?;
    tracing::info!("Converted {} to {}", source.display(), dest.display());
    Ok(document)
}

/// Encode a JSON model document from `source` into `dest`.
///
/// # Errors
/// JSON, encode or IO errors.
pub fn convert_from_json(
    source: &Path,
    dest: &Path,
    mesh: &MeshEncodeOptions,
    skeleton: &SkeletonEncodeOptions,
) -> Result<ModelDocument> {
    let text = std::fs::read_to_string(source).map_err(|e| Error::from(e).in_file(source))?;
    let document: ModelDocument = serde_json::from_str(&text).map_err(|e| Error::from(e).in_file(source))?;
    let bytes = document.encode(mesh, skeleton).map_err(|e| e.in_file(dest))?;
    write_atomic(dest, &bytes)?;
    tracing::info!("Converted {} to {}", source.display(), dest.display());
    Ok(document)
}
