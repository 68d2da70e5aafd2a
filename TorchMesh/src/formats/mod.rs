//! Codecs for the OGRE mesh and skeleton binary formats
//!
//! Both file kinds share the [`chunk`] container. The leading `HEADER` chunk
//! carries a serializer version string that decides which codec, and which
//! version strategy within it, applies.

pub mod animation;
pub mod chunk;
pub mod mesh;
pub mod skeleton;

use std::path::Path;

use crate::error::{Error, Result};

pub use chunk::{ChunkFamily, ChunkReader, ChunkWriter};
pub use mesh::{
    MeshEncodeOptions, MeshFeatures, MeshVersion, decode_mesh, decode_mesh_bytes, encode_mesh,
    encode_mesh_bytes, read_mesh,
};
pub use skeleton::{
    BoneDraft, SkeletonEncodeOptions, SkeletonFeatures, SkeletonVersion, assign_bone_ids,
    decode_skeleton, decode_skeleton_bytes, encode_skeleton, encode_skeleton_bytes, read_skeleton,
};

/// Read the leading `HEADER` chunk and return its version string.
///
/// # Errors
/// [`Error::UnsupportedVersion`] when the first chunk is not a header, plus
/// the usual chunk errors.
pub fn read_version_header(reader: &mut ChunkReader<'_>) -> Result<String> {
    let header = reader.read_chunk_header()?;
    if header.id != chunk::ids::HEADER {
        return Err(Error::UnsupportedVersion {
            found: format!("chunk 0x{:04X} where the file header was expected", header.id),
        });
    }
    reader.enter(&header);
    let version = reader.read_string()?;
    reader.leave(&header)?;
    tracing::debug!("File header: {version}");
    Ok(version)
}

/// Write the leading `HEADER` chunk.
///
/// # Errors
/// Only nesting errors from the writer.
pub fn write_version_header(writer: &mut ChunkWriter, version: &str) -> Result<()> {
    writer.chunk(chunk::ids::HEADER, |w| {
        w.write_string(version);
        Ok(())
    })
}

/// Work out from the header string whether `data` is a mesh or a skeleton.
///
/// # Errors
/// [`Error::UnsupportedVersion`] for any string neither codec knows.
pub fn detect_family(data: &[u8]) -> Result<ChunkFamily> {
    let mut reader = ChunkReader::new(data);
    let version = read_version_header(&mut reader)?;
    if MeshVersion::from_header(&version).is_some() {
        Ok(ChunkFamily::Mesh)
    } else if SkeletonVersion::from_header(&version).is_some() {
        Ok(ChunkFamily::Skeleton)
    } else {
        Err(Error::UnsupportedVersion { found: version })
    }
}

/// Family implied by a file extension, if it is one of ours.
#[must_use]
pub fn family_from_path(path: &Path) -> Option<ChunkFamily> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mesh" => Some(ChunkFamily::Mesh),
        "skeleton" => Some(ChunkFamily::Skeleton),
        _ => None,
    }
}
