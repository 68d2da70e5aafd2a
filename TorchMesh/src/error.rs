//! Error types for `TorchMesh`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `TorchMesh` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A codec error raised while processing a specific file.
    #[error("{}: {source}", path.display())]
    File {
        /// The file being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    // ==================== Chunk Errors ====================
    /// The buffer ended before a declared field or chunk.
    #[error("truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        /// Byte offset where the read started.
        offset: u64,
        /// Number of bytes the field or chunk declared.
        needed: u64,
        /// Number of bytes actually left in the buffer.
        available: u64,
    },

    /// A chunk's length or nesting is inconsistent.
    #[error("malformed chunk 0x{chunk_id:04X} at byte {offset}: {reason}")]
    MalformedChunk {
        /// The chunk id involved (0 when no chunk is open).
        chunk_id: u16,
        /// Byte offset of the problem.
        offset: u64,
        /// Description of the mismatch.
        reason: String,
    },

    /// The file header names a serializer version this codec does not know.
    #[error("unsupported format version: {found}")]
    UnsupportedVersion {
        /// The version string or chunk id that was found.
        found: String,
    },

    // ==================== Skeleton Errors ====================
    /// The bone parent graph contains a cycle.
    #[error("cyclic skeleton: bone {bone_id} is its own ancestor")]
    CyclicSkeleton {
        /// A bone on the cycle.
        bone_id: u16,
    },

    /// Two bones share one identifier.
    #[error("duplicate bone id {bone_id}")]
    DuplicateBoneId {
        /// The repeated id.
        bone_id: u16,
    },

    /// Two bones share one name.
    #[error("duplicate bone name '{name}'")]
    DuplicateBoneName {
        /// The repeated name.
        name: String,
    },

    /// A record references a bone id that does not exist.
    #[error("unknown bone id {bone_id}")]
    UnknownBone {
        /// The missing id.
        bone_id: u16,
    },

    /// A record references a bone name that does not exist.
    #[error("unknown bone '{name}'")]
    UnknownBoneName {
        /// The missing name.
        name: String,
    },

    // ==================== Animation Errors ====================
    /// A keyframe time cannot be ordered (NaN or infinite).
    #[error("unordered keyframes in track '{track}': time {time}")]
    UnorderedKeyframes {
        /// Track description (bone or shape name).
        track: String,
        /// The offending time value.
        time: f32,
    },

    /// A morph track targets a shape key the mesh does not have.
    #[error("unknown shape key '{name}'")]
    UnknownShape {
        /// The shape key name.
        name: String,
    },

    // ==================== Geometry Errors ====================
    /// An index buffer entry references a vertex that does not exist.
    #[error("submesh {submesh}: index {index} out of range ({vertex_count} vertices)")]
    InvalidIndex {
        /// Submesh position in the mesh.
        submesh: usize,
        /// The bad index value.
        index: u32,
        /// Vertex count of the submesh.
        vertex_count: usize,
    },

    /// The mesh violates a structural invariant.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    // ==================== Material Errors ====================
    /// A `.material` script could not be parsed.
    #[error("material script line {line}: {reason}")]
    MaterialScript {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    // ==================== Scene Adapter Errors ====================
    /// The host scene adapter reported a failure.
    #[error("scene adapter error: {0}")]
    Scene(String),

    // ==================== Parsing Errors ====================
    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Invalid file path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),
}

impl Error {
    /// Attach the file path that was being processed.
    #[must_use]
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            // Already attributed; keep the innermost path.
            Error::File { .. } => self,
            other => Error::File {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// The error with any file attribution peeled off.
    #[must_use]
    pub fn innermost(&self) -> &Error {
        match self {
            Error::File { source, .. } => source.innermost(),
            other => other,
        }
    }
}

// Add conversion from walkdir::Error
impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `TorchMesh` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_file_wraps_once() {
        let err = Error::TruncatedInput { offset: 12, needed: 6, available: 2 }
            .in_file("a.mesh")
            .in_file("b.mesh");

        let Error::File { path, .. } = &err else {
            panic!("expected file attribution");
        };
        assert_eq!(path, &PathBuf::from("a.mesh"));
        assert!(matches!(err.innermost(), Error::TruncatedInput { offset: 12, .. }));
        assert!(err.to_string().starts_with("a.mesh: truncated input at byte 12"));
    }
}
