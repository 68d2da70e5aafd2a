//! # TorchMesh
//!
//! A pure-Rust library for reading and writing the OGRE binary mesh and
//! skeleton files used by Torchlight.
//!
//! ## Supported Formats
//!
//! - **`.mesh`** - Serializer v1.40 and v1.41 meshes with submeshes, skin weights, poses and morph animations
//! - **`.skeleton`** - Serializer v1.10 and v1.80 skeletons with keyframed animations
//! - **`.material`** - The subset of material scripts naming texture units
//!
//! ## Quick Start
//!
//! ### Reading and Writing Models
//!
//! ```no_run
//! use torchmesh::formats::{MeshEncodeOptions, encode_mesh_bytes, read_mesh};
//!
//! let mesh = read_mesh("hero.mesh")?;
//! println!("{} submeshes, {} vertices", mesh.submeshes.len(), mesh.vertex_count());
//!
//! let bytes = encode_mesh_bytes(&mesh, &MeshEncodeOptions::default())?;
//! std::fs::write("hero_copy.mesh", bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Moving Models Through a Scene
//!
//! ```no_run
//! use std::path::Path;
//! use torchmesh::prelude::*;
//!
//! let mut scene = MemoryScene::new(UpAxis::Z);
//! import_mesh(&mut scene, Path::new("hero.mesh"), &ImportOptions::default())?;
//! export_scene(&scene, Path::new("out/hero.mesh"), &ExportOptions::default())?;
//! # Ok::<(), torchmesh::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `torchmesh` command-line binary

pub mod config;
pub mod converter;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod model;
pub mod scene;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{ExportOptions, ImportOptions, Settings};
    pub use crate::error::{Error, Result};
    pub use crate::model::{Animation, Bone, BoneId, Mesh, Pose, Skeleton, Submesh, Vertex};

    pub use crate::formats::{
        ChunkFamily, MeshEncodeOptions, SkeletonEncodeOptions, SkeletonVersion, read_mesh, read_skeleton,
    };
    pub use crate::geometry::UpAxis;

    // Scene pipeline
    pub use crate::converter::{
        ConvertPhase, ConvertProgress, ModelDocument, export_scene, import_mesh, read_document,
    };
    pub use crate::scene::{MemoryScene, SceneAdapter};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
