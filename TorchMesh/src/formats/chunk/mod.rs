//! Chunked binary container shared by mesh and skeleton files
//!
//! Every record is a `u16` id followed by a `u32` payload length (header
//! excluded), little-endian. Chunks nest; readers skip unknown ids using only
//! the length field.

pub mod ids;
pub mod inspect;
mod reader;
mod writer;

pub use ids::{CHUNK_HEADER_SIZE, ChunkFamily, chunk_name};
pub use inspect::{ChunkNode, chunk_tree};
pub use reader::{ChunkHeader, ChunkReader};
pub use writer::ChunkWriter;
