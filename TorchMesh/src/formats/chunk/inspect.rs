//! Chunk tree dump for diagnostics

use serde::Serialize;

use super::ids::{ChunkFamily, HEADER, chunk_name, has_children};
use super::reader::{ChunkHeader, ChunkReader};
use crate::error::Result;
use crate::formats::mesh::MeshVersion;

/// One node of a chunk tree.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkNode {
    pub id: u16,
    pub name: &'static str,
    pub offset: u64,
    pub length: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChunkNode>,
}

impl ChunkNode {
    /// Render the tree as indented text, one chunk per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&format!(
            "{:indent$}0x{:04X} {} @{} ({} bytes)\n",
            "",
            self.id,
            self.name,
            self.offset,
            self.length,
            indent = depth * 2
        ));
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Walk every top-level chunk in `data`.
///
/// Payload fields before the first child are skipped using the known payload
/// shape for each container id.
///
/// # Errors
/// Propagates header and bounds errors from the reader.
pub fn chunk_tree(data: &[u8], family: ChunkFamily) -> Result<Vec<ChunkNode>> {
    let mut reader = ChunkReader::new(data);
    let mut walker = Walker { family, pose_normals_flag: false };
    let mut nodes = Vec::new();
    while !reader.is_at_end() {
        let header = reader.read_chunk_header()?;
        if header.id == HEADER {
            reader.enter(&header);
            let version = reader.read_string()?;
            reader.leave(&header)?;
            walker.pose_normals_flag = MeshVersion::from_header(&version)
                .is_some_and(|v| v.features().pose_normals);
            nodes.push(walker.leaf(&header));
            continue;
        }
        nodes.push(walker.walk(&mut reader, &header)?);
    }
    Ok(nodes)
}

struct Walker {
    family: ChunkFamily,
    /// Whether POSE chunks carry the v1.41 includes-normals byte.
    pose_normals_flag: bool,
}

impl Walker {
    fn leaf(&self, header: &ChunkHeader) -> ChunkNode {
        ChunkNode {
            id: header.id,
            name: chunk_name(self.family, header.id),
            offset: header.offset,
            length: header.length,
            children: Vec::new(),
        }
    }

    fn walk(&self, reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<ChunkNode> {
        let mut node = self.leaf(header);
        if !has_children(self.family, header.id) {
            reader.skip_chunk(header)?;
            return Ok(node);
        }

        reader.enter(header);
        self.skip_fixed_payload(reader, header.id)?;
        while reader.has_more_in(header) {
            let child = reader.read_chunk_header()?;
            node.children.push(self.walk(reader, &child)?);
        }
        reader.leave(header)?;
        Ok(node)
    }

    /// Skip the non-chunk fields a container carries before its children.
    fn skip_fixed_payload(&self, reader: &mut ChunkReader<'_>, id: u16) -> Result<()> {
        use super::ids::{mesh, skeleton};

        match (self.family, id) {
            (ChunkFamily::Mesh, mesh::MESH) => reader.skip(1),
            (ChunkFamily::Mesh, mesh::SUBMESH) => {
                reader.read_string()?;
                reader.read_bool()?;
                let count = reader.read_u32()?;
                let wide = reader.read_bool()?;
                reader.skip(u64::from(count) * if wide { 4 } else { 2 })
            }
            (ChunkFamily::Mesh, mesh::GEOMETRY) => reader.skip(4),
            (ChunkFamily::Mesh, mesh::GEOMETRY_VERTEX_BUFFER) => reader.skip(4),
            (ChunkFamily::Mesh, mesh::EDGE_LIST_LOD) => {
                reader.skip(2)?;
                if reader.read_bool()? {
                    return Ok(());
                }
                reader.read_bool()?;
                let triangles = reader.read_u32()?;
                reader.skip(4)?;
                reader.skip(u64::from(triangles) * (4 * 8 + 4 * 4))
            }
            (ChunkFamily::Mesh, mesh::POSE) => {
                reader.read_string()?;
                reader.skip(if self.pose_normals_flag { 3 } else { 2 })
            }
            (ChunkFamily::Mesh, mesh::ANIMATION) | (ChunkFamily::Skeleton, skeleton::ANIMATION) => {
                reader.read_string()?;
                reader.skip(4)
            }
            (ChunkFamily::Mesh, mesh::ANIMATION_TRACK) => reader.skip(4),
            (ChunkFamily::Mesh, mesh::ANIMATION_POSE_KEYFRAME) => reader.skip(4),
            (ChunkFamily::Skeleton, skeleton::ANIMATION_TRACK) => reader.skip(2),
            _ => Ok(()),
        }
    }
}
