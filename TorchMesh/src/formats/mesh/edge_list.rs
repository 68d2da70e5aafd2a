//! `EDGE_LISTS` chunk codec

use glam::Vec4;

use super::super::chunk::ids::mesh as chunk_ids;
use super::super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use crate::error::Result;
use crate::model::{Edge, EdgeGroup, EdgeList, EdgeTriangle};

/// Decode the `EDGE_LISTS` chunk whose header was just read.
///
/// Only LOD 0 is kept; other levels and manual LODs are skipped.
///
/// # Errors
/// Chunk errors only.
pub fn read_edge_lists(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<Option<EdgeList>> {
    reader.enter(header);
    let mut result = None;
    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        if child.id != chunk_ids::EDGE_LIST_LOD {
            reader.skip_chunk(&child)?;
            continue;
        }
        reader.enter(&child);
        let lod = reader.read_u16()?;
        let manual = reader.read_bool()?;
        if manual || lod != 0 {
            tracing::debug!("Skipping edge list for LOD {lod}");
            reader.skip(child.end() - reader.position())?;
            reader.leave(&child)?;
            continue;
        }
        result = Some(read_lod(reader, &child)?);
        reader.leave(&child)?;
    }
    reader.leave(header)?;
    Ok(result)
}

fn read_lod(reader: &mut ChunkReader<'_>, lod: &ChunkHeader) -> Result<EdgeList> {
    let closed = reader.read_bool()?;
    let triangle_count = reader.read_u32()?;
    let group_count = reader.read_u32()?;

    let mut list = EdgeList { closed, triangles: Vec::new(), groups: Vec::new() };
    for _ in 0..triangle_count {
        let index_set = reader.read_u32()?;
        let vertex_set = reader.read_u32()?;
        let vertices = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
        let shared_vertices = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
        let normal = Vec4::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?, reader.read_f32()?);
        list.triangles.push(EdgeTriangle { index_set, vertex_set, vertices, shared_vertices, normal });
    }

    while reader.has_more_in(lod) {
        let child = reader.read_chunk_header()?;
        if child.id != chunk_ids::EDGE_GROUP {
            reader.skip_chunk(&child)?;
            continue;
        }
        reader.enter(&child);
        let vertex_set = reader.read_u32()?;
        let triangle_start = reader.read_u32()?;
        let triangle_count = reader.read_u32()?;
        let edge_count = reader.read_u32()?;
        let mut edges = Vec::new();
        for _ in 0..edge_count {
            let triangles = [reader.read_u32()?, reader.read_u32()?];
            let vertices = [reader.read_u32()?, reader.read_u32()?];
            let shared_vertices = [reader.read_u32()?, reader.read_u32()?];
            let degenerate = reader.read_bool()?;
            edges.push(Edge { triangles, vertices, shared_vertices, degenerate });
        }
        reader.leave(&child)?;
        list.groups.push(EdgeGroup { vertex_set, triangle_start, triangle_count, edges });
    }

    if list.groups.len() != group_count as usize {
        tracing::warn!("Edge list declares {group_count} groups but holds {}", list.groups.len());
    }
    Ok(list)
}

/// Write `list` as the LOD 0 entry of an `EDGE_LISTS` chunk.
///
/// # Errors
/// Only writer nesting errors.
pub fn write_edge_lists(writer: &mut ChunkWriter, list: &EdgeList) -> Result<()> {
    writer.chunk(chunk_ids::EDGE_LISTS, |w| {
        w.chunk(chunk_ids::EDGE_LIST_LOD, |w| {
            w.write_u16(0);
            w.write_bool(false);
            w.write_bool(list.closed);
            w.write_u32(list.triangles.len() as u32);
            w.write_u32(list.groups.len() as u32);
            for tri in &list.triangles {
                w.write_u32(tri.index_set);
                w.write_u32(tri.vertex_set);
                for v in tri.vertices.iter().chain(&tri.shared_vertices) {
                    w.write_u32(*v);
                }
                for f in tri.normal.to_array() {
                    w.write_f32(f);
                }
            }
            for group in &list.groups {
                w.chunk(chunk_ids::EDGE_GROUP, |w| {
                    w.write_u32(group.vertex_set);
                    w.write_u32(group.triangle_start);
                    w.write_u32(group.triangle_count);
                    w.write_u32(group.edges.len() as u32);
                    for edge in &group.edges {
                        for v in edge.triangles.iter().chain(&edge.vertices).chain(&edge.shared_vertices) {
                            w.write_u32(*v);
                        }
                        w.write_bool(edge.degenerate);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        })
    })
}
