//! Skin weights stored as per-vertex bone assignment chunks

use super::super::chunk::ids::mesh as chunk_ids;
use super::super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use crate::error::{Error, Result};
use crate::model::{BoneWeight, MAX_BONE_INFLUENCES, Vertex, normalize_weights};

/// One `(vertex, bone, weight)` record as read from a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneAssignment {
    pub vertex: u32,
    pub bone: u16,
    pub weight: f32,
    /// Chunk id and offset, for error reports.
    pub chunk_id: u16,
    pub offset: u64,
}

/// Read a bone assignment chunk whose header was just read.
///
/// # Errors
/// Chunk errors only.
pub fn read_assignment(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<BoneAssignment> {
    reader.enter(header);
    let vertex = reader.read_u32()?;
    let bone = reader.read_u16()?;
    let weight = reader.read_f32()?;
    reader.leave(header)?;
    Ok(BoneAssignment { vertex, bone, weight, chunk_id: header.id, offset: header.offset })
}

/// Merge assignments onto their vertices and normalize every vertex's list.
///
/// # Errors
/// [`Error::MalformedChunk`] for an assignment past the vertex list.
pub fn apply_assignments(vertices: &mut [Vertex], assignments: &[BoneAssignment], label: &str) -> Result<()> {
    for a in assignments {
        let Some(vertex) = vertices.get_mut(a.vertex as usize) else {
            return Err(Error::MalformedChunk {
                chunk_id: a.chunk_id,
                offset: a.offset,
                reason: format!("assignment for vertex {} but {label} has {} vertices", a.vertex, vertices.len()),
            });
        };
        vertex.weights.push(BoneWeight::new(a.bone, a.weight));
    }
    normalize_vertex_weights(vertices, label);
    Ok(())
}

/// Normalize every vertex's weights, warning once if any were truncated.
///
/// Returns how many vertices lost influences.
pub fn normalize_vertex_weights(vertices: &mut [Vertex], label: &str) -> usize {
    let truncated = vertices
        .iter_mut()
        .filter(|v| !v.weights.is_empty())
        .map(|v| normalize_weights(&mut v.weights))
        .filter(|&t| t)
        .count();
    if truncated > 0 {
        tracing::warn!(
            "{label}: {truncated} vertices had more than {MAX_BONE_INFLUENCES} bone influences; kept the strongest"
        );
    }
    truncated
}

/// Write one `SUBMESH_BONE_ASSIGNMENT` chunk per weight.
///
/// # Errors
/// Only writer nesting errors.
pub fn write_assignments(writer: &mut ChunkWriter, vertices: &[Vertex]) -> Result<()> {
    for (index, vertex) in vertices.iter().enumerate() {
        for weight in &vertex.weights {
            writer.chunk(chunk_ids::SUBMESH_BONE_ASSIGNMENT, |w| {
                w.write_u32(index as u32);
                w.write_u16(weight.bone);
                w.write_f32(weight.weight);
                Ok(())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn assignment(vertex: u32, bone: u16, weight: f32) -> BoneAssignment {
        BoneAssignment { vertex, bone, weight, chunk_id: chunk_ids::SUBMESH_BONE_ASSIGNMENT, offset: 0 }
    }

    #[test]
    fn test_six_influences_become_four() {
        let mut vertices = vec![Vertex::new(Vec3::ZERO, Vec3::Y)];
        let assignments: Vec<_> = [0.05, 0.3, 0.1, 0.25, 0.2, 0.1]
            .iter()
            .enumerate()
            .map(|(bone, &w)| assignment(0, bone as u16, w))
            .collect();
        apply_assignments(&mut vertices, &assignments, "submesh 0").unwrap();

        let weights = &vertices[0].weights;
        assert_eq!(weights.len(), 4);
        assert_eq!(weights.iter().map(|w| w.bone).collect::<Vec<_>>(), vec![1, 3, 4, 2]);
        let total: f32 = weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_vertex() {
        let mut vertices = vec![Vertex::new(Vec3::ZERO, Vec3::Y)];
        let err = apply_assignments(&mut vertices, &[assignment(3, 0, 1.0)], "submesh 0").unwrap_err();
        assert!(matches!(err, Error::MalformedChunk { chunk_id: chunk_ids::SUBMESH_BONE_ASSIGNMENT, .. }));
    }
}
