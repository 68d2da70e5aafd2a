//! Shape keys stored as `POSES` chunks

use glam::Vec3;

use super::super::chunk::ids::mesh as chunk_ids;
use super::super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use super::MeshFeatures;
use crate::error::{Error, Result};
use crate::model::Pose;

/// A pose as stored in the file: `target` is 0 for shared geometry, otherwise
/// submesh index + 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPose {
    pub pose: Pose,
    pub target: u16,
}

/// Decode the `POSES` chunk whose header was just read.
///
/// # Errors
/// Chunk errors only.
pub fn read_poses(reader: &mut ChunkReader<'_>, header: &ChunkHeader, features: MeshFeatures) -> Result<Vec<RawPose>> {
    reader.enter(header);
    let mut poses = Vec::new();
    while reader.has_more_in(header) {
        let child = reader.read_chunk_header()?;
        if child.id != chunk_ids::POSE {
            reader.skip_chunk(&child)?;
            continue;
        }
        reader.enter(&child);
        let name = reader.read_string()?;
        let target = reader.read_u16()?;
        let with_normals = features.pose_normals && reader.read_bool()?;

        let mut offsets = Vec::new();
        let mut normals = Vec::new();
        while reader.has_more_in(&child) {
            let vertex_chunk = reader.read_chunk_header()?;
            if vertex_chunk.id != chunk_ids::POSE_VERTEX {
                reader.skip_chunk(&vertex_chunk)?;
                continue;
            }
            reader.enter(&vertex_chunk);
            let index = reader.read_u32()?;
            let offset = reader.read_vec3()?;
            if with_normals {
                normals.push(reader.read_vec3()?);
            }
            reader.leave(&vertex_chunk)?;
            offsets.push((index, offset));
        }
        reader.leave(&child)?;

        poses.push(RawPose {
            pose: Pose { name, submesh: 0, offsets, normals: with_normals.then_some(normals) },
            target,
        });
    }
    reader.leave(header)?;
    Ok(poses)
}

/// Write `poses` as a `POSES` chunk. Nothing is written for an empty list.
///
/// # Errors
/// [`Error::InvalidMesh`] when a pose's normals do not line up with its
/// offsets or its target does not fit the file's `u16`.
pub fn write_poses(writer: &mut ChunkWriter, poses: &[Pose], features: MeshFeatures) -> Result<()> {
    if poses.is_empty() {
        return Ok(());
    }
    writer.chunk(chunk_ids::POSES, |w| {
        for pose in poses {
            let target = u16::try_from(pose.submesh + 1)
                .map_err(|_| Error::InvalidMesh(format!("pose '{}' targets submesh {}", pose.name, pose.submesh)))?;
            if let Some(normals) = &pose.normals
                && normals.len() != pose.offsets.len()
            {
                return Err(Error::InvalidMesh(format!(
                    "pose '{}' has {} offsets but {} normals",
                    pose.name,
                    pose.offsets.len(),
                    normals.len()
                )));
            }
            let normals = if features.pose_normals { pose.normals.as_deref() } else { None };

            w.chunk(chunk_ids::POSE, |w| {
                w.write_string(&pose.name);
                w.write_u16(target);
                if features.pose_normals {
                    w.write_bool(normals.is_some());
                }
                for (i, (index, offset)) in pose.offsets.iter().enumerate() {
                    w.chunk(chunk_ids::POSE_VERTEX, |w| {
                        w.write_u32(*index);
                        w.write_vec3(*offset);
                        if let Some(normals) = normals {
                            w.write_vec3(normals.get(i).copied().unwrap_or(Vec3::ZERO));
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}
