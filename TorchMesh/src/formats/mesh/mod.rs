//! Mesh codec for `.mesh` files
//!
//! Layout of a mesh file:
//!
//! ```text
//! HEADER "[MeshSerializer_v1.41]"
//! MESH { bool skeletally_animated }
//!   SUBMESH { material, bool shared, u32 count, bool idx32, indices }
//!     GEOMETRY { u32 vertex_count }
//!       GEOMETRY_VERTEX_DECLARATION → GEOMETRY_VERTEX_ELEMENT*
//!       GEOMETRY_VERTEX_BUFFER { u16 bind, u16 size } → GEOMETRY_VERTEX_BUFFER_DATA
//!     SUBMESH_OPERATION, SUBMESH_BONE_ASSIGNMENT*
//!   MESH_SKELETON_LINK, MESH_BOUNDS, SUBMESH_NAME_TABLE,
//!   EDGE_LISTS, POSES, ANIMATIONS
//! ```

mod bone_assignment;
mod declaration;
mod edge_list;
mod poses;
mod vertex_buffer;

use std::collections::HashMap;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::animation::{decode_morph_animations, encode_morph_animations};
use super::chunk::ids::mesh as chunk_ids;
use super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use super::{read_version_header, write_version_header};
use crate::error::{Error, Result};
use crate::geometry::{self, tangents};
use crate::model::{EdgeList, Mesh, Pose, Submesh, Vertex};

pub use bone_assignment::{BoneAssignment, normalize_vertex_weights};
pub use declaration::{ElementType, Semantic, VertexDeclaration, VertexElement};
pub use vertex_buffer::pack_argb;

use bone_assignment::{apply_assignments, read_assignment, write_assignments};
use edge_list::{read_edge_lists, write_edge_lists};
use poses::{RawPose, read_poses, write_poses};
use vertex_buffer::{BufferData, decode_vertices, encode_vertices};

/// Mesh serializer versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeshVersion {
    V1_40,
    /// Written by the encoder.
    #[default]
    V1_41,
}

/// What a mesh version's chunks contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshFeatures {
    /// `POSE` chunks carry an includes-normals flag and optional normals.
    pub pose_normals: bool,
}

impl MeshVersion {
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        match header {
            "[MeshSerializer_v1.40]" => Some(Self::V1_40),
            "[MeshSerializer_v1.41]" => Some(Self::V1_41),
            _ => None,
        }
    }

    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::V1_40 => "[MeshSerializer_v1.40]",
            Self::V1_41 => "[MeshSerializer_v1.41]",
        }
    }

    #[must_use]
    pub fn features(self) -> MeshFeatures {
        match self {
            Self::V1_40 => MeshFeatures { pose_normals: false },
            Self::V1_41 => MeshFeatures { pose_normals: true },
        }
    }
}

/// Options for [`encode_mesh`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshEncodeOptions {
    /// Build and write stencil shadow edge lists.
    pub edge_lists: bool,
    /// Write per-vertex tangents, deriving them when absent.
    pub tangents: bool,
    /// Write tangents as float4 with handedness in w.
    pub tangent_parity: bool,
    /// Write per-vertex binormals, deriving them when absent.
    pub binormals: bool,
    /// Write per-vertex diffuse colour.
    pub colours: bool,
    /// Merge submeshes sharing a material.
    pub group_by_material: bool,
}

// ==================== Decoding ====================

/// Read and decode a `.mesh` file.
///
/// # Errors
/// IO errors, or any decode error wrapped with the file path.
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::from(e).in_file(path))?;
    decode_mesh_bytes(&data).map_err(|e| e.in_file(path))
}

/// Decode a mesh from an in-memory buffer.
///
/// # Errors
/// See [`decode_mesh`].
pub fn decode_mesh_bytes(data: &[u8]) -> Result<Mesh> {
    let mut reader = ChunkReader::new(data);
    decode_mesh(&mut reader)
}

/// A submesh as read, before shared geometry and assignments are resolved.
struct RawSubmesh {
    material: String,
    use_shared: bool,
    operation: u16,
    indices: Vec<u32>,
    vertices: Option<Vec<Vertex>>,
    assignments: Vec<BoneAssignment>,
    offset: u64,
}

/// Everything found under `MESH`.
#[derive(Default)]
struct RawMesh {
    submeshes: Vec<RawSubmesh>,
    shared_vertices: Option<Vec<Vertex>>,
    shared_assignments: Vec<BoneAssignment>,
    names: Vec<(u16, String)>,
    poses: Vec<RawPose>,
    mesh: Mesh,
}

/// Decode a mesh.
///
/// # Errors
/// [`Error::UnsupportedVersion`], [`Error::TruncatedInput`],
/// [`Error::MalformedChunk`], [`Error::InvalidIndex`] and
/// [`Error::InvalidMesh`].
pub fn decode_mesh(reader: &mut ChunkReader<'_>) -> Result<Mesh> {
    let header = read_version_header(reader)?;
    let version =
        MeshVersion::from_header(&header).ok_or_else(|| Error::UnsupportedVersion { found: header.clone() })?;
    let features = version.features();

    let mut raw = None;
    while !reader.is_at_end() {
        let chunk = reader.read_chunk_header()?;
        if chunk.id == chunk_ids::MESH && raw.is_none() {
            raw = Some(read_mesh_chunk(reader, &chunk, features)?);
        } else {
            reader.skip_chunk(&chunk)?;
        }
    }
    let raw = raw.ok_or_else(|| Error::InvalidMesh("file has no MESH chunk".to_string()))?;
    let mesh = resolve(raw)?;

    tracing::debug!(
        "Decoded mesh {version:?}: {} submeshes, {} vertices, {} triangles",
        mesh.submeshes.len(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn read_mesh_chunk(reader: &mut ChunkReader<'_>, header: &ChunkHeader, features: MeshFeatures) -> Result<RawMesh> {
    reader.enter(header);
    let skeletally_animated = reader.read_bool()?;
    let mut raw = RawMesh::default();

    while reader.has_more_in(header) {
        let chunk = reader.read_chunk_header()?;
        match chunk.id {
            chunk_ids::SUBMESH => raw.submeshes.push(read_submesh(reader, &chunk)?),
            chunk_ids::GEOMETRY => raw.shared_vertices = Some(read_geometry(reader, &chunk)?),
            chunk_ids::MESH_BONE_ASSIGNMENT => raw.shared_assignments.push(read_assignment(reader, &chunk)?),
            chunk_ids::MESH_SKELETON_LINK => {
                reader.enter(&chunk);
                raw.mesh.skeleton_link = Some(reader.read_string()?);
                reader.leave(&chunk)?;
            }
            chunk_ids::MESH_BOUNDS => read_bounds(reader, &chunk)?,
            chunk_ids::SUBMESH_NAME_TABLE => raw.names = read_name_table(reader, &chunk)?,
            chunk_ids::EDGE_LISTS => raw.mesh.edge_list = read_edge_lists(reader, &chunk)?,
            chunk_ids::POSES => raw.poses = read_poses(reader, &chunk, features)?,
            chunk_ids::ANIMATIONS => {
                let poses: Vec<Pose> = raw.poses.iter().map(|p| p.pose.clone()).collect();
                raw.mesh.animations = decode_morph_animations(reader, &chunk, &poses)?;
            }
            _ => reader.skip_chunk(&chunk)?,
        }
    }
    reader.leave(header)?;

    if skeletally_animated && raw.mesh.skeleton_link.is_none() {
        tracing::warn!("Mesh is flagged as skeletally animated but names no skeleton");
    }
    Ok(raw)
}

fn read_submesh(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<RawSubmesh> {
    reader.enter(header);
    let material = reader.read_string()?;
    let use_shared = reader.read_bool()?;
    let index_count = reader.read_u32()? as usize;
    let wide = reader.read_bool()?;

    let width = if wide { 4 } else { 2 };
    let bytes = reader.read_bytes(index_count * width)?;
    let indices: Vec<u32> = if wide {
        bytes.chunks_exact(4).map(LittleEndian::read_u32).collect()
    } else {
        bytes.chunks_exact(2).map(|b| u32::from(LittleEndian::read_u16(b))).collect()
    };

    let mut submesh = RawSubmesh {
        material,
        use_shared,
        operation: OPERATION_TRIANGLE_LIST,
        indices,
        vertices: None,
        assignments: Vec::new(),
        offset: header.offset,
    };

    while reader.has_more_in(header) {
        let chunk = reader.read_chunk_header()?;
        match chunk.id {
            chunk_ids::SUBMESH_OPERATION => {
                reader.enter(&chunk);
                submesh.operation = reader.read_u16()?;
                reader.leave(&chunk)?;
            }
            chunk_ids::GEOMETRY => submesh.vertices = Some(read_geometry(reader, &chunk)?),
            chunk_ids::SUBMESH_BONE_ASSIGNMENT => submesh.assignments.push(read_assignment(reader, &chunk)?),
            _ => reader.skip_chunk(&chunk)?,
        }
    }
    reader.leave(header)?;
    Ok(submesh)
}

fn read_geometry(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<Vec<Vertex>> {
    reader.enter(header);
    let vertex_count = reader.read_u32()? as usize;
    let mut declaration: Option<VertexDeclaration> = None;
    let mut buffers: HashMap<u16, BufferData<'_>> = HashMap::new();

    while reader.has_more_in(header) {
        let chunk = reader.read_chunk_header()?;
        match chunk.id {
            chunk_ids::GEOMETRY_VERTEX_DECLARATION => {
                declaration = Some(VertexDeclaration::read(reader, &chunk)?);
            }
            chunk_ids::GEOMETRY_VERTEX_BUFFER => {
                let Some(decl) = &declaration else {
                    return Err(reader.malformed("vertex buffer precedes the vertex declaration"));
                };
                reader.enter(&chunk);
                let bind = reader.read_u16()?;
                let vertex_size = usize::from(reader.read_u16()?);
                if vertex_size < decl.vertex_size(bind) {
                    return Err(reader.malformed(format!(
                        "vertex size {vertex_size} is smaller than the declared layout ({} bytes)",
                        decl.vertex_size(bind)
                    )));
                }
                while reader.has_more_in(&chunk) {
                    let data = reader.read_chunk_header()?;
                    if data.id != chunk_ids::GEOMETRY_VERTEX_BUFFER_DATA {
                        reader.skip_chunk(&data)?;
                        continue;
                    }
                    reader.enter(&data);
                    let bytes = reader.read_bytes(data.length as usize)?;
                    reader.leave(&data)?;
                    buffers.insert(bind, BufferData { vertex_size, bytes, offset: data.offset });
                }
                reader.leave(&chunk)?;
            }
            _ => reader.skip_chunk(&chunk)?,
        }
    }
    reader.leave(header)?;

    let Some(declaration) = declaration else {
        return Err(Error::MalformedChunk {
            chunk_id: chunk_ids::GEOMETRY,
            offset: header.offset,
            reason: "geometry has no vertex declaration".to_string(),
        });
    };
    decode_vertices(&declaration, &buffers, vertex_count, header.offset)
}

/// Read and sanity-check `MESH_BOUNDS`. The values are discarded: the model
/// carries no bounds and [`encode_mesh`] recomputes them from the vertices.
fn read_bounds(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<()> {
    reader.enter(header);
    let min = reader.read_vec3()?;
    let max = reader.read_vec3()?;
    let radius = reader.read_f32()?;
    reader.leave(header)?;
    if !(min.is_finite() && max.is_finite() && radius.is_finite()) || min.cmpgt(max).any() || radius < 0.0 {
        tracing::warn!("Mesh bounds are inconsistent (min {min}, max {max}, radius {radius}); they will be recomputed");
    }
    Ok(())
}

fn read_name_table(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<Vec<(u16, String)>> {
    reader.enter(header);
    let mut names = Vec::new();
    while reader.has_more_in(header) {
        let chunk = reader.read_chunk_header()?;
        if chunk.id != chunk_ids::SUBMESH_NAME_TABLE_ELEMENT {
            reader.skip_chunk(&chunk)?;
            continue;
        }
        reader.enter(&chunk);
        let index = reader.read_u16()?;
        let name = reader.read_string()?;
        reader.leave(&chunk)?;
        names.push((index, name));
    }
    reader.leave(header)?;
    Ok(names)
}

const OPERATION_TRIANGLE_LIST: u16 = 4;
const OPERATION_TRIANGLE_STRIP: u16 = 5;
const OPERATION_TRIANGLE_FAN: u16 = 6;

/// Expand strips and fans into a triangle list.
fn to_triangle_list(operation: u16, indices: Vec<u32>, submesh: &RawSubmesh) -> Result<Vec<u32>> {
    match operation {
        OPERATION_TRIANGLE_LIST => Ok(indices),
        OPERATION_TRIANGLE_STRIP => {
            let mut list = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for (i, w) in indices.windows(3).enumerate() {
                let tri = if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[1], w[0], w[2]] };
                // Repeated indices are strip restarts.
                if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
                    list.extend(tri);
                }
            }
            Ok(list)
        }
        OPERATION_TRIANGLE_FAN => {
            let mut list = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for i in 1..indices.len().saturating_sub(1) {
                list.extend([indices[0], indices[i], indices[i + 1]]);
            }
            Ok(list)
        }
        other => Err(Error::MalformedChunk {
            chunk_id: chunk_ids::SUBMESH_OPERATION,
            offset: submesh.offset,
            reason: format!("unsupported render operation {other}; only triangles are handled"),
        }),
    }
}

/// Resolve shared geometry, operations, assignments, names and pose targets.
fn resolve(raw: RawMesh) -> Result<Mesh> {
    let RawMesh { submeshes: raw_submeshes, shared_vertices, shared_assignments, names, poses, mut mesh } = raw;

    for (position, raw_submesh) in raw_submeshes.iter().enumerate() {
        let label = format!("submesh {position} ('{}')", raw_submesh.material);
        let (mut vertices, assignments) = if raw_submesh.use_shared {
            let Some(shared) = &shared_vertices else {
                return Err(Error::MalformedChunk {
                    chunk_id: chunk_ids::SUBMESH,
                    offset: raw_submesh.offset,
                    reason: "submesh uses shared geometry but the mesh has none".to_string(),
                });
            };
            let mut all = shared_assignments.clone();
            all.extend(raw_submesh.assignments.iter().copied());
            (shared.clone(), all)
        } else {
            let Some(own) = &raw_submesh.vertices else {
                return Err(Error::MalformedChunk {
                    chunk_id: chunk_ids::SUBMESH,
                    offset: raw_submesh.offset,
                    reason: "submesh has neither its own nor shared geometry".to_string(),
                });
            };
            (own.clone(), raw_submesh.assignments.clone())
        };
        apply_assignments(&mut vertices, &assignments, &label)?;

        let indices = to_triangle_list(raw_submesh.operation, raw_submesh.indices.clone(), raw_submesh)?;
        let submesh = Submesh { name: None, material: raw_submesh.material.clone(), vertices, indices };
        submesh.validate(position)?;
        mesh.submeshes.push(submesh);
    }

    for (index, name) in names {
        match mesh.submeshes.get_mut(usize::from(index)) {
            Some(submesh) => submesh.name = Some(name),
            None => tracing::warn!("Submesh name '{name}' refers to missing submesh {index}"),
        }
    }

    let first_shared = raw_submeshes.iter().position(|s| s.use_shared);
    for raw_pose in poses {
        let submesh = match raw_pose.target {
            0 => first_shared.ok_or_else(|| {
                Error::InvalidMesh(format!("pose '{}' targets shared geometry that no submesh uses", raw_pose.pose.name))
            })?,
            target => usize::from(target) - 1,
        };
        mesh.poses.push(Pose { submesh, ..raw_pose.pose });
    }

    mesh.validate()?;
    Ok(mesh)
}

// ==================== Encoding ====================

/// Encode a mesh into a fresh buffer.
///
/// # Errors
/// See [`encode_mesh`].
pub fn encode_mesh_bytes(mesh: &Mesh, options: &MeshEncodeOptions) -> Result<Vec<u8>> {
    let mut writer = ChunkWriter::new();
    encode_mesh(&mut writer, mesh, options)?;
    writer.finish()
}

/// Encode a mesh as `[MeshSerializer_v1.41]`.
///
/// Every submesh gets its own geometry. Empty submeshes are skipped with a
/// warning; poses targeting them are dropped.
///
/// # Errors
/// [`Error::InvalidIndex`] / [`Error::InvalidMesh`] for structural problems,
/// [`Error::UnknownShape`] for morph tracks without a pose.
pub fn encode_mesh(writer: &mut ChunkWriter, mesh: &Mesh, options: &MeshEncodeOptions) -> Result<()> {
    mesh.validate()?;
    let version = MeshVersion::V1_41;
    let prepared = prepare(mesh, options);

    write_version_header(writer, version.header())?;
    writer.chunk(chunk_ids::MESH, |w| {
        w.write_bool(prepared.skeleton_link.is_some() || prepared.is_skinned());

        for submesh in &prepared.submeshes {
            write_submesh(w, submesh, options)?;
        }

        if let Some(link) = &prepared.skeleton_link {
            w.chunk(chunk_ids::MESH_SKELETON_LINK, |w| {
                w.write_string(link);
                Ok(())
            })?;
        }

        let bounds = prepared.bounds();
        w.chunk(chunk_ids::MESH_BOUNDS, |w| {
            let (min, max, radius) = bounds.map_or((glam::Vec3::ZERO, glam::Vec3::ZERO, 0.0), |b| (b.min, b.max, b.radius));
            w.write_vec3(min);
            w.write_vec3(max);
            w.write_f32(radius);
            Ok(())
        })?;

        if prepared.submeshes.iter().any(|s| s.name.is_some()) {
            w.chunk(chunk_ids::SUBMESH_NAME_TABLE, |w| {
                for (index, submesh) in prepared.submeshes.iter().enumerate() {
                    if let Some(name) = &submesh.name {
                        w.chunk(chunk_ids::SUBMESH_NAME_TABLE_ELEMENT, |w| {
                            w.write_u16(index as u16);
                            w.write_string(name);
                            Ok(())
                        })?;
                    }
                }
                Ok(())
            })?;
        }

        if let Some(list) = &prepared.edge_list {
            write_edge_lists(w, list)?;
        }
        write_poses(w, &prepared.poses, version.features())?;
        encode_morph_animations(w, &prepared)
    })?;

    tracing::debug!(
        "Encoded mesh: {} submeshes, {} vertices, {} triangles",
        prepared.submeshes.len(),
        prepared.vertex_count(),
        prepared.triangle_count()
    );
    Ok(())
}

/// Apply grouping, empty-submesh skipping, weight normalization and derived
/// tangent data, remapping poses to the final submesh list.
fn prepare(mesh: &Mesh, options: &MeshEncodeOptions) -> Mesh {
    let mut poses = mesh.poses.clone();
    let mut submeshes = mesh.submeshes.clone();

    if options.group_by_material {
        let (merged, remap) = geometry::merge_by_material(submeshes);
        for pose in &mut poses {
            let target = remap[pose.submesh];
            pose.submesh = target.submesh;
            for (index, _) in &mut pose.offsets {
                *index += target.vertex_offset;
            }
        }
        submeshes = merged;
    }

    let mut kept = Vec::with_capacity(submeshes.len());
    let mut new_index: Vec<Option<usize>> = Vec::with_capacity(submeshes.len());
    for (position, submesh) in submeshes.into_iter().enumerate() {
        if submesh.vertices.is_empty() || submesh.triangle_count() == 0 {
            tracing::warn!(
                "Skipping submesh {position} ('{}'): {} vertices, {} triangles",
                submesh.material,
                submesh.vertices.len(),
                submesh.triangle_count()
            );
            new_index.push(None);
            continue;
        }
        new_index.push(Some(kept.len()));
        kept.push(submesh);
    }
    poses.retain_mut(|pose| match new_index[pose.submesh] {
        Some(index) => {
            pose.submesh = index;
            true
        }
        None => {
            tracing::warn!("Dropping pose '{}': its submesh was skipped", pose.name);
            false
        }
    });

    for (position, submesh) in kept.iter_mut().enumerate() {
        normalize_vertex_weights(&mut submesh.vertices, &format!("submesh {position}"));
        if (options.tangents || options.binormals) && !tangents::is_complete(submesh, options.binormals) {
            tangents::generate(submesh, 0, options.binormals);
        }
    }

    let edge_list = options.edge_lists.then(|| EdgeList::build(&kept));
    Mesh {
        submeshes: kept,
        skeleton_link: mesh.skeleton_link.clone(),
        poses,
        animations: mesh.animations.clone(),
        edge_list,
    }
}

fn write_submesh(writer: &mut ChunkWriter, submesh: &Submesh, options: &MeshEncodeOptions) -> Result<()> {
    let uv_sets = submesh.vertices.iter().map(|v| v.uvs.len()).max().unwrap_or(0);
    let declaration = VertexDeclaration::for_encode(options, uv_sets);
    let vertex_size = declaration.vertex_size(0);
    let wide = submesh.indices.iter().any(|&i| i > u32::from(u16::MAX));

    writer.chunk(chunk_ids::SUBMESH, |w| {
        w.write_string(&submesh.material);
        w.write_bool(false);
        w.write_u32(submesh.indices.len() as u32);
        w.write_bool(wide);
        for &index in &submesh.indices {
            if wide {
                w.write_u32(index);
            } else {
                w.write_u16(index as u16);
            }
        }

        w.chunk(chunk_ids::GEOMETRY, |w| {
            w.write_u32(submesh.vertices.len() as u32);
            declaration.write(w)?;
            w.chunk(chunk_ids::GEOMETRY_VERTEX_BUFFER, |w| {
                w.write_u16(0);
                w.write_u16(vertex_size as u16);
                w.chunk(chunk_ids::GEOMETRY_VERTEX_BUFFER_DATA, |w| {
                    w.write_bytes(&encode_vertices(&declaration, &submesh.vertices));
                    Ok(())
                })
            })
        })?;

        w.chunk(chunk_ids::SUBMESH_OPERATION, |w| {
            w.write_u16(OPERATION_TRIANGLE_LIST);
            Ok(())
        })?;
        write_assignments(w, &submesh.vertices)
    })
}
