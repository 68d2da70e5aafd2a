//! Interleaved vertex buffer packing, driven by a vertex declaration

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use glam::{Vec2, Vec3, Vec4};

use super::declaration::{ElementType, Semantic, VertexDeclaration, VertexElement};
use crate::error::{Error, Result};
use crate::formats::chunk::ids::mesh as chunk_ids;
use crate::model::Vertex;

/// Raw bytes of one bound vertex buffer.
#[derive(Debug, Clone, Copy)]
pub struct BufferData<'a> {
    pub vertex_size: usize,
    pub bytes: &'a [u8],
    /// Offset of the data chunk, for error reports.
    pub offset: u64,
}

fn malformed(offset: u64, reason: String) -> Error {
    Error::MalformedChunk { chunk_id: chunk_ids::GEOMETRY_VERTEX_BUFFER_DATA, offset, reason }
}

/// Decode `count` vertices from the bound buffers.
///
/// Elements are read strictly at their declared offsets. Specular and blend
/// elements are ignored; skin weights come from bone assignments.
///
/// # Errors
/// [`Error::MalformedChunk`] when a source has no buffer, an element does
/// not fit in the vertex size, or a buffer is too short for `count`.
pub fn decode_vertices(
    decl: &VertexDeclaration,
    buffers: &HashMap<u16, BufferData<'_>>,
    count: usize,
    geometry_offset: u64,
) -> Result<Vec<Vertex>> {
    for source in decl.sources() {
        let Some(buffer) = buffers.get(&source) else {
            return Err(Error::MalformedChunk {
                chunk_id: chunk_ids::GEOMETRY,
                offset: geometry_offset,
                reason: format!("declaration uses source {source} but no buffer is bound to it"),
            });
        };
        if let Some(element) = decl
            .elements_for(source)
            .find(|e| usize::from(e.offset) + e.element_type.size() > buffer.vertex_size)
        {
            return Err(malformed(
                buffer.offset,
                format!(
                    "{:?} element at offset {} does not fit in vertex size {}",
                    element.semantic, element.offset, buffer.vertex_size
                ),
            ));
        }
        if buffer.bytes.len() != buffer.vertex_size * count {
            return Err(malformed(
                buffer.offset,
                format!(
                    "buffer holds {} bytes, expected {} vertices of {} bytes",
                    buffer.bytes.len(),
                    count,
                    buffer.vertex_size
                ),
            ));
        }
    }

    let mut vertices = Vec::with_capacity(count);
    for index in 0..count {
        let mut vertex = Vertex::new(Vec3::ZERO, Vec3::ZERO);
        for element in &decl.elements {
            let buffer = &buffers[&element.source];
            let start = index * buffer.vertex_size + usize::from(element.offset);
            let bytes = &buffer.bytes[start..start + element.element_type.size()];
            apply_element(&mut vertex, element, bytes);
        }
        vertices.push(vertex);
    }
    Ok(vertices)
}

fn read_floats(bytes: &[u8], n: usize) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (i, v) in out.iter_mut().enumerate().take(n) {
        *v = LittleEndian::read_f32(&bytes[i * 4..]);
    }
    out
}

fn apply_element(vertex: &mut Vertex, element: &VertexElement, bytes: &[u8]) {
    let ty = element.element_type;
    let floats = ty.float_count().map(|n| read_floats(bytes, n));

    match (element.semantic, floats) {
        (Semantic::Position, Some(f)) => vertex.position = Vec3::new(f[0], f[1], f[2]),
        (Semantic::Normal, Some(f)) => vertex.normal = Vec3::new(f[0], f[1], f[2]),
        (Semantic::Binormal, Some(f)) => vertex.binormal = Some(Vec3::new(f[0], f[1], f[2])),
        (Semantic::Tangent, Some(f)) => {
            let w = if ty == ElementType::Float4 { f[3] } else { 1.0 };
            vertex.tangent = Some(Vec4::new(f[0], f[1], f[2], w));
        }
        (Semantic::TexCoords, Some(f)) => {
            let set = usize::from(element.index);
            if vertex.uvs.len() <= set {
                vertex.uvs.resize(set + 1, Vec2::ZERO);
            }
            vertex.uvs[set] = Vec2::new(f[0], f[1]);
        }
        (Semantic::Diffuse, Some(f)) => {
            let alpha = if ty == ElementType::Float4 { f[3] } else { 1.0 };
            vertex.colour = Some(Vec4::new(f[0], f[1], f[2], alpha));
        }
        (Semantic::Diffuse, None) => vertex.colour = Some(unpack_colour(ty, bytes)),
        (Semantic::Specular | Semantic::BlendWeights | Semantic::BlendIndices, _) => {}
        (semantic, None) => {
            tracing::debug!("Ignoring packed {ty:?} element for {semantic:?}");
        }
    }
}

fn unpack_colour(ty: ElementType, bytes: &[u8]) -> Vec4 {
    let v = LittleEndian::read_u32(bytes);
    let byte = |shift: u32| ((v >> shift) & 0xFF) as f32 / 255.0;
    match ty {
        ElementType::ColourAbgr => Vec4::new(byte(0), byte(8), byte(16), byte(24)),
        ElementType::UByte4 => Vec4::new(
            f32::from(bytes[0]) / 255.0,
            f32::from(bytes[1]) / 255.0,
            f32::from(bytes[2]) / 255.0,
            f32::from(bytes[3]) / 255.0,
        ),
        _ => Vec4::new(byte(16), byte(8), byte(0), byte(24)),
    }
}

/// Pack RGBA in 0..=1 as an ARGB `u32`.
#[must_use]
pub fn pack_argb(colour: Vec4) -> u32 {
    let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (q(colour.w) << 24) | (q(colour.x) << 16) | (q(colour.y) << 8) | q(colour.z)
}

/// Pack vertices into one interleaved buffer for source 0 of `decl`.
///
/// Missing optional attributes are written as zero (white for colour).
#[must_use]
pub fn encode_vertices(decl: &VertexDeclaration, vertices: &[Vertex]) -> Vec<u8> {
    let size = decl.vertex_size(0);
    let mut data = vec![0u8; size * vertices.len()];

    for (index, vertex) in vertices.iter().enumerate() {
        let base = index * size;
        for element in decl.elements_for(0) {
            let out = &mut data[base + usize::from(element.offset)..];
            match element.semantic {
                Semantic::Position => write_floats(out, &vertex.position.to_array()),
                Semantic::Normal => write_floats(out, &vertex.normal.to_array()),
                Semantic::Binormal => write_floats(out, &vertex.binormal.unwrap_or(Vec3::ZERO).to_array()),
                Semantic::Tangent => {
                    let t = vertex.tangent.unwrap_or(Vec4::new(0.0, 0.0, 0.0, 1.0));
                    let n = element.element_type.float_count().unwrap_or(3);
                    write_floats(out, &t.to_array()[..n]);
                }
                Semantic::TexCoords => {
                    let uv = vertex.uvs.get(usize::from(element.index)).copied().unwrap_or(Vec2::ZERO);
                    write_floats(out, &uv.to_array());
                }
                Semantic::Diffuse => {
                    LittleEndian::write_u32(out, pack_argb(vertex.colour.unwrap_or(Vec4::ONE)));
                }
                Semantic::Specular | Semantic::BlendWeights | Semantic::BlendIndices => {}
            }
        }
    }
    data
}

fn write_floats(out: &mut [u8], values: &[f32]) {
    for (i, v) in values.iter().enumerate() {
        LittleEndian::write_f32(&mut out[i * 4..], *v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::mesh::MeshEncodeOptions;

    fn vertex() -> Vertex {
        let mut v = Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y)
            .with_uv(Vec2::new(0.25, 0.75))
            .with_colour(Vec4::new(1.0, 0.0, 0.0, 0.5));
        v.tangent = Some(Vec4::new(1.0, 0.0, 0.0, -1.0));
        v.binormal = Some(Vec3::Z);
        v
    }

    fn decode_one(decl: &VertexDeclaration, bytes: &[u8]) -> Result<Vec<Vertex>> {
        let mut buffers = HashMap::new();
        buffers.insert(0, BufferData { vertex_size: decl.vertex_size(0), bytes, offset: 0 });
        decode_vertices(decl, &buffers, 1, 0)
    }

    #[test]
    fn test_full_layout_roundtrip() {
        let options = MeshEncodeOptions {
            colours: true,
            binormals: true,
            tangents: true,
            tangent_parity: true,
            ..MeshEncodeOptions::default()
        };
        let decl = VertexDeclaration::for_encode(&options, 1);
        let bytes = encode_vertices(&decl, &[vertex()]);
        let back = &decode_one(&decl, &bytes).unwrap()[0];

        let original = vertex();
        assert_eq!(back.position, original.position);
        assert_eq!(back.uvs, original.uvs);
        assert_eq!(back.tangent, original.tangent);
        assert_eq!(back.binormal, original.binormal);
        let colour = back.colour.unwrap();
        assert!((colour - original.colour.unwrap()).abs().max_element() <= 1.0 / 255.0);
    }

    #[test]
    fn test_float3_tangent_reads_positive_parity() {
        let options = MeshEncodeOptions { tangents: true, ..MeshEncodeOptions::default() };
        let decl = VertexDeclaration::for_encode(&options, 0);
        let bytes = encode_vertices(&decl, &[vertex()]);
        let back = &decode_one(&decl, &bytes).unwrap()[0];
        assert_eq!(back.tangent, Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        let decl = VertexDeclaration::for_encode(&MeshEncodeOptions::default(), 0);
        let bytes = vec![0u8; 10];
        let err = decode_one(&decl, &bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedChunk { chunk_id: chunk_ids::GEOMETRY_VERTEX_BUFFER_DATA, .. }));
    }

    #[test]
    fn test_colour_orders() {
        let argb = 0x80FF_0000u32.to_le_bytes();
        assert_eq!(unpack_colour(ElementType::ColourArgb, &argb).x, 1.0);
        let abgr = 0x8000_00FFu32.to_le_bytes();
        assert_eq!(unpack_colour(ElementType::ColourAbgr, &abgr).x, 1.0);
        assert_eq!(pack_argb(Vec4::new(1.0, 0.0, 0.0, 1.0)), 0xFFFF_0000);
    }
}
