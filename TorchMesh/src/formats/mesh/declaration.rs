//! Vertex declarations: which attributes a vertex buffer holds and where

use super::super::chunk::ids::mesh as chunk_ids;
use super::super::chunk::{ChunkHeader, ChunkReader, ChunkWriter};
use super::MeshEncodeOptions;
use crate::error::Result;

/// Storage type of one vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float1,
    Float2,
    Float3,
    Float4,
    /// Packed 32-bit colour; Torchlight files use ARGB order.
    Colour,
    UByte4,
    ColourArgb,
    ColourAbgr,
}

impl ElementType {
    #[must_use]
    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0 => Self::Float1,
            1 => Self::Float2,
            2 => Self::Float3,
            3 => Self::Float4,
            4 => Self::Colour,
            9 => Self::UByte4,
            10 => Self::ColourArgb,
            11 => Self::ColourAbgr,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Float1 => 0,
            Self::Float2 => 1,
            Self::Float3 => 2,
            Self::Float4 => 3,
            Self::Colour => 4,
            Self::UByte4 => 9,
            Self::ColourArgb => 10,
            Self::ColourAbgr => 11,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Float1 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Colour | Self::UByte4 | Self::ColourArgb | Self::ColourAbgr => 4,
        }
    }

    /// Number of floats for float types, `None` for packed types.
    #[must_use]
    pub fn float_count(self) -> Option<usize> {
        match self {
            Self::Float1 => Some(1),
            Self::Float2 => Some(2),
            Self::Float3 => Some(3),
            Self::Float4 => Some(4),
            _ => None,
        }
    }
}

/// Meaning of one vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Position,
    BlendWeights,
    BlendIndices,
    Normal,
    Diffuse,
    Specular,
    TexCoords,
    Binormal,
    Tangent,
}

impl Semantic {
    #[must_use]
    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            1 => Self::Position,
            2 => Self::BlendWeights,
            3 => Self::BlendIndices,
            4 => Self::Normal,
            5 => Self::Diffuse,
            6 => Self::Specular,
            7 => Self::TexCoords,
            8 => Self::Binormal,
            9 => Self::Tangent,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Position => 1,
            Self::BlendWeights => 2,
            Self::BlendIndices => 3,
            Self::Normal => 4,
            Self::Diffuse => 5,
            Self::Specular => 6,
            Self::TexCoords => 7,
            Self::Binormal => 8,
            Self::Tangent => 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexElement {
    pub source: u16,
    pub element_type: ElementType,
    pub semantic: Semantic,
    /// Byte offset inside one vertex of the source buffer.
    pub offset: u16,
    /// Set index, for texture coordinates.
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexDeclaration {
    pub elements: Vec<VertexElement>,
}

impl VertexDeclaration {
    /// Read a `GEOMETRY_VERTEX_DECLARATION` chunk whose header was just read.
    ///
    /// # Errors
    /// Unknown element types or semantics are a malformed chunk.
    pub fn read(reader: &mut ChunkReader<'_>, header: &ChunkHeader) -> Result<Self> {
        reader.enter(header);
        let mut elements = Vec::new();
        while reader.has_more_in(header) {
            let child = reader.read_chunk_header()?;
            if child.id != chunk_ids::GEOMETRY_VERTEX_ELEMENT {
                reader.skip_chunk(&child)?;
                continue;
            }
            reader.enter(&child);
            let source = reader.read_u16()?;
            let raw_type = reader.read_u16()?;
            let raw_semantic = reader.read_u16()?;
            let offset = reader.read_u16()?;
            let index = reader.read_u16()?;

            let element_type = ElementType::from_u16(raw_type)
                .ok_or_else(|| reader.malformed(format!("unsupported vertex element type {raw_type}")))?;
            let semantic = Semantic::from_u16(raw_semantic)
                .ok_or_else(|| reader.malformed(format!("unknown vertex element semantic {raw_semantic}")))?;
            reader.leave(&child)?;

            elements.push(VertexElement { source, element_type, semantic, offset, index });
        }
        reader.leave(header)?;
        Ok(Self { elements })
    }

    /// Write the declaration chunk and its elements.
    ///
    /// # Errors
    /// Only writer nesting errors.
    pub fn write(&self, writer: &mut ChunkWriter) -> Result<()> {
        writer.chunk(chunk_ids::GEOMETRY_VERTEX_DECLARATION, |w| {
            for element in &self.elements {
                w.chunk(chunk_ids::GEOMETRY_VERTEX_ELEMENT, |w| {
                    w.write_u16(element.source);
                    w.write_u16(element.element_type.as_u16());
                    w.write_u16(element.semantic.as_u16());
                    w.write_u16(element.offset);
                    w.write_u16(element.index);
                    Ok(())
                })?;
            }
            Ok(())
        })
    }

    /// Elements bound to one buffer source.
    pub fn elements_for(&self, source: u16) -> impl Iterator<Item = &VertexElement> {
        self.elements.iter().filter(move |e| e.source == source)
    }

    /// Distinct buffer sources, in ascending order.
    #[must_use]
    pub fn sources(&self) -> Vec<u16> {
        let mut sources: Vec<u16> = self.elements.iter().map(|e| e.source).collect();
        sources.sort_unstable();
        sources.dedup();
        sources
    }

    /// Smallest vertex size that fits every element of `source`.
    #[must_use]
    pub fn vertex_size(&self, source: u16) -> usize {
        self.elements_for(source)
            .map(|e| usize::from(e.offset) + e.element_type.size())
            .max()
            .unwrap_or(0)
    }

    /// The single-source layout the encoder writes.
    ///
    /// Order: position, normal, diffuse, texcoords, binormal, tangent.
    #[must_use]
    pub fn for_encode(options: &MeshEncodeOptions, uv_sets: usize) -> Self {
        let mut decl = Self::default();
        let mut offset = 0u16;
        let mut push = |element_type: ElementType, semantic: Semantic, index: u16| {
            decl.elements.push(VertexElement { source: 0, element_type, semantic, offset, index });
            offset += element_type.size() as u16;
        };

        push(ElementType::Float3, Semantic::Position, 0);
        push(ElementType::Float3, Semantic::Normal, 0);
        if options.colours {
            push(ElementType::ColourArgb, Semantic::Diffuse, 0);
        }
        for set in 0..uv_sets {
            push(ElementType::Float2, Semantic::TexCoords, set as u16);
        }
        if options.binormals {
            push(ElementType::Float3, Semantic::Binormal, 0);
        }
        if options.tangents {
            let ty = if options.tangent_parity { ElementType::Float4 } else { ElementType::Float3 };
            push(ty, Semantic::Tangent, 0);
        }
        decl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout_order_and_offsets() {
        let options = MeshEncodeOptions {
            colours: true,
            binormals: true,
            tangents: true,
            tangent_parity: true,
            ..MeshEncodeOptions::default()
        };
        let decl = VertexDeclaration::for_encode(&options, 2);
        let layout: Vec<(Semantic, u16, u16)> =
            decl.elements.iter().map(|e| (e.semantic, e.offset, e.index)).collect();
        assert_eq!(
            layout,
            vec![
                (Semantic::Position, 0, 0),
                (Semantic::Normal, 12, 0),
                (Semantic::Diffuse, 24, 0),
                (Semantic::TexCoords, 28, 0),
                (Semantic::TexCoords, 36, 1),
                (Semantic::Binormal, 44, 0),
                (Semantic::Tangent, 56, 0),
            ]
        );
        assert_eq!(decl.vertex_size(0), 72);
        assert_eq!(decl.sources(), vec![0]);
    }

    #[test]
    fn test_read_rejects_unknown_type() {
        let mut w = ChunkWriter::new();
        w.chunk(chunk_ids::GEOMETRY_VERTEX_DECLARATION, |w| {
            w.chunk(chunk_ids::GEOMETRY_VERTEX_ELEMENT, |w| {
                for v in [0u16, 42, 1, 0, 0] {
                    w.write_u16(v);
                }
                Ok(())
            })
        })
        .unwrap();
        let data = w.finish().unwrap();
        let mut r = ChunkReader::new(&data);
        let header = r.read_chunk_header().unwrap();
        let err = VertexDeclaration::read(&mut r, &header).unwrap_err();
        assert!(err.to_string().contains("element type 42"));
    }
}
