//! Chunk buffer builder with length backpatching

use glam::{Quat, Vec3};

use crate::error::{Error, Result};

/// An open chunk awaiting its length.
#[derive(Debug, Clone, Copy)]
struct OpenChunk {
    id: u16,
    /// Offset of the `u32` length placeholder.
    length_offset: usize,
}

/// Builds a chunked byte buffer in memory.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    data: Vec<u8>,
    open: Vec<OpenChunk>,
}

impl ChunkWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a chunk id and a placeholder length.
    pub fn begin_chunk(&mut self, id: u16) {
        self.write_u16(id);
        let length_offset = self.data.len();
        self.write_u32(0);
        self.open.push(OpenChunk { id, length_offset });
    }

    /// Close the innermost chunk and patch its payload length.
    ///
    /// # Errors
    /// [`Error::MalformedChunk`] when no chunk is open or the payload does
    /// not fit in a `u32`.
    pub fn end_chunk(&mut self) -> Result<()> {
        let Some(chunk) = self.open.pop() else {
            return Err(Error::MalformedChunk {
                chunk_id: 0,
                offset: self.data.len() as u64,
                reason: "end_chunk without a matching begin_chunk".to_string(),
            });
        };
        let payload_start = chunk.length_offset + 4;
        let length = u32::try_from(self.data.len() - payload_start).map_err(|_| Error::MalformedChunk {
            chunk_id: chunk.id,
            offset: (chunk.length_offset - 2) as u64,
            reason: "payload exceeds 4 GiB".to_string(),
        })?;
        self.data[chunk.length_offset..payload_start].copy_from_slice(&length.to_le_bytes());
        Ok(())
    }

    /// Write a complete chunk, with `body` filling its payload.
    ///
    /// # Errors
    /// Whatever `body` returns, or nesting errors from [`Self::end_chunk`].
    pub fn chunk<F>(&mut self, id: u16, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.begin_chunk(id);
        body(self)?;
        self.end_chunk()
    }

    /// Return the finished buffer.
    ///
    /// # Errors
    /// [`Error::MalformedChunk`] if any chunk is still open.
    pub fn finish(self) -> Result<Vec<u8>> {
        if let Some(chunk) = self.open.last() {
            return Err(Error::MalformedChunk {
                chunk_id: chunk.id,
                offset: (chunk.length_offset - 2) as u64,
                reason: format!("{} chunk(s) never closed", self.open.len()),
            });
        }
        Ok(self.data)
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.data.push(u8::from(v));
    }

    pub fn write_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_vec3(&mut self, v: Vec3) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
    }

    pub fn write_quat(&mut self, q: Quat) {
        self.write_f32(q.x);
        self.write_f32(q.y);
        self.write_f32(q.z);
        self.write_f32(q.w);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a string followed by a NUL terminator.
    ///
    /// Interior NULs are dropped so the string reads back intact.
    pub fn write_string(&mut self, s: &str) {
        self.data.extend(s.bytes().filter(|&b| b != 0));
        self.data.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::chunk::ChunkReader;

    #[test]
    fn test_nested_lengths_are_backpatched() {
        let mut w = ChunkWriter::new();
        w.begin_chunk(0x3000);
        w.write_bool(true);
        w.chunk(0x4000, |w| {
            w.write_string("mat");
            Ok(())
        })
        .unwrap();
        w.end_chunk().unwrap();
        let data = w.finish().unwrap();

        // outer payload = 1 (bool) + 6 (child header) + 4 ("mat\0")
        assert_eq!(&data[2..6], &11u32.to_le_bytes());
        assert_eq!(&data[9..13], &4u32.to_le_bytes());

        let mut r = ChunkReader::new(&data);
        let outer = r.read_chunk_header().unwrap();
        r.enter(&outer);
        assert!(r.read_bool().unwrap());
        let inner = r.read_chunk_header().unwrap();
        r.enter(&inner);
        assert_eq!(r.read_string().unwrap(), "mat");
        r.leave(&inner).unwrap();
        r.leave(&outer).unwrap();
        assert!(r.is_at_end());
    }

    #[test]
    fn test_unbalanced_nesting() {
        let mut w = ChunkWriter::new();
        assert!(matches!(w.end_chunk(), Err(Error::MalformedChunk { chunk_id: 0, .. })));

        let mut w = ChunkWriter::new();
        w.begin_chunk(0x1000);
        w.begin_chunk(0x3000);
        w.end_chunk().unwrap();
        assert!(matches!(w.finish(), Err(Error::MalformedChunk { chunk_id: 0x1000, offset: 0, .. })));
    }

    #[test]
    fn test_body_error_propagates() {
        let mut w = ChunkWriter::new();
        let err = w
            .chunk(0x2000, |_| Err(Error::InvalidMesh("boom".into())))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
    }
}
