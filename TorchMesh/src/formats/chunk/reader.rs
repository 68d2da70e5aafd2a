//! Bounds-checked cursor over a chunked byte buffer

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};

use super::ids::CHUNK_HEADER_SIZE;
use crate::error::{Error, Result};

/// A chunk header as read from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: u16,
    /// Payload length in bytes, header excluded.
    pub length: u32,
    /// Byte offset of the header itself.
    pub offset: u64,
}

impl ChunkHeader {
    #[must_use]
    pub fn payload_start(&self) -> u64 {
        self.offset + CHUNK_HEADER_SIZE as u64
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.payload_start() + u64::from(self.length)
    }
}

/// Reads chunk headers and little-endian primitives, tracking open chunks so
/// no read can silently cross a chunk boundary.
pub struct ChunkReader<'a> {
    cursor: Cursor<&'a [u8]>,
    open: Vec<ChunkHeader>,
}

impl<'a> ChunkReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data), open: Vec::new() }
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.position() >= self.len()
    }

    /// Nesting depth of open chunks.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Bytes left before the innermost open chunk (or the buffer) ends.
    #[must_use]
    pub fn remaining_in_chunk(&self) -> u64 {
        let end = self.open.last().map_or(self.len(), ChunkHeader::end);
        end.saturating_sub(self.position())
    }

    /// Whether `header` still has unread bytes (typically child chunks).
    #[must_use]
    pub fn has_more_in(&self, header: &ChunkHeader) -> bool {
        self.position() < header.end()
    }

    /// Build a [`Error::MalformedChunk`] for the innermost open chunk at the
    /// current position.
    #[must_use]
    pub fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::MalformedChunk {
            chunk_id: self.open.last().map_or(0, |c| c.id),
            offset: self.position(),
            reason: reason.into(),
        }
    }

    fn ensure(&self, needed: u64) -> Result<()> {
        let pos = self.position();
        if let Some(open) = self.open.last()
            && pos + needed > open.end()
        {
            return Err(Error::MalformedChunk {
                chunk_id: open.id,
                offset: pos,
                reason: format!(
                    "read of {needed} bytes crosses chunk end at byte {}",
                    open.end()
                ),
            });
        }
        let available = self.len().saturating_sub(pos);
        if needed > available {
            return Err(Error::TruncatedInput { offset: pos, needed, available });
        }
        Ok(())
    }

    /// Read a chunk header and validate its declared length against the
    /// buffer and the enclosing chunk.
    ///
    /// # Errors
    /// [`Error::TruncatedInput`] when the header or declared payload runs past
    /// the buffer, [`Error::MalformedChunk`] when it runs past its parent.
    pub fn read_chunk_header(&mut self) -> Result<ChunkHeader> {
        let offset = self.position();
        self.ensure(CHUNK_HEADER_SIZE as u64)?;
        let id = self.cursor.read_u16::<LittleEndian>()?;
        let length = self.cursor.read_u32::<LittleEndian>()?;
        let header = ChunkHeader { id, length, offset };

        if let Some(parent) = self.open.last()
            && header.end() > parent.end()
        {
            return Err(Error::MalformedChunk {
                chunk_id: id,
                offset,
                reason: format!(
                    "declares {length} bytes but parent 0x{:04X} ends at byte {}",
                    parent.id,
                    parent.end()
                ),
            });
        }
        if header.end() > self.len() {
            return Err(Error::TruncatedInput {
                offset: header.payload_start(),
                needed: u64::from(length),
                available: self.len() - header.payload_start(),
            });
        }
        Ok(header)
    }

    /// Push `header` as the innermost open chunk.
    pub fn enter(&mut self, header: &ChunkHeader) {
        self.open.push(*header);
    }

    /// Close `header`, which must be the innermost open chunk and be fully
    /// consumed.
    ///
    /// # Errors
    /// [`Error::MalformedChunk`] on unbalanced nesting or when the chunk's
    /// declared length does not match what was read.
    pub fn leave(&mut self, header: &ChunkHeader) -> Result<()> {
        match self.open.last() {
            Some(top) if top == header => {}
            _ => {
                return Err(Error::MalformedChunk {
                    chunk_id: header.id,
                    offset: self.position(),
                    reason: "leaving a chunk that is not the innermost open chunk".to_string(),
                });
            }
        }
        if self.position() != header.end() {
            return Err(Error::MalformedChunk {
                chunk_id: header.id,
                offset: self.position(),
                reason: format!(
                    "consumed {} of {} declared bytes",
                    self.position().saturating_sub(header.payload_start()),
                    header.length
                ),
            });
        }
        self.open.pop();
        Ok(())
    }

    /// Advance `len` bytes without interpreting them.
    ///
    /// # Errors
    /// Same bounds rules as any other read.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        self.ensure(len)?;
        self.cursor.set_position(self.position() + len);
        Ok(())
    }

    /// Skip the payload of a chunk whose header was just read.
    ///
    /// # Errors
    /// [`Error::MalformedChunk`] if the cursor is already past the payload.
    pub fn skip_chunk(&mut self, header: &ChunkHeader) -> Result<()> {
        if self.position() > header.end() {
            return Err(self.malformed(format!("cursor already past chunk 0x{:04X}", header.id)));
        }
        tracing::debug!(
            "Skipping chunk 0x{:04X} ({} bytes) at byte {}",
            header.id,
            header.length,
            header.offset
        );
        self.skip(header.end() - self.position())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Quaternions are stored x, y, z, w.
    pub fn read_quat(&mut self) -> Result<Quat> {
        Ok(Quat::from_xyzw(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len as u64)?;
        let start = self.position() as usize;
        let data: &'a [u8] = self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    /// Read a NUL-terminated UTF-8 string.
    ///
    /// # Errors
    /// [`Error::MalformedChunk`] if the terminator is missing inside the open
    /// chunk, [`Error::TruncatedInput`] if the buffer ends first.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.position() as usize;
        let limit = start + self.remaining_in_chunk() as usize;
        let data: &'a [u8] = self.cursor.get_ref();

        let Some(len) = data[start..limit].iter().position(|&b| b == 0) else {
            return Err(if self.open.is_empty() {
                Error::TruncatedInput {
                    offset: start as u64,
                    needed: (limit - start + 1) as u64,
                    available: (limit - start) as u64,
                }
            } else {
                self.malformed("unterminated string")
            });
        };

        let text = String::from_utf8(data[start..start + len].to_vec())?;
        self.cursor.set_position((start + len + 1) as u64);
        Ok(text)
    }
}
