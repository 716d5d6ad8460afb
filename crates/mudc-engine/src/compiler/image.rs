//! Memory-image assembly and the segment-stream wire format.
//!
//! Live objects are packed into machine memory from a fixed base
//! address in ascending object-number order, then serialized as a
//! stream of address-tagged segments. The stream is little-endian u16
//! words: a leading `0xFFFF` sentinel, then per segment `start`, `end`
//! followed by `end - start + 1` raw bytes, and a trailing `0xFFFF`. A
//! segment with `start == end` carries one placeholder byte and names
//! the entry point instead of data.

use crate::compiler::object::ObjectInstance;
use thiserror::Error;

/// Top of the address space; the stream's u16 fields cannot reach past it.
const ADDRESS_LIMIT: u32 = 0x1_0000;

/// Where compiled data lands in machine memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap {
    /// First address of the packed object area.
    pub object_base: u16,
    /// Machine entry point, emitted as a zero-length segment.
    pub entry_point: Option<u16>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            object_base: 0x1000,
            entry_point: None,
        }
    }
}

/// A contiguous run of bytes at a fixed machine address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub start: u16,
    pub data: Vec<u8>,
}

impl Segment {
    /// Address of the last byte. Segments are never empty and never
    /// reach past the top of the address space, an invariant `place`
    /// and `decode` both uphold. Computed wide so a segment spanning
    /// all of memory from address zero stays exact.
    pub fn end(&self) -> u16 {
        (self.start as u32 + self.data.len() as u32 - 1) as u16
    }
}

/// A complete memory image: data segments plus an optional entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub segments: Vec<Segment>,
    pub entry_point: Option<u16>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("object {noid} does not fit below address {ADDRESS_LIMIT:#x}")]
    AddressOverflow { noid: u8 },

    #[error("stream does not begin with the 0xffff sentinel")]
    MissingSentinel,

    #[error("stream truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("malformed segment: end {end:#06x} precedes start {start:#06x}")]
    MalformedSegment { start: u16, end: u16 },
}

/// Pack live objects into memory and collect the resulting segments,
/// merging runs whose address ranges touch.
///
/// `objects` must come in ascending object-number order; each object
/// advances the cursor by its state-vector size.
pub fn place<'a>(
    objects: impl Iterator<Item = &'a ObjectInstance>,
    map: &MemoryMap,
) -> Result<Image, ImageError> {
    let mut image = Image {
        segments: Vec::new(),
        entry_point: map.entry_point,
    };
    let mut cursor = map.object_base as u32;
    for object in objects {
        let size = object.state.len() as u32;
        if cursor + size > ADDRESS_LIMIT {
            return Err(ImageError::AddressOverflow { noid: object.noid });
        }
        if size == 0 {
            continue;
        }
        push_merging(&mut image.segments, cursor as u16, &object.state);
        cursor += size;
    }
    Ok(image)
}

fn push_merging(segments: &mut Vec<Segment>, start: u16, data: &[u8]) {
    if let Some(last) = segments.last_mut() {
        if u32::from(last.end()) + 1 == u32::from(start) {
            last.data.extend_from_slice(data);
            return;
        }
    }
    segments.push(Segment {
        start,
        data: data.to_vec(),
    });
}

/// Serialize an image to the segment-stream format.
pub fn encode(image: &Image) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, 0xFFFF);
    for segment in &image.segments {
        put_u16(&mut out, segment.start);
        put_u16(&mut out, segment.end());
        out.extend_from_slice(&segment.data);
    }
    if let Some(entry) = image.entry_point {
        put_u16(&mut out, entry);
        put_u16(&mut out, entry);
        out.push(0);
    }
    put_u16(&mut out, 0xFFFF);
    out
}

/// Parse a segment stream back into an image.
///
/// A `start == end` segment names the entry point; the first one seen
/// wins and its placeholder byte is skipped.
pub fn decode(bytes: &[u8]) -> Result<Image, ImageError> {
    let mut reader = Reader { bytes, pos: 0 };
    if reader.u16()? != 0xFFFF {
        return Err(ImageError::MissingSentinel);
    }
    let mut image = Image::default();
    loop {
        let start = reader.u16()?;
        if start == 0xFFFF {
            return Ok(image);
        }
        let end = reader.u16()?;
        if end < start {
            return Err(ImageError::MalformedSegment { start, end });
        }
        let len = (end - start) as usize + 1;
        let data = reader.take(len)?;
        if start == end {
            if image.entry_point.is_none() {
                image.entry_point = Some(start);
            }
        } else {
            image.segments.push(Segment {
                start,
                data: data.to_vec(),
            });
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u16(&mut self) -> Result<u16, ImageError> {
        let raw = self.take(2)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn take(&mut self, len: usize) -> Result<&[u8], ImageError> {
        if self.pos + len > self.bytes.len() {
            return Err(ImageError::Truncated {
                offset: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

fn put_u16(out: &mut Vec<u8>, word: u16) {
    out.extend_from_slice(&word.to_le_bytes());
}
