// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;

use tracing::{debug, trace, warn};

use crate::cursor::ByteReader;
use crate::error::{Error, Result};
use crate::offset_table::{OffsetBase, OffsetWriter};
use crate::options::DecodeOptions;
use crate::string_heap::{Name, StringPool, StringTable};

/// Chunk payloads are padded to this, and the padding counts towards the declared size.
pub const CHUNK_ALIGNMENT: u64 = 4;

/// A four character chunk signature, such as "OBJS".
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionTag(pub [u8; 4]);

impl SectionTag {
    pub const fn new(tag: &[u8; 4]) -> Self {
        Self(*tag)
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SectionTag({self})")
    }
}

/// The eight bytes in front of every chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionHeader {
    pub tag: SectionTag,
    /// Size of the payload, not including this header.
    pub size: u32,
    /// Where the tag was read from.
    pub offset: u64,
}

impl SectionHeader {
    pub const SIZE: u64 = 8;

    pub fn read(reader: &mut ByteReader) -> Result<Self> {
        let offset = reader.position();
        let tag = SectionTag(reader.read_tag()?);
        let size = reader.read_u32()?;
        Ok(Self { tag, size, offset })
    }

    /// First byte of the payload. Offsets stored inside the payload are relative to this.
    pub fn payload_offset(&self) -> u64 {
        self.offset + Self::SIZE
    }

    /// Where the next chunk begins, no matter how much of this one was understood.
    pub fn end_offset(&self) -> u64 {
        self.payload_offset() + self.size as u64
    }
}

/// A section that can be read from its chunk payload.
pub trait DecodeSection: Sized {
    /// Reads `count` records. `reader` only covers this section's payload.
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self>;

    /// Looks up every [`Name::Pending`] once the string table is known.
    fn resolve_names(&mut self, strings: &StringTable) -> Result<()>;

    /// Number of records, as stored in the container header.
    fn count(&self) -> u32;
}

/// A section that can also be written back out.
pub trait EncodeSection: DecodeSection {
    fn encode(&self, writer: &mut OffsetWriter, context: &mut EncodeContext) -> Result<()>;
}

/// State shared by every section while a container is written.
pub struct EncodeContext<'a> {
    pub strings: &'a mut StringPool,
    /// Absolute position of the current section's payload.
    pub payload_offset: u64,
}

impl EncodeContext<'_> {
    /// Base for offsets stored inside the current payload.
    pub fn base(&self) -> OffsetBase {
        OffsetBase::Position(self.payload_offset)
    }

    /// Reserves a string table offset for `name` at the writer's position.
    pub fn name(&mut self, writer: &mut OffsetWriter, name: &Name) -> Result<()> {
        name.reserve(writer, self.strings)
    }
}

/// Reads one chunk and leaves `reader` right after its declared size.
///
/// `dispatch` gets a reader bounded to the payload and returns `None` for tags it doesn't know, which
/// are skipped (or rejected, with [`DecodeOptions::strict_sections`]).
pub fn read_chunk<'a, T, F>(
    reader: &mut ByteReader<'a>,
    options: &DecodeOptions,
    dispatch: F,
) -> Result<Option<T>>
where
    F: FnOnce(&SectionHeader, &mut ByteReader<'a>) -> Result<Option<T>>,
{
    let header = SectionHeader::read(reader)?;
    trace!(tag = %header.tag, offset = header.offset, size = header.size, "Reading chunk");

    let mut payload = reader.sub_reader(header.size as u64)?;
    let section = dispatch(&header, &mut payload)?;

    match &section {
        Some(_) if payload.remaining() > 0 => {
            debug!(
                tag = %header.tag,
                unparsed = payload.remaining(),
                "Section did not use its whole declared size"
            );
        }
        Some(_) => {}
        None if options.strict_sections => {
            return Err(Error::UnknownSectionTag {
                tag: header.tag,
                offset: header.offset,
            });
        }
        None => {
            warn!(tag = %header.tag, offset = header.offset, size = header.size, "Skipping unknown section");
        }
    }

    reader.seek(header.end_offset())?;
    Ok(section)
}

/// Writes `[tag][size][payload]`, patching the size once `body` is done and the payload is padded.
///
/// `body` receives the absolute offset of the payload.
pub fn write_chunk<F>(writer: &mut OffsetWriter, tag: SectionTag, body: F) -> Result<()>
where
    F: FnOnce(&mut OffsetWriter, u64) -> Result<()>,
{
    writer.write_tag(&tag.0)?;
    let payload_offset = writer.position() + 4;
    let size = writer.reserve(OffsetBase::Position(payload_offset), format!("{tag} size"))?;

    body(writer, payload_offset)?;

    writer.align(CHUNK_ALIGNMENT)?;
    writer.resolve_here(size)
}
