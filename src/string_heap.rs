// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::fmt;

use crate::ByteBuffer;
use crate::cursor::ByteReader;
use crate::error::{Error, Result};
use crate::offset_table::{Label, OffsetBase, OffsetWriter, PatchHandle};

/// A name that lives in the string table, which is usually read after the records that use it.
#[derive(Clone, PartialEq, Eq)]
pub enum Name {
    /// Offset into the string table, waiting for the table to be read.
    Pending(u32),
    /// The bytes of the name without the terminator. Usually UTF-8, but older files use other encodings, so they
    /// are kept as they were.
    Resolved(ByteBuffer),
}

impl Name {
    /// The raw name, if it was already looked up.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Name::Pending(_) => None,
            Name::Resolved(value) => Some(value),
        }
    }

    /// The name, if it was already looked up and is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Looks up a pending offset in `table`.
    pub fn resolve(&mut self, table: &StringTable) -> Result<()> {
        if let Name::Pending(offset) = *self {
            *self = Name::Resolved(table.get(offset)?.to_vec());
        }
        Ok(())
    }

    /// Reserves this name's offset slot in `pool`.
    ///
    /// A pending name has nothing to point at, so its slot is left for [`OffsetWriter::finish`] to report.
    pub(crate) fn reserve(&self, writer: &mut OffsetWriter, pool: &mut StringPool) -> Result<()> {
        match self {
            Name::Resolved(value) => pool.reserve(writer, value).map(|_| ()),
            Name::Pending(offset) => writer
                .reserve(OffsetBase::File, format!("name at string offset {offset}"))
                .map(|_| ()),
        }
    }
}

impl Default for Name {
    fn default() -> Self {
        Name::Resolved(ByteBuffer::new())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Pending(offset) => write!(f, "<pending {offset}>"),
            Name::Resolved(value) => f.write_str(&String::from_utf8_lossy(value)),
        }
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Pending(offset) => f.debug_tuple("Pending").field(offset).finish(),
            Name::Resolved(value) => f
                .debug_tuple("Resolved")
                .field(&String::from_utf8_lossy(value))
                .finish(),
        }
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::Resolved(value.as_bytes().to_vec())
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::Resolved(value.into_bytes())
    }
}

impl From<&[u8]> for Name {
    fn from(value: &[u8]) -> Self {
        Name::Resolved(value.to_vec())
    }
}

impl From<ByteBuffer> for Name {
    fn from(value: ByteBuffer) -> Self {
        Name::Resolved(value)
    }
}

/// A block of null terminated strings, addressed by their byte offset from the start of the block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringTable {
    bytes: ByteBuffer,
}

impl StringTable {
    pub fn from_bytes(bytes: ByteBuffer) -> Self {
        Self { bytes }
    }

    /// Reads a `[u32 size][strings...]` block.
    pub fn read(reader: &mut ByteReader) -> Result<Self> {
        let size = reader.read_u32()?;
        let bytes = reader.read_bytes(size as usize)?;
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the string starting at `offset`, without its terminator. Offsets into the middle of a string are
    /// fine, they name its tail.
    pub fn get(&self, offset: u32) -> Result<&[u8]> {
        let tail = self.bytes.get(offset as usize..).filter(|tail| !tail.is_empty()).ok_or_else(|| {
            Error::CorruptInput(format!(
                "string offset {offset} is outside of a {} byte table",
                self.bytes.len()
            ))
        })?;

        let end = tail.iter().position(|&byte| byte == 0).ok_or_else(|| {
            Error::CorruptInput(format!("string at offset {offset} is not terminated"))
        })?;

        Ok(&tail[..end])
    }

    /// Every string in the table with its offset, in order. Alignment padding is skipped.
    pub fn entries(&self) -> Vec<(u32, &[u8])> {
        let mut entries = Vec::new();
        let mut offset = 0;
        while offset < self.bytes.len() {
            let end = match self.bytes[offset..].iter().position(|&byte| byte == 0) {
                Some(end) => offset + end,
                None => break,
            };
            if end > offset {
                entries.push((offset as u32, &self.bytes[offset..end]));
            }
            offset = end + 1;
        }
        entries
    }
}

/// Identifies an interned string in a [`StringPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StringId(usize);

/// Collects the strings of a file while it is being written.
///
/// Each distinct value is stored once, in the order it was first seen. Every reference to it is a reserved
/// slot that gets patched when the pool itself is written out.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: Vec<ByteBuffer>,
    lookup: HashMap<ByteBuffer, StringId>,
    pending: Vec<(StringId, PatchHandle)>,
    base: Option<Label>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` unless it is already in the pool. It must not contain a null byte.
    pub fn intern(&mut self, value: impl AsRef<[u8]>) -> Result<StringId> {
        let value = value.as_ref();
        if let Some(id) = self.lookup.get(value) {
            return Ok(*id);
        }

        if value.contains(&0) {
            return Err(Error::InvalidName(String::from_utf8_lossy(value).into_owned()));
        }

        let id = StringId(self.strings.len());
        self.strings.push(value.to_vec());
        self.lookup.insert(value.to_vec(), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, id: StringId) -> Option<&[u8]> {
        self.strings.get(id.0).map(ByteBuffer::as_slice)
    }

    /// Interns `value` and reserves a slot for its offset at the writer's position.
    pub fn reserve(&mut self, writer: &mut OffsetWriter, value: impl AsRef<[u8]>) -> Result<StringId> {
        let id = self.intern(value)?;
        self.reserve_id(writer, id)?;
        Ok(id)
    }

    /// Reserves a slot for the offset of an already interned string.
    pub fn reserve_id(&mut self, writer: &mut OffsetWriter, id: StringId) -> Result<()> {
        let base = self.base_label(writer);
        let handle = writer.reserve(OffsetBase::Label(base), format!("string #{}", id.0))?;
        self.pending.push((id, handle));
        Ok(())
    }

    /// Size of the pool once written, including alignment padding.
    pub fn byte_size(&self, alignment: u64) -> u64 {
        crate::common::align_up(self.raw_size(), alignment)
    }

    fn raw_size(&self) -> u64 {
        self.strings.iter().map(|value| value.len() as u64 + 1).sum()
    }

    /// Writes every string, pads to `alignment` and patches all of the reserved slots.
    ///
    /// Padding is measured from the start of the pool, not the start of the file. Slots for ids that were never
    /// interned are left alone, so [`OffsetWriter::finish`] reports them.
    pub fn write(&mut self, writer: &mut OffsetWriter, alignment: u64) -> Result<()> {
        let base = self.base_label(writer);
        writer.place_label(base)?;

        let mut offsets = Vec::with_capacity(self.strings.len());
        for value in &self.strings {
            offsets.push(writer.position());
            writer.write_bytes(value)?;
            writer.write_u8(0)?;
        }
        let padding = self.byte_size(alignment) - self.raw_size();
        writer.write_bytes(&vec![0u8; padding as usize])?;

        for (id, handle) in self.pending.drain(..) {
            if let Some(&offset) = offsets.get(id.0) {
                writer.resolve(handle, offset)?;
            }
        }

        Ok(())
    }

    fn base_label(&mut self, writer: &mut OffsetWriter) -> Label {
        *self
            .base
            .get_or_insert_with(|| writer.new_label("string pool"))
    }
}
