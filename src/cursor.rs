// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::{BinRead, BinWrite, Endian};

use crate::common::align_up;
use crate::error::{Error, Result};
use crate::{ByteBuffer, ByteSpan};

/// Value written into slots that are waiting for a patch.
pub const PLACEHOLDER: u32 = 0xFFFF_FFFF;

/// Bounds-checked reader over a borrowed buffer. The byte order can be changed at any time.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    cursor: Cursor<ByteSpan<'a>>,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: ByteSpan<'a>, endian: Endian) -> Self {
        Self {
            cursor: Cursor::new(buffer),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    /// Fails with [`Error::TruncatedInput`] unless `needed` more bytes can be read.
    pub fn ensure(&self, needed: u64) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.position(),
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.len() {
            return Err(Error::TruncatedInput {
                offset: position,
                needed: position - self.len(),
                available: 0,
            });
        }
        self.cursor.set_position(position);
        Ok(())
    }

    pub fn seek_relative(&mut self, delta: i64) -> Result<()> {
        let target = self.position() as i64 + delta;
        if target < 0 {
            return Err(Error::CorruptInput(format!(
                "seek to negative position {target}"
            )));
        }
        self.seek(target as u64)
    }

    /// Skips forward to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        self.seek(align_up(self.position(), alignment))
    }

    pub fn read<T>(&mut self) -> Result<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let start = self.position();
        T::read_options(&mut self.cursor, self.endian, ()).map_err(|err| {
            if err.is_eof() {
                Error::TruncatedInput {
                    offset: start,
                    needed: std::mem::size_of::<T>() as u64,
                    available: self.len().saturating_sub(start),
                }
            } else {
                Error::CorruptInput(format!("at {start:#x}: {err}"))
            }
        })
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read()
    }

    /// Reads a four byte ASCII signature, which is never byte swapped.
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        let bytes = self.peek_bytes(4)?;
        self.cursor.set_position(self.position() + 4);
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let bytes = self.peek_bytes(count)?.to_vec();
        self.cursor.set_position(self.position() + count as u64);
        Ok(bytes)
    }

    /// Returns the next `count` bytes without moving.
    pub fn peek_bytes(&self, count: usize) -> Result<ByteSpan<'a>> {
        self.ensure(count as u64)?;
        let data: ByteSpan<'a> = *self.cursor.get_ref();
        let start = self.position() as usize;
        Ok(&data[start..start + count])
    }

    /// Reads `count` elements that are each `stride` bytes on disk.
    ///
    /// The whole run is bounds checked before anything is allocated.
    pub fn read_vec<T>(&mut self, count: usize, stride: usize) -> Result<Vec<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let total = (count as u64).checked_mul(stride as u64).ok_or_else(|| {
            Error::CorruptInput(format!("element count {count} overflows"))
        })?;
        self.ensure(total)?;

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read()?);
        }
        Ok(values)
    }

    /// Like [`Self::read_vec`], but from `offset` and leaving the position untouched.
    pub fn read_vec_at<T>(&mut self, offset: u64, count: usize, stride: usize) -> Result<Vec<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let old_pos = self.position();
        self.seek(offset)?;
        let values = self.read_vec(count, stride);
        self.cursor.set_position(old_pos);
        values
    }

    pub fn read_bytes_at(&mut self, offset: u64, count: usize) -> Result<Vec<u8>> {
        let old_pos = self.position();
        self.seek(offset)?;
        let bytes = self.read_bytes(count);
        self.cursor.set_position(old_pos);
        bytes
    }

    /// A reader over the next `len` bytes, sharing this reader's byte order. Positions in it start at zero.
    pub fn sub_reader(&self, len: u64) -> Result<ByteReader<'a>> {
        let span = self.peek_bytes(len as usize)?;
        Ok(ByteReader::new(span, self.endian))
    }
}

/// Growable writer that mirrors [`ByteReader`].
#[derive(Debug)]
pub struct ByteWriter {
    cursor: Cursor<ByteBuffer>,
    endian: Endian,
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            cursor: Cursor::new(ByteBuffer::new()),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Moves the write head. Writing past the current end zero fills the gap.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.cursor.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    pub fn write<T>(&mut self, value: &T) -> Result<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        value.write_options(&mut self.cursor, self.endian, ())?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write(&value)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value)
    }

    /// Writes a length or count, which has to fit in a u32.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let value = u32::try_from(len).map_err(|_| Error::OffsetOutOfRange {
            position: self.position(),
            value: len as i64,
        })?;
        self.write_u32(value)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write(&value)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write(&value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.write_all(bytes)?;
        Ok(())
    }

    pub fn write_tag(&mut self, tag: &[u8; 4]) -> Result<()> {
        self.write_bytes(tag)
    }

    /// Zero fills up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        let target = align_up(self.position(), alignment);
        let padding = (target - self.position()) as usize;
        self.write_bytes(&vec![0u8; padding])
    }

    /// Writes a placeholder and returns where it lives, so it can be patched later.
    pub fn reserve_u32(&mut self) -> Result<u64> {
        let position = self.position();
        self.write_u32(PLACEHOLDER)?;
        Ok(position)
    }

    /// Overwrites the u32 at `position`, then returns to where we were.
    pub fn patch_u32(&mut self, position: u64, value: u32) -> Result<()> {
        let old_pos = self.position();
        self.seek(position)?;
        self.write_u32(value)?;
        self.seek(old_pos)
    }

    pub fn into_inner(self) -> ByteBuffer {
        self.cursor.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_mixed_endianness() {
        let data = [0x12, 0x34, 0x12, 0x34, b'O', b'B', b'J', b'S'];
        let mut reader = ByteReader::new(&data, Endian::Big);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        reader.set_endian(Endian::Little);
        assert_eq!(reader.read_u16().unwrap(), 0x3412);
        assert_eq!(&reader.read_tag().unwrap(), b"OBJS");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn read_past_end() {
        let data = [0u8; 3];
        let mut reader = ByteReader::new(&data, Endian::Big);
        assert!(matches!(
            reader.read_u32(),
            Err(Error::TruncatedInput { offset: 0, .. })
        ));
        assert!(matches!(
            reader.read_bytes(4),
            Err(Error::TruncatedInput { needed: 4, available: 3, .. })
        ));
        assert!(reader.seek(4).is_err());
        assert!(reader.seek(3).is_ok());
    }

    #[test]
    fn read_vec_checks_bounds_first() {
        let data = [0u8; 8];
        let mut reader = ByteReader::new(&data, Endian::Little);
        assert!(reader.read_vec::<u32>(usize::MAX / 2, 4).is_err());
        assert!(reader.read_vec::<u32>(3, 4).is_err());
        assert_eq!(reader.read_vec::<u32>(2, 4).unwrap(), vec![0, 0]);
    }

    #[test]
    fn align_reader() {
        let data = [0u8; 16];
        let mut reader = ByteReader::new(&data, Endian::Big);
        reader.seek(5).unwrap();
        reader.align(8).unwrap();
        assert_eq!(reader.position(), 8);
        reader.align(8).unwrap();
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn sub_reader_is_bounded() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut reader = ByteReader::new(&data, Endian::Big);
        reader.seek(2).unwrap();
        let mut sub = reader.sub_reader(2).unwrap();
        assert_eq!(sub.position(), 0);
        assert_eq!(sub.read_bytes(2).unwrap(), vec![3, 4]);
        assert!(sub.read_u8().is_err());
        assert!(reader.sub_reader(5).is_err());
    }

    #[test]
    fn write_and_patch() {
        let mut writer = ByteWriter::new(Endian::Big);
        writer.write_u8(1).unwrap();
        writer.align(4).unwrap();
        let slot = writer.reserve_u32().unwrap();
        writer.write_u16(0xBEEF).unwrap();
        writer.patch_u32(slot, 0xAABBCCDD).unwrap();
        assert_eq!(writer.position(), 10);
        assert_eq!(
            writer.into_inner(),
            vec![1, 0, 0, 0, 0xAA, 0xBB, 0xCC, 0xDD, 0xBE, 0xEF]
        );
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn lengths_must_fit() {
        let mut writer = ByteWriter::new(Endian::Big);
        writer.write_len(7).unwrap();
        assert!(matches!(
            writer.write_len(u32::MAX as usize + 1),
            Err(Error::OffsetOutOfRange { position: 4, value: 0x1_0000_0000 })
        ));
        assert_eq!(writer.into_inner(), vec![0, 0, 0, 7]);
    }

    #[test]
    fn little_endian_writes() {
        let mut writer = ByteWriter::new(Endian::Little);
        writer.write_u32(0x01020304).unwrap();
        writer.write_f32(1.0).unwrap();
        assert_eq!(writer.into_inner(), vec![4, 3, 2, 1, 0, 0, 0x80, 0x3F]);
    }
}
