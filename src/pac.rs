// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::{binrw, Endian};
use tracing::debug;

use crate::common::Platform;
use crate::compression::{compress, decompress_tagged, CompressionType};
use crate::cursor::ByteReader;
use crate::error::{Error, Result};
use crate::offset_table::{OffsetBase, OffsetWriter};
use crate::options::DecodeOptions;
use crate::string_heap::{Name, StringPool, StringTable};
use crate::{ByteBuffer, ByteSpan, ReadableFile, WritableFile};

pub const MAGIC: [u8; 4] = *b"PAC\0";

const NAME_ALIGNMENT: u64 = 4;
const BLOCK_ALIGNMENT: u64 = 32;
const BLOCK_HEADER_SIZE: u64 = 8;

#[binrw]
#[derive(Clone, Copy, Debug)]
struct FileEntry {
    /// Relative to the name pool.
    name: u32,
    /// Absolute offset of the block.
    offset: u32,
    /// Stored size of the block, including its header.
    size: u32,
}

impl FileEntry {
    const SIZE: usize = 12;
}

/// A file stored in the archive, already decompressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacEntry {
    pub name: Name,
    /// How the data is compressed when the archive is written.
    pub compression: CompressionType,
    pub data: ByteBuffer,
}

/// A flat archive of named, individually compressed files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pac {
    pub entries: Vec<PacEntry>,
}

impl Pac {
    pub fn find(&self, name: &str) -> Option<&PacEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_bytes() == Some(name.as_bytes()))
    }

    /// Reads an archive, decompressing every block.
    pub fn decode(buffer: ByteSpan, endian: Endian, options: &DecodeOptions) -> Result<Self> {
        let mut reader = ByteReader::new(buffer, endian);

        let magic = reader.read_tag()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic {
                expected: MAGIC,
                found: magic,
            });
        }

        let file_count = reader.read_u32()?;
        let names_offset = reader.read_u32()? as u64;
        let files: Vec<FileEntry> = reader.read_vec(file_count as usize, FileEntry::SIZE)?;

        // the name pool runs until the first block
        let names_end = files
            .iter()
            .map(|file| file.offset as u64)
            .filter(|offset| *offset >= names_offset)
            .min()
            .unwrap_or(reader.len());
        let names = StringTable::from_bytes(
            reader.read_bytes_at(names_offset, names_end.saturating_sub(names_offset) as usize)?,
        );

        let mut entries = Vec::with_capacity(files.len());
        for file in &files {
            let name = Name::from(names.get(file.name)?);

            reader.seek(file.offset as u64)?;
            let mut block = reader.sub_reader(file.size as u64)?;
            let size = block.read_u32()? as usize;
            let tag = block.read_u32()?;
            let compressed = block.peek_bytes(block.remaining() as usize)?;

            debug!(
                %name,
                tag,
                compressed = compressed.len(),
                size,
                "Reading archive entry"
            );

            entries.push(PacEntry {
                data: decompress_tagged(tag, compressed, size, options)?,
                compression: CompressionType::from_tag(tag)?,
                name,
            });
        }

        Ok(Self { entries })
    }

    /// Writes the archive, compressing every entry with its own codec.
    pub fn encode(&self, endian: Endian) -> Result<ByteBuffer> {
        let mut writer = OffsetWriter::new(endian);
        let mut names = StringPool::new();

        writer.write_tag(&MAGIC)?;
        writer.write_len(self.entries.len())?;
        let names_offset = writer.reserve(OffsetBase::File, "name pool")?;

        let mut slots = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            entry.name.reserve(&mut writer, &mut names)?;
            let offset = writer.reserve(OffsetBase::File, format!("{} block", entry.name))?;
            let size = writer.reserve(OffsetBase::File, format!("{} size", entry.name))?;
            slots.push((offset, size));
        }

        writer.resolve_here(names_offset)?;
        names.write(&mut writer, NAME_ALIGNMENT)?;

        for (entry, (offset, size)) in self.entries.iter().zip(slots) {
            let compressed = compress(entry.compression, &entry.data)?;

            writer.align(BLOCK_ALIGNMENT)?;
            writer.resolve_here(offset)?;
            let block_size = BLOCK_HEADER_SIZE as usize + compressed.len();
            let block_size = u32::try_from(block_size).map_err(|_| Error::OffsetOutOfRange {
                position: writer.position(),
                value: block_size as i64,
            })?;

            writer.write_len(entry.data.len())?;
            writer.write_u32(entry.compression.tag())?;
            writer.write_bytes(&compressed)?;
            writer.fill(size, block_size)?;

            debug!(
                name = %entry.name,
                compressed = compressed.len(),
                size = entry.data.len(),
                "Wrote archive entry"
            );
        }

        writer.finish()
    }
}

impl ReadableFile for Pac {
    fn from_existing(platform: Platform, buffer: ByteSpan) -> Result<Self> {
        Pac::decode(buffer, platform.endianness(), &DecodeOptions::default())
    }
}

impl WritableFile for Pac {
    fn write_to_buffer(&self, platform: Platform) -> Result<ByteBuffer> {
        self.encode(platform.endianness())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass_random_invalid;

    fn sample() -> Pac {
        Pac {
            entries: vec![
                PacEntry {
                    name: "model.hsf".into(),
                    compression: CompressionType::Inflate,
                    data: b"HSFV".iter().copied().cycle().take(600).collect(),
                },
                PacEntry {
                    name: "readme.txt".into(),
                    compression: CompressionType::None,
                    data: b"hello".to_vec(),
                },
                PacEntry {
                    name: "empty".into(),
                    compression: CompressionType::None,
                    data: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn round_trip() {
        for platform in [Platform::Wii, Platform::Ds] {
            let pac = sample();
            let bytes = pac.write_to_buffer(platform).unwrap();
            assert_eq!(Pac::from_existing(platform, &bytes).unwrap(), pac);
        }
    }

    #[test]
    fn layout() {
        let bytes = sample().encode(Endian::Big).unwrap();
        assert_eq!(&bytes[0..4], b"PAC\0");
        assert_eq!(&bytes[4..8], &3u32.to_be_bytes());
        // header (12) and three entries (36), so the pool starts at 48
        assert_eq!(&bytes[8..12], &48u32.to_be_bytes());
        assert_eq!(&bytes[48..58], b"model.hsf\0");

        // the stored entry is not compressed, so its size is the data plus the block header
        let offset = u32::from_be_bytes(bytes[28..32].try_into().unwrap()) as usize;
        assert_eq!(offset % 32, 0);
        assert_eq!(&bytes[32..36], &13u32.to_be_bytes());
        assert_eq!(&bytes[offset..offset + 8], &[0, 0, 0, 5, 0, 0, 0, 0]);
        assert_eq!(&bytes[offset + 8..offset + 13], b"hello");
    }

    #[test]
    fn names_are_kept_byte_for_byte() {
        let pac = Pac {
            entries: vec![PacEntry {
                name: vec![0x83, 0x41, b'.', b'h', b's', b'f'].into(),
                compression: CompressionType::None,
                data: vec![1],
            }],
        };
        let bytes = pac.encode(Endian::Little).unwrap();
        let decoded = Pac::decode(&bytes, Endian::Little, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded, pac);
        assert!(decoded.find("\u{30a2}.hsf").is_none());
    }

    #[test]
    fn custom_codecs_are_read_only() {
        let pac = Pac {
            entries: vec![PacEntry {
                name: "a".into(),
                compression: CompressionType::Lzss,
                data: vec![1, 2, 3],
            }],
        };
        assert!(matches!(
            pac.encode(Endian::Little),
            Err(Error::CompressNotImplemented(CompressionType::Lzss))
        ));
    }

    fn handmade(tag: u32, block: &[u8], size: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"PAC\0");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&24u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.extend_from_slice(&(8 + block.len() as u32).to_le_bytes());
        bytes.extend_from_slice(b"rle\0\0\0\0\0");
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&tag.to_le_bytes());
        bytes.extend_from_slice(block);
        bytes
    }

    #[test]
    fn read_rle_entry() {
        let bytes = handmade(5, &[0x83, 0xAA, 0xBB, 0xCC, 0x02, 0xFF], 5);
        let pac = Pac::from_existing(Platform::ThreeDs, &bytes).unwrap();
        let entry = pac.find("rle").unwrap();
        assert_eq!(entry.compression, CompressionType::Rle);
        assert_eq!(entry.data, vec![0xAA, 0xBB, 0xCC, 0xFF, 0xFF]);
        assert!(pac.find("missing").is_none());
    }

    #[test]
    fn unsupported_compression() {
        let bytes = handmade(99, &[0; 4], 4);
        assert!(matches!(
            Pac::from_existing(Platform::Ds, &bytes),
            Err(Error::UnsupportedCompression(99))
        ));
    }

    #[test]
    fn size_limit() {
        let bytes = handmade(0, &[0; 4], 4);
        let options = DecodeOptions {
            max_decompressed_size: 2,
            ..Default::default()
        };
        assert!(matches!(
            Pac::decode(&bytes, Endian::Little, &options),
            Err(Error::DecompressedTooLarge { size: 4, limit: 2 })
        ));
    }

    #[test]
    fn truncated_block() {
        let bytes = handmade(0, &[0; 4], 4);
        for len in 0..bytes.len() {
            assert!(Pac::from_existing(Platform::Ds, &bytes[..len]).is_err(), "length {len}");
        }
    }

    #[test]
    fn test_invalid() {
        pass_random_invalid::<Pac>();
    }
}
