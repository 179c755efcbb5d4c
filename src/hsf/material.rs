// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::binrw;

use crate::cursor::ByteReader;
use crate::error::{Error, Result};
use crate::hsf::record::named_record;
use crate::offset_table::OffsetWriter;
use crate::section::{DecodeSection, EncodeContext, EncodeSection};
use crate::string_heap::{Name, StringTable};

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialRecord {
    #[br(map = |offset: u32| Name::Pending(offset))]
    #[bw(ignore)]
    pub name: Name,
    pub unknown: u32,
    pub ambient: [u8; 4],
    pub color: [f32; 3],
    pub shininess: f32,
    pub transparency: f32,
    /// Kept as-is, the meaning of the individual bits is not known.
    pub flags: u32,
    pub attribute_count: u32,
    /// Index of the first of this material's records in the attribute section.
    pub first_attribute: u32,
}

named_record!(MaterialRecord, 44);

impl MaterialRecord {
    /// Range of attribute indices used by this material.
    pub fn attributes(&self) -> std::ops::Range<usize> {
        let start = self.first_attribute as usize;
        start..start.saturating_add(self.attribute_count as usize)
    }
}

/// A texture layer of a material.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeRecord {
    #[br(map = |offset: u32| Name::Pending(offset))]
    #[bw(ignore)]
    pub name: Name,
    /// Index into the texture section, or -1.
    pub texture: i32,
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub blend: f32,
    pub unknown: [u8; 8],
}

named_record!(AttributeRecord, 28);

#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fog {
    pub start: f32,
    pub end: f32,
    pub color: [u8; 4],
    pub enabled: u32,
}

impl Fog {
    pub const SIZE: usize = 16;
}

/// Scene fog. Files without fog still carry the section, with a count of zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FogSection {
    pub fog: Option<Fog>,
}

impl DecodeSection for FogSection {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        match count {
            0 => Ok(Self { fog: None }),
            1 => {
                reader.ensure(Fog::SIZE as u64)?;
                Ok(Self {
                    fog: Some(reader.read()?),
                })
            }
            count => Err(Error::CorruptInput(format!(
                "fog section has {count} entries, expected at most one"
            ))),
        }
    }

    fn resolve_names(&mut self, _strings: &StringTable) -> Result<()> {
        Ok(())
    }

    fn count(&self) -> u32 {
        self.fog.is_some() as u32
    }
}

impl EncodeSection for FogSection {
    fn encode(&self, writer: &mut OffsetWriter, _context: &mut EncodeContext) -> Result<()> {
        if let Some(fog) = &self.fog {
            writer.write(fog)?;
        }
        Ok(())
    }
}
