// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::binrw;

use crate::ByteBuffer;
use crate::cursor::ByteReader;
use crate::error::Result;
use crate::hsf::vertex::{read_array, write_array, DATA_ALIGNMENT};
use crate::offset_table::OffsetWriter;
use crate::section::{DecodeSection, EncodeContext, EncodeSection};
use crate::string_heap::{Name, StringTable};

#[binrw]
#[derive(Clone, Copy, Debug)]
struct TextureHeader {
    name: u32,
    width: u16,
    height: u16,
    format: u8,
    bpp: u8,
    unknown: u16,
    palette: i32,
    size: u32,
    offset: u32,
}

impl TextureHeader {
    const SIZE: usize = 24;
}

/// Texture pixels, kept in the console's native format.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
    pub name: Name,
    pub width: u16,
    pub height: u16,
    pub format: u8,
    pub bits_per_pixel: u8,
    pub unknown: u16,
    /// Index into the palette section, or -1.
    pub palette: i32,
    pub data: ByteBuffer,
}

impl Texture {
    pub fn palette_index(&self) -> Option<usize> {
        usize::try_from(self.palette).ok()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureSection {
    pub textures: Vec<Texture>,
}

impl DecodeSection for TextureSection {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        let headers: Vec<TextureHeader> = reader.read_vec(count as usize, TextureHeader::SIZE)?;
        let textures = headers
            .iter()
            .map(|header| {
                Ok(Texture {
                    name: Name::Pending(header.name),
                    width: header.width,
                    height: header.height,
                    format: header.format,
                    bits_per_pixel: header.bpp,
                    unknown: header.unknown,
                    palette: header.palette,
                    data: reader.read_bytes_at(header.offset as u64, header.size as usize)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { textures })
    }

    fn resolve_names(&mut self, strings: &StringTable) -> Result<()> {
        for texture in &mut self.textures {
            texture.name.resolve(strings)?;
        }
        Ok(())
    }

    fn count(&self) -> u32 {
        self.textures.len() as u32
    }
}

impl EncodeSection for TextureSection {
    fn encode(&self, writer: &mut OffsetWriter, context: &mut EncodeContext) -> Result<()> {
        let mut slots = Vec::with_capacity(self.textures.len());
        for texture in &self.textures {
            context.name(writer, &texture.name)?;
            writer.write_u16(texture.width)?;
            writer.write_u16(texture.height)?;
            writer.write_u8(texture.format)?;
            writer.write_u8(texture.bits_per_pixel)?;
            writer.write_u16(texture.unknown)?;
            writer.write_i32(texture.palette)?;
            writer.write_len(texture.data.len())?;
            slots.push(writer.reserve(context.base(), format!("{} pixels", texture.name))?);
        }

        for (texture, slot) in self.textures.iter().zip(slots) {
            writer.align(DATA_ALIGNMENT)?;
            writer.resolve_here(slot)?;
            writer.write_bytes(&texture.data)?;
        }
        Ok(())
    }
}

#[binrw]
#[derive(Clone, Copy, Debug)]
struct PaletteHeader {
    name: u32,
    format: u32,
    count: u32,
    offset: u32,
}

impl PaletteHeader {
    const SIZE: usize = 16;
}

/// Colors for indexed textures, in the format given by `format`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Palette {
    pub name: Name,
    pub format: u32,
    pub colors: Vec<u16>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaletteSection {
    pub palettes: Vec<Palette>,
}

impl DecodeSection for PaletteSection {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        let headers: Vec<PaletteHeader> = reader.read_vec(count as usize, PaletteHeader::SIZE)?;
        let palettes = headers
            .iter()
            .map(|header| {
                Ok(Palette {
                    name: Name::Pending(header.name),
                    format: header.format,
                    colors: read_array(reader, header.offset, header.count)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { palettes })
    }

    fn resolve_names(&mut self, strings: &StringTable) -> Result<()> {
        for palette in &mut self.palettes {
            palette.name.resolve(strings)?;
        }
        Ok(())
    }

    fn count(&self) -> u32 {
        self.palettes.len() as u32
    }
}

impl EncodeSection for PaletteSection {
    fn encode(&self, writer: &mut OffsetWriter, context: &mut EncodeContext) -> Result<()> {
        let mut slots = Vec::with_capacity(self.palettes.len());
        for palette in &self.palettes {
            context.name(writer, &palette.name)?;
            writer.write_u32(palette.format)?;
            writer.write_len(palette.colors.len())?;
            slots.push(writer.reserve(context.base(), "palette colors")?);
        }

        for (palette, slot) in self.palettes.iter().zip(slots) {
            write_array(writer, slot, &palette.colors)?;
        }
        Ok(())
    }
}
