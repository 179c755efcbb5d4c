// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::{binrw, Endian};
use tracing::{debug, warn};

use crate::common::Platform;
use crate::cursor::ByteReader;
use crate::error::{Error, Result};
use crate::offset_table::{OffsetBase, OffsetWriter};
use crate::options::DecodeOptions;
use crate::section::{read_chunk, write_chunk, EncodeContext, SectionHeader, SectionTag};
use crate::string_heap::{StringPool, StringTable};
use crate::{ByteBuffer, ByteSpan, ReadableFile, WritableFile};

mod record;
pub use record::{NamedRecord, RecordSection};

mod object;
pub use object::{ClusterRecord, ObjectRecord, Transform};

mod material;
pub use material::{AttributeRecord, Fog, FogSection, MaterialRecord};

mod vertex;
pub use vertex::{ArrayElement, Component, ComponentSection, Rgba, Vec2, Vec3, DATA_ALIGNMENT};

mod texture;
pub use texture::{Palette, PaletteSection, Texture, TextureSection};

mod rigging;
pub use rigging::{CenvBinding, CenvSection, Shape, ShapeSection};

pub const MAGIC: [u8; 4] = *b"HSFV";

/// Written in the file's own byte order, so reading it back as 0xFFFE means we guessed wrong.
pub const BYTE_ORDER_MARK: u16 = 0xFEFF;

/// Holds every name. It is always written last and is not part of the [`SectionGraph`].
pub const STRING_TABLE_TAG: SectionTag = SectionTag::new(b"STRS");

const STRING_ALIGNMENT: u64 = 4;

define_sections! {
    encodable {
        Object(RecordSection<ObjectRecord>) = b"OBJS",
        Material(RecordSection<MaterialRecord>) = b"MATL",
        Attribute(RecordSection<AttributeRecord>) = b"ATTR",
        Position(ComponentSection<Vec3>) = b"POSI",
        Normal(ComponentSection<Vec3>) = b"NORM",
        Color(ComponentSection<Rgba>) = b"COLR",
        TexCoord(ComponentSection<Vec2>) = b"UVCD",
        Texture(TextureSection) = b"TEXR",
        Palette(PaletteSection) = b"PALT",
        Fog(FogSection) = b"FOG_",
        Part(ComponentSection<u16>) = b"PART",
        Cluster(RecordSection<ClusterRecord>) = b"CLST",
    }
    decode_only {
        Cenv(CenvSection) = b"CENV",
        Shape(ShapeSection) = b"SHAP",
    }
}

/// One row of the header table.
#[binrw]
#[derive(Clone, Copy, Debug)]
struct TableEntry {
    tag: [u8; 4],
    /// Number of records in the section.
    count: u32,
    /// Absolute offset of the section's chunk.
    offset: u32,
}

impl TableEntry {
    const SIZE: usize = 12;
}

/// The header table, tracking which rows were already claimed by a chunk.
struct HeaderTable {
    entries: Vec<TableEntry>,
    used: Vec<bool>,
}

impl HeaderTable {
    fn new(entries: Vec<TableEntry>) -> Self {
        let used = vec![false; entries.len()];
        Self { entries, used }
    }

    /// Every chunk the table promises must at least have its header inside the input.
    fn check_bounds(&self, len: u64) -> Result<()> {
        for entry in &self.entries {
            let offset = entry.offset as u64;
            if offset + SectionHeader::SIZE > len {
                return Err(Error::TruncatedInput {
                    offset,
                    needed: SectionHeader::SIZE,
                    available: len.saturating_sub(offset),
                });
            }
        }
        Ok(())
    }

    /// Record count for the chunk described by `header`.
    fn take_count(&mut self, header: &SectionHeader) -> u32 {
        let unused = |index: &usize| !self.used[*index] && self.entries[*index].tag == header.tag.0;
        let index = (0..self.entries.len())
            .filter(unused)
            .find(|index| self.entries[*index].offset as u64 == header.offset)
            .or_else(|| (0..self.entries.len()).find(unused));

        let Some(index) = index else {
            warn!(tag = %header.tag, offset = header.offset, "Section is missing from the header table, reading no records");
            return 0;
        };

        self.used[index] = true;
        let entry = self.entries[index];
        if entry.offset as u64 != header.offset {
            debug!(
                tag = %header.tag,
                table_offset = entry.offset,
                chunk_offset = header.offset,
                "Header table points somewhere else than the chunk"
            );
        }
        entry.count
    }
}

enum Chunk {
    Section(Section),
    Strings(StringTable),
}

/// Every section of a container, in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionGraph {
    pub version: u16,
    /// Kept as-is, the meaning of the individual bits is not known.
    pub flags: u32,
    pub endian: Endian,
    sections: Vec<Section>,
}

impl SectionGraph {
    pub fn new(endian: Endian) -> Self {
        Self {
            version: 0,
            flags: 0,
            endian,
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut Vec<Section> {
        &mut self.sections
    }

    /// The first section of this kind.
    pub fn find(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|section| section.kind() == kind)
    }

    pub fn all_of_type(&self, kind: SectionKind) -> Vec<&Section> {
        self.sections
            .iter()
            .filter(|section| section.kind() == kind)
            .collect()
    }

    pub fn objects(&self) -> &[ObjectRecord] {
        self.find(SectionKind::Object)
            .and_then(Section::as_object)
            .map(|section| section.records.as_slice())
            .unwrap_or_default()
    }

    pub fn materials(&self) -> &[MaterialRecord] {
        self.find(SectionKind::Material)
            .and_then(Section::as_material)
            .map(|section| section.records.as_slice())
            .unwrap_or_default()
    }

    pub fn attributes(&self) -> &[AttributeRecord] {
        self.find(SectionKind::Attribute)
            .and_then(Section::as_attribute)
            .map(|section| section.records.as_slice())
            .unwrap_or_default()
    }

    pub fn positions(&self, component: usize) -> Option<&[Vec3]> {
        self.find(SectionKind::Position)
            .and_then(Section::as_position)
            .and_then(|section| section.get(component))
    }

    pub fn normals(&self, component: usize) -> Option<&[Vec3]> {
        self.find(SectionKind::Normal)
            .and_then(Section::as_normal)
            .and_then(|section| section.get(component))
    }

    pub fn colors(&self, component: usize) -> Option<&[Rgba]> {
        self.find(SectionKind::Color)
            .and_then(Section::as_color)
            .and_then(|section| section.get(component))
    }

    pub fn texcoords(&self, component: usize) -> Option<&[Vec2]> {
        self.find(SectionKind::TexCoord)
            .and_then(Section::as_tex_coord)
            .and_then(|section| section.get(component))
    }

    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.find(SectionKind::Texture)
            .and_then(Section::as_texture)
            .and_then(|section| section.textures.get(index))
    }

    pub fn palette(&self, index: usize) -> Option<&Palette> {
        self.find(SectionKind::Palette)
            .and_then(Section::as_palette)
            .and_then(|section| section.palettes.get(index))
    }

    /// Name of the `index`th object.
    pub fn object_name(&self, index: usize) -> Option<&str> {
        self.objects().get(index).and_then(|object| object.name.as_str())
    }
}

/// Decodes a container, guessing big endian until the byte order mark says otherwise.
pub fn decode_container(bytes: ByteSpan) -> Result<SectionGraph> {
    decode_container_with(bytes, Endian::Big, &DecodeOptions::default())
}

pub fn decode_container_with(
    bytes: ByteSpan,
    endian: Endian,
    options: &DecodeOptions,
) -> Result<SectionGraph> {
    let mut reader = ByteReader::new(bytes, endian);

    let magic = reader.read_tag()?;
    if magic != MAGIC {
        return Err(Error::InvalidMagic {
            expected: MAGIC,
            found: magic,
        });
    }

    match reader.read_u16()? {
        BYTE_ORDER_MARK => {}
        mark if mark == BYTE_ORDER_MARK.swap_bytes() => {
            let flipped = match reader.endian() {
                Endian::Big => Endian::Little,
                Endian::Little => Endian::Big,
            };
            debug!(?flipped, "Byte order mark is swapped, switching endianness");
            reader.set_endian(flipped);
        }
        mark => {
            return Err(Error::CorruptInput(format!(
                "invalid byte order mark {mark:#06x}"
            )));
        }
    }

    let version = reader.read_u16()?;
    let flags = reader.read_u32()?;
    let entry_count = reader.read_u32()?;
    let mut table = HeaderTable::new(reader.read_vec(entry_count as usize, TableEntry::SIZE)?);
    table.check_bounds(reader.len())?;
    debug!(version, flags, entry_count, "Read container header");

    let mut sections = Vec::new();
    let mut strings = None;
    while reader.remaining() >= SectionHeader::SIZE {
        let chunk = read_chunk(&mut reader, options, |header, payload| {
            if header.tag == STRING_TABLE_TAG {
                return Ok(Some(Chunk::Strings(StringTable::read(payload)?)));
            }

            let Some(kind) = SectionKind::from_tag(header.tag) else {
                return Ok(None);
            };
            let count = table.take_count(header);
            Ok(Some(Chunk::Section(Section::decode(kind, payload, count)?)))
        })?;

        match chunk {
            Some(Chunk::Section(section)) => {
                debug!(tag = %section.kind().tag(), count = section.count(), "Decoded section");
                sections.push(section);
            }
            Some(Chunk::Strings(table)) if strings.is_none() => strings = Some(table),
            Some(Chunk::Strings(_)) => warn!("Ignoring an extra string table"),
            None => {}
        }
    }

    if reader.remaining() > 0 {
        warn!(
            trailing = reader.remaining(),
            "Ignoring trailing bytes after the last chunk"
        );
    }

    let strings = strings.unwrap_or_default();
    for section in &mut sections {
        section.resolve_names(&strings)?;
    }

    Ok(SectionGraph {
        version,
        flags,
        endian: reader.endian(),
        sections,
    })
}

/// Encodes `graph` in its own byte order.
pub fn encode_container(graph: &SectionGraph) -> Result<ByteBuffer> {
    encode_container_with(graph, graph.endian)
}

pub fn encode_container_with(graph: &SectionGraph, endian: Endian) -> Result<ByteBuffer> {
    if let Some(section) = graph
        .sections
        .iter()
        .find(|section| !section.kind().supports_encode())
    {
        return Err(Error::EncodeNotImplemented {
            tag: section.kind().tag(),
        });
    }

    let mut writer = OffsetWriter::new(endian);
    let mut strings = StringPool::new();

    writer.write_tag(&MAGIC)?;
    writer.write_u16(BYTE_ORDER_MARK)?;
    writer.write_u16(graph.version)?;
    writer.write_u32(graph.flags)?;
    writer.write_len(graph.sections.len() + 1)?;

    let mut offsets = Vec::with_capacity(graph.sections.len());
    for section in &graph.sections {
        let tag = section.kind().tag();
        writer.write_tag(&tag.0)?;
        writer.write_u32(section.count())?;
        offsets.push(writer.reserve(OffsetBase::File, format!("{tag} offset"))?);
    }

    writer.write_tag(&STRING_TABLE_TAG.0)?;
    let string_count = writer.reserve(OffsetBase::File, "string count")?;
    let string_offset = writer.reserve(OffsetBase::File, "STRS offset")?;

    for (section, offset) in graph.sections.iter().zip(offsets) {
        writer.resolve_here(offset)?;
        write_chunk(&mut writer, section.kind().tag(), |writer, payload_offset| {
            section.encode(
                writer,
                &mut EncodeContext {
                    strings: &mut strings,
                    payload_offset,
                },
            )
        })?;
        debug!(tag = %section.kind().tag(), count = section.count(), "Encoded section");
    }

    writer.resolve_here(string_offset)?;
    write_chunk(&mut writer, STRING_TABLE_TAG, |writer, _| {
        writer.write_u32(strings.byte_size(STRING_ALIGNMENT) as u32)?;
        strings.write(writer, STRING_ALIGNMENT)
    })?;
    writer.fill(string_count, strings.len() as u32)?;
    debug!(strings = strings.len(), "Encoded string table");

    writer.finish()
}

/// Decodes every `(name, bytes)` pair on its own. A file that fails is logged and reported, the rest still decode.
pub fn decode_batch<'a, I>(inputs: I, options: &DecodeOptions) -> Vec<(String, Result<SectionGraph>)>
where
    I: IntoIterator<Item = (&'a str, ByteSpan<'a>)>,
{
    inputs
        .into_iter()
        .map(|(name, bytes)| {
            let result = decode_container_with(bytes, Endian::Big, options);
            match &result {
                Ok(graph) => debug!(file = name, sections = graph.sections.len(), "Decoded container"),
                Err(err) => warn!(file = name, %err, "Failed to decode container, skipping it"),
            }
            (name.to_string(), result)
        })
        .collect()
}

impl ReadableFile for SectionGraph {
    fn from_existing(platform: Platform, buffer: ByteSpan) -> Result<Self> {
        decode_container_with(buffer, platform.endianness(), &DecodeOptions::default())
    }
}

impl WritableFile for SectionGraph {
    fn write_to_buffer(&self, platform: Platform) -> Result<ByteBuffer> {
        encode_container_with(self, platform.endianness())
    }
}
