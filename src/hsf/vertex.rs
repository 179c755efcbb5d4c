// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt::Debug;

use binrw::{binrw, BinRead, BinWrite};

use crate::cursor::ByteReader;
use crate::error::Result;
use crate::offset_table::{OffsetBase, OffsetWriter, PatchHandle};
use crate::section::{DecodeSection, EncodeContext, EncodeSection};
use crate::string_heap::{Name, StringTable};

/// Arrays referenced from a record are aligned to this.
pub const DATA_ALIGNMENT: u64 = 32;

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Rgba = [u8; 4];

/// Something that is stored as a flat array after a section's records.
pub trait ArrayElement:
    Clone + Debug + PartialEq + for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()>
{
    const STRIDE: usize;
}

impl ArrayElement for Vec2 {
    const STRIDE: usize = 8;
}

impl ArrayElement for Vec3 {
    const STRIDE: usize = 12;
}

impl ArrayElement for Rgba {
    const STRIDE: usize = 4;
}

impl ArrayElement for u16 {
    const STRIDE: usize = 2;
}

/// `[name][count][offset]`, the record in front of every named array.
#[binrw]
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArrayHeader {
    pub name: u32,
    pub count: u32,
    pub offset: u32,
}

impl ArrayHeader {
    pub const SIZE: usize = 12;

    /// Reads the `count` elements this header points to.
    pub fn read_data<T: ArrayElement>(&self, reader: &mut ByteReader) -> Result<Vec<T>> {
        read_array(reader, self.offset, self.count)
    }
}

/// Reads `count` elements at `offset`, relative to the section payload.
pub(crate) fn read_array<T: ArrayElement>(reader: &mut ByteReader, offset: u32, count: u32) -> Result<Vec<T>> {
    reader.read_vec_at(offset as u64, count as usize, T::STRIDE)
}

/// Aligns, points `slot` at the current position and writes `values`.
pub(crate) fn write_array<T: ArrayElement>(
    writer: &mut OffsetWriter,
    slot: PatchHandle,
    values: &[T],
) -> Result<()> {
    writer.align(DATA_ALIGNMENT)?;
    writer.resolve_here(slot)?;
    for value in values {
        writer.write(value)?;
    }
    Ok(())
}

/// Writes `[name][count][offset]` and returns the offset slot.
pub(crate) fn write_array_header(
    writer: &mut OffsetWriter,
    context: &mut EncodeContext,
    name: &Name,
    count: usize,
) -> Result<PatchHandle> {
    context.name(writer, name)?;
    writer.write_len(count)?;
    let base: OffsetBase = context.base();
    writer.reserve(base, format!("{name} data"))
}

/// One named array, such as the positions of a single mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Component<T> {
    pub name: Name,
    pub data: Vec<T>,
}

impl<T> Component<T> {
    pub fn new(name: impl Into<Name>, data: Vec<T>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Reads `count` array headers and the arrays they point to.
pub(crate) fn decode_components<T: ArrayElement>(
    reader: &mut ByteReader,
    count: u32,
) -> Result<Vec<Component<T>>> {
    let headers: Vec<ArrayHeader> = reader.read_vec(count as usize, ArrayHeader::SIZE)?;
    headers
        .iter()
        .map(|header| {
            Ok(Component {
                name: Name::Pending(header.name),
                data: header.read_data(reader)?,
            })
        })
        .collect()
}

/// A list of named arrays: vertex positions, normals, colors, texture coordinates or part indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentSection<T> {
    pub components: Vec<Component<T>>,
}

impl<T> ComponentSection<T> {
    pub fn new(components: Vec<Component<T>>) -> Self {
        Self { components }
    }

    /// The data of the `index`th component.
    pub fn get(&self, index: usize) -> Option<&[T]> {
        self.components.get(index).map(|component| component.data.as_slice())
    }
}

impl<T: ArrayElement> DecodeSection for ComponentSection<T> {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        Ok(Self {
            components: decode_components(reader, count)?,
        })
    }

    fn resolve_names(&mut self, strings: &StringTable) -> Result<()> {
        for component in &mut self.components {
            component.name.resolve(strings)?;
        }
        Ok(())
    }

    fn count(&self) -> u32 {
        self.components.len() as u32
    }
}

impl<T: ArrayElement> EncodeSection for ComponentSection<T> {
    fn encode(&self, writer: &mut OffsetWriter, context: &mut EncodeContext) -> Result<()> {
        let mut slots = Vec::with_capacity(self.components.len());
        for component in &self.components {
            slots.push(write_array_header(
                writer,
                context,
                &component.name,
                component.data.len(),
            )?);
        }

        for (component, slot) in self.components.iter().zip(slots) {
            write_array(writer, slot, &component.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use binrw::Endian;

    use super::*;
    use crate::string_heap::StringPool;

    fn encode<T: ArrayElement>(section: &ComponentSection<T>, endian: Endian) -> Vec<u8> {
        let mut writer = OffsetWriter::new(endian);
        let mut strings = StringPool::new();
        let mut context = EncodeContext {
            strings: &mut strings,
            payload_offset: 0,
        };
        section.encode(&mut writer, &mut context).unwrap();
        strings.write(&mut writer, 4).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn positions_are_aligned() {
        let section = ComponentSection::new(vec![Component::new(
            "cube",
            vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
        )]);
        let bytes = encode(&section, Endian::Big);

        // header, padding up to 32, then the positions
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 32]);
        assert_eq!(&bytes[12..32], &[0; 20]);
        assert_eq!(&bytes[32..36], &1.0f32.to_be_bytes());

        let mut reader = ByteReader::new(&bytes, Endian::Big);
        let decoded = ComponentSection::<Vec3>::decode(&mut reader, 1).unwrap();
        assert_eq!(decoded.get(0), section.get(0));
        assert_eq!(decoded.components[0].name, Name::Pending(0));
    }

    #[test]
    fn empty_components() {
        let section: ComponentSection<Rgba> =
            ComponentSection::new(vec![Component::new("a", vec![]), Component::new("b", vec![])]);
        let bytes = encode(&section, Endian::Little);

        let mut reader = ByteReader::new(&bytes, Endian::Little);
        let decoded = ComponentSection::<Rgba>::decode(&mut reader, 2).unwrap();
        assert_eq!(decoded.count(), 2);
        assert!(decoded.get(1).unwrap().is_empty());
        assert_eq!(decoded.get(2), None);
    }

    #[test]
    fn array_past_payload() {
        let mut data = Vec::new();
        for value in [0u32, 100, 12] {
            data.extend_from_slice(&value.to_be_bytes());
        }
        let mut reader = ByteReader::new(&data, Endian::Big);
        assert!(ComponentSection::<u16>::decode(&mut reader, 1).is_err());
    }
}
