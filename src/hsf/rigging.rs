// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Skinning envelopes and morph shapes. These are only read, writing them is not supported yet.

use binrw::binrw;

use crate::cursor::ByteReader;
use crate::error::Result;
use crate::hsf::vertex::{decode_components, read_array, ArrayElement, Component, Vec3};
use crate::section::DecodeSection;
use crate::string_heap::{Name, StringTable};

/// Binds one vertex to a joint.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CenvBinding {
    pub position: u16,
    pub normal: u16,
    pub joint: u16,
    #[br(temp)]
    #[bw(calc = 0)]
    padding: u16,
    pub weight: f32,
}

impl ArrayElement for CenvBinding {
    const STRIDE: usize = 12;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CenvSection {
    pub envelopes: Vec<Component<CenvBinding>>,
}

impl DecodeSection for CenvSection {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        Ok(Self {
            envelopes: decode_components(reader, count)?,
        })
    }

    fn resolve_names(&mut self, strings: &StringTable) -> Result<()> {
        for envelope in &mut self.envelopes {
            envelope.name.resolve(strings)?;
        }
        Ok(())
    }

    fn count(&self) -> u32 {
        self.envelopes.len() as u32
    }
}

#[binrw]
#[derive(Clone, Copy, Debug)]
struct ShapeHeader {
    name: u32,
    target: i32,
    count: u32,
    offset: u32,
}

/// Per-vertex position deltas applied to the position component `target`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub name: Name,
    pub target: i32,
    pub deltas: Vec<Vec3>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeSection {
    pub shapes: Vec<Shape>,
}

impl DecodeSection for ShapeSection {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        let headers: Vec<ShapeHeader> = reader.read_vec(count as usize, 16)?;
        let shapes = headers
            .iter()
            .map(|header| {
                Ok(Shape {
                    name: Name::Pending(header.name),
                    target: header.target,
                    deltas: read_array(reader, header.offset, header.count)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { shapes })
    }

    fn resolve_names(&mut self, strings: &StringTable) -> Result<()> {
        for shape in &mut self.shapes {
            shape.name.resolve(strings)?;
        }
        Ok(())
    }

    fn count(&self) -> u32 {
        self.shapes.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use binrw::Endian;

    use super::*;

    #[test]
    fn read_envelope() {
        let mut data = Vec::new();
        for value in [0u32, 2, 12] {
            data.extend_from_slice(&value.to_be_bytes());
        }
        for binding in [[1u16, 2, 3, 0xFFFF], [4, 5, 6, 0]] {
            for value in binding {
                data.extend_from_slice(&value.to_be_bytes());
            }
            data.extend_from_slice(&0.5f32.to_be_bytes());
        }

        let mut reader = ByteReader::new(&data, Endian::Big);
        let section = CenvSection::decode(&mut reader, 1).unwrap();
        let bindings = &section.envelopes[0].data;
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[1].joint, 6);
        assert_eq!(bindings[0].weight, 0.5);
    }

    #[test]
    fn read_shape() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&16u32.to_le_bytes());
        for value in [0.0f32, 0.25, -1.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let mut reader = ByteReader::new(&data, Endian::Little);
        let section = ShapeSection::decode(&mut reader, 1).unwrap();
        assert_eq!(section.shapes[0].target, 1);
        assert_eq!(section.shapes[0].deltas, vec![[0.0, 0.25, -1.0]]);
        assert_eq!(section.count(), 1);
    }
}
