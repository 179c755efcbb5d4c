// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::{BinRead, BinWrite};

use crate::cursor::ByteReader;
use crate::error::Result;
use crate::offset_table::OffsetWriter;
use crate::section::{DecodeSection, EncodeContext, EncodeSection};
use crate::string_heap::{Name, StringTable};

/// A fixed size record that starts with its name.
///
/// Implementors read the name as a [`Name::Pending`] offset and skip it when written, since the section writes the
/// name slot itself.
pub trait NamedRecord: for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()> {
    /// Size on disk, including the name.
    const SIZE: usize;

    fn name(&self) -> &Name;
    fn name_mut(&mut self) -> &mut Name;
}

/// A section that is nothing but a list of fixed size records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSection<T> {
    pub records: Vec<T>,
}

impl<T> RecordSection<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self { records }
    }
}

impl<T: NamedRecord> DecodeSection for RecordSection<T> {
    fn decode(reader: &mut ByteReader, count: u32) -> Result<Self> {
        Ok(Self {
            records: reader.read_vec(count as usize, T::SIZE)?,
        })
    }

    fn resolve_names(&mut self, strings: &StringTable) -> Result<()> {
        for record in &mut self.records {
            record.name_mut().resolve(strings)?;
        }
        Ok(())
    }

    fn count(&self) -> u32 {
        self.records.len() as u32
    }
}

impl<T: NamedRecord> EncodeSection for RecordSection<T> {
    fn encode(&self, writer: &mut OffsetWriter, context: &mut EncodeContext) -> Result<()> {
        for record in &self.records {
            context.name(writer, record.name())?;
            writer.write(record)?;
        }
        Ok(())
    }
}

/// Implements [`NamedRecord`] for a `#[binrw]` struct with a `name` field.
macro_rules! named_record {
    ($ty:ty, $size:expr) => {
        impl $crate::hsf::record::NamedRecord for $ty {
            const SIZE: usize = $size;

            fn name(&self) -> &$crate::string_heap::Name {
                &self.name
            }

            fn name_mut(&mut self) -> &mut $crate::string_heap::Name {
                &mut self.name
            }
        }
    };
}

pub(crate) use named_record;
