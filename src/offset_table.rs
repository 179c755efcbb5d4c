// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::ops::{Deref, DerefMut};

use binrw::Endian;
use tracing::trace;

use crate::ByteBuffer;
use crate::cursor::ByteWriter;
use crate::error::{Error, Result};

/// A reserved u32 slot, issued by [`OffsetWriter::reserve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchHandle(usize);

/// A position that will be known at some point, issued by [`OffsetWriter::new_label`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// What a patched value is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetBase {
    /// The start of the file.
    File,
    /// A position that is already known, usually the start of a section.
    Position(u64),
    /// A position that will be known once the label is placed.
    Label(Label),
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Unset,
    Position(u64),
    Label(Label),
}

#[derive(Debug)]
struct Slot {
    position: u64,
    base: OffsetBase,
    target: Target,
    written: bool,
    description: String,
}

#[derive(Debug)]
struct LabelInfo {
    name: String,
    position: Option<u64>,
}

/// Writes a stream where some values (offsets, sizes) are only known after the data they describe.
///
/// Slots are reserved with a placeholder, and patched as soon as both their target and base are known.
/// Anything still open when [`OffsetWriter::finish`] is called is an error, because some writer promised data it never wrote.
#[derive(Debug)]
pub struct OffsetWriter {
    writer: ByteWriter,
    slots: Vec<Slot>,
    labels: Vec<LabelInfo>,
}

impl OffsetWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            writer: ByteWriter::new(endian),
            slots: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn new_label(&mut self, name: impl Into<String>) -> Label {
        self.labels.push(LabelInfo {
            name: name.into(),
            position: None,
        });
        Label(self.labels.len() - 1)
    }

    /// Pins `label` to the current position and patches every slot that was waiting on it.
    pub fn place_label(&mut self, label: Label) -> Result<()> {
        let position = self.writer.position();
        self.labels[label.0].position = Some(position);
        trace!(label = self.labels[label.0].name.as_str(), position, "Placed label");

        for index in 0..self.slots.len() {
            self.try_write(index)?;
        }
        Ok(())
    }

    pub fn label_position(&self, label: Label) -> Option<u64> {
        self.labels[label.0].position
    }

    /// Reserves a slot at the current position, with no target yet.
    pub fn reserve(&mut self, base: OffsetBase, description: impl Into<String>) -> Result<PatchHandle> {
        let position = self.writer.reserve_u32()?;
        self.slots.push(Slot {
            position,
            base,
            target: Target::Unset,
            written: false,
            description: description.into(),
        });
        Ok(PatchHandle(self.slots.len() - 1))
    }

    /// Reserves a slot that will point at `label` once it is placed.
    pub fn reserve_label(&mut self, label: Label, base: OffsetBase) -> Result<PatchHandle> {
        let description = self.labels[label.0].name.clone();
        let handle = self.reserve(base, description)?;
        self.point_to(handle, label)?;
        Ok(handle)
    }

    /// Gives `handle` an absolute target position.
    pub fn resolve(&mut self, handle: PatchHandle, target: u64) -> Result<()> {
        self.check_open(handle);
        self.slots[handle.0].target = Target::Position(target);
        self.try_write(handle.0)
    }

    /// Points `handle` at wherever we are right now.
    pub fn resolve_here(&mut self, handle: PatchHandle) -> Result<()> {
        let position = self.writer.position();
        self.resolve(handle, position)
    }

    /// Points `handle` at a label, which may not be placed yet.
    pub fn point_to(&mut self, handle: PatchHandle, label: Label) -> Result<()> {
        self.check_open(handle);
        self.slots[handle.0].target = Target::Label(label);
        self.try_write(handle.0)
    }

    /// Writes a plain value into `handle`, such as a count that was only known at the end.
    pub fn fill(&mut self, handle: PatchHandle, value: u32) -> Result<()> {
        self.check_open(handle);
        let slot = &self.slots[handle.0];
        let position = slot.position;
        trace!(position, value, description = slot.description.as_str(), "Filling slot");

        self.writer.patch_u32(position, value)?;
        self.slots[handle.0].written = true;
        Ok(())
    }

    /// Number of slots that are still waiting for a value.
    pub fn unresolved(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.written).count()
    }

    /// Patches whatever is left and hands back the finished stream.
    pub fn finish(mut self) -> Result<ByteBuffer> {
        for index in 0..self.slots.len() {
            self.try_write(index)?;

            let slot = &self.slots[index];
            if !slot.written {
                return Err(Error::UnresolvedPatch {
                    position: slot.position,
                    target: slot.description.clone(),
                });
            }
        }

        Ok(self.writer.into_inner())
    }

    /// Each slot gets exactly one value.
    fn check_open(&self, handle: PatchHandle) {
        debug_assert!(
            !self.slots[handle.0].written,
            "slot for {} was already written",
            self.slots[handle.0].description
        );
    }

    fn base_position(&self, base: OffsetBase) -> Option<u64> {
        match base {
            OffsetBase::File => Some(0),
            OffsetBase::Position(position) => Some(position),
            OffsetBase::Label(label) => self.labels[label.0].position,
        }
    }

    fn target_position(&self, target: Target) -> Option<u64> {
        match target {
            Target::Unset => None,
            Target::Position(position) => Some(position),
            Target::Label(label) => self.labels[label.0].position,
        }
    }

    fn try_write(&mut self, index: usize) -> Result<()> {
        let slot = &self.slots[index];
        if slot.written {
            return Ok(());
        }

        let (Some(base), Some(target)) = (
            self.base_position(slot.base),
            self.target_position(slot.target),
        ) else {
            return Ok(());
        };

        let position = slot.position;
        let value = target as i64 - base as i64;
        let value = u32::try_from(value).map_err(|_| Error::OffsetOutOfRange { position, value })?;

        trace!(position, value, "Patching slot");
        self.writer.patch_u32(position, value)?;
        self.slots[index].written = true;
        Ok(())
    }
}

impl Deref for OffsetWriter {
    type Target = ByteWriter;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl DerefMut for OffsetWriter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_absolute() {
        let mut writer = OffsetWriter::new(Endian::Big);
        let handle = writer.reserve(OffsetBase::File, "data").unwrap();
        writer.write_u32(0).unwrap();
        writer.resolve_here(handle).unwrap();
        writer.write_u8(0xAB).unwrap();

        assert_eq!(writer.unresolved(), 0);
        assert_eq!(writer.position(), 9);
        assert_eq!(
            writer.finish().unwrap(),
            vec![0, 0, 0, 8, 0, 0, 0, 0, 0xAB]
        );
    }

    #[test]
    fn resolve_relative_to_section() {
        let mut writer = OffsetWriter::new(Endian::Little);
        writer.write_bytes(&[0xEE; 4]).unwrap();
        let start = writer.position();
        let handle = writer.reserve(OffsetBase::Position(start), "size").unwrap();
        writer.write_bytes(&[1, 2, 3, 4, 5, 6]).unwrap();
        writer.resolve_here(handle).unwrap();

        let bytes = writer.finish().unwrap();
        assert_eq!(&bytes[4..8], &[10, 0, 0, 0]);
    }

    #[test]
    fn labels_resolve_late() {
        let mut writer = OffsetWriter::new(Endian::Big);
        let base = writer.new_label("pool");
        let target = writer.new_label("entry");

        writer.reserve_label(target, OffsetBase::Label(base)).unwrap();
        assert_eq!(writer.unresolved(), 1);

        writer.place_label(base).unwrap();
        writer.write_bytes(b"abc\0").unwrap();
        writer.place_label(target).unwrap();

        assert_eq!(writer.unresolved(), 0);
        assert_eq!(writer.label_position(target), Some(8));
        let bytes = writer.finish().unwrap();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 4]);
    }

    #[test]
    fn unresolved_is_fatal() {
        let mut writer = OffsetWriter::new(Endian::Big);
        writer.reserve(OffsetBase::File, "texture data").unwrap();
        match writer.finish() {
            Err(Error::UnresolvedPatch { position, target }) => {
                assert_eq!(position, 0);
                assert_eq!(target, "texture data");
            }
            other => panic!("expected an unresolved patch, got {other:?}"),
        }
    }

    #[test]
    fn unplaced_label_is_fatal() {
        let mut writer = OffsetWriter::new(Endian::Big);
        let label = writer.new_label("never placed");
        writer.reserve_label(label, OffsetBase::File).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(Error::UnresolvedPatch { .. })
        ));
    }

    #[test]
    fn fill_value() {
        let mut writer = OffsetWriter::new(Endian::Little);
        let count = writer.reserve(OffsetBase::File, "count").unwrap();
        writer.write_bytes(&[0; 12]).unwrap();
        writer.fill(count, 3).unwrap();

        assert_eq!(writer.unresolved(), 0);
        assert_eq!(&writer.finish().unwrap()[0..4], &[3, 0, 0, 0]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already written")]
    fn slots_are_written_once() {
        let mut writer = OffsetWriter::new(Endian::Big);
        let handle = writer.reserve(OffsetBase::File, "data").unwrap();
        writer.resolve_here(handle).unwrap();
        let _ = writer.resolve(handle, 0);
    }

    #[test]
    fn negative_offset() {
        let mut writer = OffsetWriter::new(Endian::Big);
        writer.write_u32(0).unwrap();
        let here = writer.position();
        let handle = writer.reserve(OffsetBase::Position(here), "back").unwrap();
        assert!(matches!(
            writer.resolve(handle, 0),
            Err(Error::OffsetOutOfRange { value: -4, .. })
        ));
    }
}
