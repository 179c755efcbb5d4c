// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::binrw;

use crate::hsf::record::named_record;
use crate::string_heap::Name;

#[binrw]
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// A node in the object tree. Indices point into the other sections, and -1 means none.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectRecord {
    #[br(map = |offset: u32| Name::Pending(offset))]
    #[bw(ignore)]
    pub name: Name,
    pub object_type: u32,
    /// Index of the parent object.
    pub parent: i32,
    pub transform: Transform,
    pub position: i32,
    pub normal: i32,
    pub color: i32,
    pub texcoord: i32,
    pub material: i32,
    pub cenv: i32,
    pub unknown: [u8; 8],
}

named_record!(ObjectRecord, 80);

impl ObjectRecord {
    pub fn parent_index(&self) -> Option<usize> {
        usize::try_from(self.parent).ok()
    }

    pub fn material_index(&self) -> Option<usize> {
        usize::try_from(self.material).ok()
    }
}

/// Groups the faces of a part that share a material.
#[binrw]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterRecord {
    #[br(map = |offset: u32| Name::Pending(offset))]
    #[bw(ignore)]
    pub name: Name,
    pub part: i32,
    pub kind: u32,
    pub weight: f32,
    pub unknown: [u8; 4],
}

named_record!(ClusterRecord, 20);
