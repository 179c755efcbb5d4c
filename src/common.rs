// SPDX-FileCopyrightText: 2023 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use binrw::Endian;

/// The console family a file was authored for.
///
/// This mostly decides the byte order, since the same formats show up on both big and little endian hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    /// Nintendo GameCube.
    GameCube,
    /// Nintendo Wii.
    Wii,
    /// Nintendo Wii U.
    WiiU,
    /// Nintendo DS.
    Ds,
    /// Nintendo 3DS.
    ThreeDs,
    /// Nintendo Switch.
    Switch,
}

impl Platform {
    pub fn endianness(&self) -> Endian {
        match self {
            Platform::GameCube | Platform::Wii | Platform::WiiU => Endian::Big,
            Platform::Ds | Platform::ThreeDs | Platform::Switch => Endian::Little,
        }
    }

    /// Returns the shorthand name for this platform. For example, GameCube becomes "gc".
    pub fn short_name(&self) -> &'static str {
        match self {
            Platform::GameCube => "gc",
            Platform::Wii => "wii",
            Platform::WiiU => "wiiu",
            Platform::Ds => "ds",
            Platform::ThreeDs => "3ds",
            Platform::Switch => "nx",
        }
    }
}

/// Rounds `value` up to the next multiple of `alignment`.
pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness() {
        assert_eq!(Platform::GameCube.endianness(), Endian::Big);
        assert_eq!(Platform::Ds.endianness(), Endian::Little);
    }

    #[test]
    fn align() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(32, 32), 32);
        assert_eq!(align_up(33, 32), 64);
        assert_eq!(align_up(7, 1), 7);
    }
}
