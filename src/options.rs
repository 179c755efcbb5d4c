// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

/// Knobs for decoding untrusted files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail on section tags we don't recognize, instead of skipping them.
    pub strict_sections: bool,
    /// Upper bound for a single decompressed block, in bytes.
    pub max_decompressed_size: usize,
}

impl DecodeOptions {
    pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

    /// Options that reject anything unexpected.
    pub fn strict() -> Self {
        Self {
            strict_sections: true,
            ..Self::default()
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_sections: false,
            max_decompressed_size: Self::DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}
