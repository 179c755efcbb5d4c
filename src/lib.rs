// SPDX-FileCopyrightText: 2023 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reading and writing HSF model containers, and the compressed PAC archives they are usually shipped in.
//!
//! Everything here decodes untrusted data, so malformed input is always reported as an [`error::Error`] and never
//! panics or reads out of bounds.

/// Represents a continuous block of memory which is not owned, and comes either from an in-memory location or from a file.
pub type ByteSpan<'a> = &'a [u8];

/// Represents a continuous block of memory which is owned.
pub type ByteBuffer = Vec<u8>;

#[macro_use]
mod macros;

/// Common structures used by other modules.
pub mod common;

/// The error type shared by every decoder and encoder.
pub mod error;

/// Options for decoding untrusted files.
pub mod options;

/// Bounds-checked readers and writers with a switchable byte order.
pub mod cursor;

/// The block codecs used by archives: LZSS, slide LZ, RLE, DS LZ77 and zlib.
pub mod compression;

/// Name tables, both for reading (by offset) and writing (interned by value).
pub mod string_heap;

/// Deferred offset patching for writers.
pub mod offset_table;

/// Tagged, length-prefixed chunks and the traits sections implement.
pub mod section;

/// Reading and writing HSF model containers.
pub mod hsf;

/// Reading and writing PAC archives.
pub mod pac;

pub use error::{Error, Result};
pub use hsf::{decode_container, encode_container, SectionGraph};

use common::Platform;

/// A file that can be read from a buffer.
pub trait ReadableFile: Sized {
    /// Decodes `buffer`, using `platform` to pick the byte order.
    fn from_existing(platform: Platform, buffer: ByteSpan) -> Result<Self>;
}

/// A file that can be written to a buffer.
pub trait WritableFile {
    fn write_to_buffer(&self, platform: Platform) -> Result<ByteBuffer>;
}

/// A tiny xorshift generator, so failures in the fuzz-style tests are reproducible.
#[cfg(test)]
fn test_rng(seed: u64) -> impl FnMut() -> u64 {
    let mut state = seed.max(1);
    move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    }
}

/// Feeds random garbage into `T` on every platform, which must never panic.
#[cfg(test)]
fn pass_random_invalid<T: ReadableFile>() {
    pass_random_invalid_with_prefix::<T>(&[]);
}

/// Like [`pass_random_invalid`], but every buffer starts with `prefix` so it gets past the magic.
#[cfg(test)]
fn pass_random_invalid_with_prefix<T: ReadableFile>(prefix: &[u8]) {
    const PLATFORMS: [Platform; 2] = [Platform::Wii, Platform::Ds];

    let mut next = test_rng(0x2545_F491_4F6C_DD1D);
    for _ in 0..256 {
        let len = (next() % 512) as usize;
        let mut buffer = prefix.to_vec();
        buffer.extend((0..len).map(|_| next() as u8));
        for platform in PLATFORMS {
            let _ = T::from_existing(platform, &buffer);
        }
    }
}
