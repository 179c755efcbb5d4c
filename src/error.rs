// SPDX-FileCopyrightText: 2025 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

use crate::compression::CompressionType;
use crate::section::SectionTag;

/// Result type used by every decoder and encoder in this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Fewer bytes are available than a declared count or size requires.
    #[error("truncated input at offset {offset:#x}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        /// Where the read was attempted, relative to the buffer being read.
        offset: u64,
        needed: u64,
        available: u64,
    },
    /// The compression tag of a block is not one we know how to decode.
    #[error("unsupported compression tag {0}")]
    UnsupportedCompression(u32),
    /// Only surfaced when strict section decoding is requested, otherwise these are skipped.
    #[error("unknown section tag {tag} at offset {offset:#x}")]
    UnknownSectionTag { tag: SectionTag, offset: u64 },
    /// The data is internally inconsistent.
    #[error("corrupt input: {0}")]
    CorruptInput(String),
    /// A reserved slot was never given its value.
    #[error("unresolved patch at {position:#x} (waiting on {target})")]
    UnresolvedPatch { position: u64, target: String },
    /// This section kind can be read, but not written.
    #[error("encoding {tag} sections is not implemented")]
    EncodeNotImplemented { tag: SectionTag },
    /// Only decoding is available for this codec.
    #[error("compressing with {0:?} is not implemented")]
    CompressNotImplemented(CompressionType),
    #[error("invalid magic: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },
    #[error("declared decompressed size {size} exceeds the limit of {limit} bytes")]
    DecompressedTooLarge { size: usize, limit: usize },
    /// A resolved offset does not fit the 32-bit slot it was reserved in.
    #[error("offset {value} cannot be stored in the slot at {position:#x}")]
    OffsetOutOfRange { position: u64, value: i64 },
    /// Names are stored null terminated, so they cannot contain a null byte themselves.
    #[error("name {0:?} contains a null byte")]
    InvalidName(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a batch run should give up on this file and carry on with the next one.
    ///
    /// Everything except patching mistakes is caused by the input file.
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            Error::UnresolvedPatch { .. }
                | Error::EncodeNotImplemented { .. }
                | Error::CompressNotImplemented(_)
                | Error::OffsetOutOfRange { .. }
                | Error::InvalidName(_)
        )
    }
}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(err) => Error::Io(err),
            err => Error::CorruptInput(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let error = Error::TruncatedInput {
            offset: 0x10,
            needed: 4,
            available: 2,
        };
        assert_eq!(
            error.to_string(),
            "truncated input at offset 0x10: needed 4 bytes, 2 available"
        );

        let error = Error::UnknownSectionTag {
            tag: SectionTag(*b"ABCD"),
            offset: 0x20,
        };
        assert_eq!(error.to_string(), "unknown section tag ABCD at offset 0x20");
    }

    #[test]
    fn input_errors() {
        assert!(Error::UnsupportedCompression(9).is_input_error());
        assert!(!Error::UnresolvedPatch {
            position: 0,
            target: "string #0".to_string()
        }
        .is_input_error());
    }
}
