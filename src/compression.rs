// SPDX-FileCopyrightText: 2023 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use tracing::trace;

use crate::ByteBuffer;
use crate::error::{Error, Result};
use crate::options::DecodeOptions;

/// Never reserve more than this up front, the declared size comes from the file.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// The codec used for a block, selected by the tag stored next to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// Stored as-is.
    None,
    /// LZSS with a 1024 byte ring window.
    Lzss,
    /// "Slide" LZ with 32-bit code words and nibble lengths. Tags 2, 3 and 4 all decode the same way.
    Slide,
    /// Run-length encoding.
    Rle,
    /// The ring LZ used by DS files.
    Lz77,
    /// A zlib stream.
    Inflate,
}

impl CompressionType {
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lzss),
            2..=4 => Ok(CompressionType::Slide),
            5 => Ok(CompressionType::Rle),
            6 => Ok(CompressionType::Lz77),
            7 => Ok(CompressionType::Inflate),
            tag => Err(Error::UnsupportedCompression(tag)),
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            CompressionType::None => 0,
            CompressionType::Lzss => 1,
            CompressionType::Slide => 2,
            CompressionType::Rle => 5,
            CompressionType::Lz77 => 6,
            CompressionType::Inflate => 7,
        }
    }

    /// Whether [`compress`] can produce data for this codec.
    pub fn supports_compress(self) -> bool {
        matches!(self, CompressionType::None | CompressionType::Inflate)
    }
}

/// Decodes `input` into exactly `size` bytes.
pub fn decompress(kind: CompressionType, input: &[u8], size: usize) -> Result<ByteBuffer> {
    trace!(?kind, compressed = input.len(), size, "Decompressing block");

    match kind {
        CompressionType::None => stored(input, size),
        CompressionType::Lzss => decode_lzss(input, size),
        CompressionType::Slide => decode_slide(input, size),
        CompressionType::Rle => decode_rle(input, size),
        CompressionType::Lz77 => decode_lz77(input, size),
        CompressionType::Inflate => zlib::inflate_exact(input, size),
    }
}

/// Like [`decompress`], but selecting the codec from a raw tag and enforcing the size limit in `options`.
pub fn decompress_tagged(
    tag: u32,
    input: &[u8],
    size: usize,
    options: &DecodeOptions,
) -> Result<ByteBuffer> {
    let kind = CompressionType::from_tag(tag)?;
    if size > options.max_decompressed_size {
        return Err(Error::DecompressedTooLarge {
            size,
            limit: options.max_decompressed_size,
        });
    }
    decompress(kind, input, size)
}

/// Encodes `input`. Only the stored and zlib codecs can be written.
pub fn compress(kind: CompressionType, input: &[u8]) -> Result<ByteBuffer> {
    match kind {
        CompressionType::None => Ok(input.to_vec()),
        CompressionType::Inflate => zlib::deflate_all(input),
        kind => Err(Error::CompressNotImplemented(kind)),
    }
}

/// Bounds checked view over the compressed bytes.
struct Input<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(Error::TruncatedInput {
            offset: self.pos as u64,
            needed: 1,
            available: 0,
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn next_u32_be(&mut self) -> Result<u32> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or(Error::TruncatedInput {
                offset: self.pos as u64,
                needed: 4,
                available: self.data.len().saturating_sub(self.pos) as u64,
            })?;
        self.pos += 4;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

fn output_buffer(size: usize) -> ByteBuffer {
    Vec::with_capacity(size.min(MAX_PREALLOCATION))
}

fn stored(input: &[u8], size: usize) -> Result<ByteBuffer> {
    match input.get(..size) {
        Some(data) => Ok(data.to_vec()),
        None => Err(Error::TruncatedInput {
            offset: 0,
            needed: size as u64,
            available: input.len() as u64,
        }),
    }
}

fn decode_lzss(input: &[u8], size: usize) -> Result<ByteBuffer> {
    const WINDOW_SIZE: usize = 1024;
    const WINDOW_START: usize = 0x3BE;

    let mut src = Input::new(input);
    let mut out = output_buffer(size);
    let mut window = [0u8; WINDOW_SIZE];
    let mut window_pos = WINDOW_START;

    // the high byte keeps track of how many flag bits are left
    let mut flags: u16 = 0;

    while out.len() < size {
        flags >>= 1;
        if flags & 0x100 == 0 {
            flags = 0xFF00 | src.next()? as u16;
        }

        if flags & 1 != 0 {
            let byte = src.next()?;
            out.push(byte);
            window[window_pos] = byte;
            window_pos = (window_pos + 1) % WINDOW_SIZE;
        } else {
            let low = src.next()? as usize;
            let high = src.next()? as usize;
            let offset = low | ((high & 0xC0) << 2);
            let length = (high & 0x3F) + 3;

            for i in 0..length {
                if out.len() == size {
                    break;
                }
                // may read a byte written earlier in this same match
                let byte = window[(offset + i) % WINDOW_SIZE];
                out.push(byte);
                window[window_pos] = byte;
                window_pos = (window_pos + 1) % WINDOW_SIZE;
            }
        }
    }

    Ok(out)
}

fn decode_slide(input: &[u8], size: usize) -> Result<ByteBuffer> {
    let mut src = Input::new(input);
    let mut out = output_buffer(size);

    let mut code: u32 = 0;
    let mut code_bits = 0;

    while out.len() < size {
        if code_bits == 0 {
            code = src.next_u32_be()?;
            code_bits = 32;
        }

        if code & 0x8000_0000 != 0 {
            out.push(src.next()?);
        } else {
            let first = src.next()? as usize;
            let second = src.next()? as usize;
            let distance = (((first & 0x0F) << 8) | second) + 1;
            let length = match first >> 4 {
                0 => src.next()? as usize + 18,
                nibble => nibble + 2,
            };

            for _ in 0..length {
                if out.len() == size {
                    break;
                }
                // references before the start of the output read as zero
                let byte = match out.len().checked_sub(distance) {
                    Some(index) => out[index],
                    None => 0,
                };
                out.push(byte);
            }
        }

        code <<= 1;
        code_bits -= 1;
    }

    Ok(out)
}

fn decode_rle(input: &[u8], size: usize) -> Result<ByteBuffer> {
    let mut src = Input::new(input);
    let mut out = output_buffer(size);

    while out.len() < size {
        let control = src.next()?;
        let count = (control & 0x7F) as usize;

        if control & 0x80 != 0 {
            for _ in 0..count {
                if out.len() == size {
                    break;
                }
                out.push(src.next()?);
            }
        } else {
            let byte = src.next()?;
            let count = count.min(size - out.len());
            out.resize(out.len() + count, byte);
        }
    }

    Ok(out)
}

fn decode_lz77(input: &[u8], size: usize) -> Result<ByteBuffer> {
    let mut src = Input::new(input);
    let mut out = output_buffer(size);

    while out.len() < size {
        let flags = src.next()?;

        for bit in (0..8).rev() {
            if out.len() == size {
                break;
            }

            if flags & (1 << bit) != 0 {
                out.push(src.next()?);
                continue;
            }

            let high = src.next()? as usize;
            let low = src.next()? as usize;
            let word = (high << 8) | low;
            let length = (word >> 12) + 3;
            let distance = (word & 0xFFF) + 1;

            let start = out.len().checked_sub(distance).ok_or_else(|| {
                Error::CorruptInput(format!(
                    "back-reference {distance} bytes behind output position {}",
                    out.len()
                ))
            })?;

            // the source range may overlap what this copy is producing
            for i in 0..length {
                if out.len() == size {
                    break;
                }
                let byte = out[start + i];
                out.push(byte);
            }
        }
    }

    Ok(out)
}

mod zlib {
    use std::ptr::null_mut;

    use libz_rs_sys::*;

    use crate::ByteBuffer;
    use crate::error::{Error, Result};

    fn new_stream() -> z_stream {
        z_stream {
            next_in: null_mut(),
            avail_in: 0,
            total_in: 0,
            next_out: null_mut(),
            avail_out: 0,
            total_out: 0,
            msg: null_mut(),
            state: null_mut(),
            zalloc: None, // the default alloc is fine
            zfree: None,  // the default free is fine
            opaque: null_mut(),
            data_type: 0,
            adler: 0,
            reserved: 0,
        }
    }

    /// Output is grown in steps of this size, so a huge declared size costs nothing until data arrives.
    const INFLATE_STEP: usize = 256 * 1024;

    /// Inflates a zlib stream that must decode to exactly `size` bytes.
    pub(super) fn inflate_exact(in_data: &[u8], size: usize) -> Result<ByteBuffer> {
        // one spare byte tells us when the stream is longer than declared
        let limit = size.checked_add(1).ok_or_else(|| {
            Error::CorruptInput(format!("declared size {size} cannot be inflated"))
        })?;
        let avail_in = u32::try_from(in_data.len()).map_err(|_| {
            Error::CorruptInput(format!("zlib stream of {} bytes is too long", in_data.len()))
        })?;

        unsafe {
            let mut strm = new_stream();

            let ret = inflateInit2_(
                &mut strm,
                15,
                zlibVersion(),
                core::mem::size_of::<z_stream>() as i32,
            );
            if ret != Z_OK {
                return Err(Error::CorruptInput(format!("inflateInit2 failed with {ret}")));
            }

            strm.next_in = in_data.as_ptr() as *mut u8;
            strm.avail_in = avail_in;

            let result = inflate_steps(&mut strm, size, limit);
            inflateEnd(&mut strm);
            result
        }
    }

    unsafe fn inflate_steps(strm: &mut z_stream, size: usize, limit: usize) -> Result<ByteBuffer> {
        let mut out_data = super::output_buffer(size);

        loop {
            let start = out_data.len();
            if start == limit {
                return Err(Error::CorruptInput(format!(
                    "zlib stream is longer than the declared {size} bytes"
                )));
            }

            let step = (limit - start).min(INFLATE_STEP);
            out_data.resize(start + step, 0);
            strm.next_out = out_data.as_mut_ptr().add(start);
            strm.avail_out = step as u32;

            let ret = inflate(strm, Z_NO_FLUSH);
            out_data.truncate(start + step - strm.avail_out as usize);

            match ret {
                Z_STREAM_END => break,
                Z_OK => {}
                Z_BUF_ERROR if strm.avail_in == 0 => {
                    return Err(Error::TruncatedInput {
                        offset: strm.total_in as u64,
                        needed: 1,
                        available: 0,
                    });
                }
                ret => {
                    return Err(Error::CorruptInput(format!(
                        "zlib stream failed after {} bytes (status {ret})",
                        out_data.len()
                    )));
                }
            }
        }

        if out_data.len() != size {
            return Err(Error::CorruptInput(format!(
                "zlib stream produced {} bytes, expected {size}",
                out_data.len()
            )));
        }

        Ok(out_data)
    }

    pub(super) fn deflate_all(in_data: &[u8]) -> Result<ByteBuffer> {
        unsafe {
            let mut strm = new_stream();

            let ret = deflateInit2_(
                &mut strm,
                Z_DEFAULT_COMPRESSION,
                Z_DEFLATED,
                15,
                8,
                Z_DEFAULT_STRATEGY,
                zlibVersion(),
                core::mem::size_of::<z_stream>() as i32,
            );
            if ret != Z_OK {
                return Err(Error::CorruptInput(format!("deflateInit2 failed with {ret}")));
            }

            let bound = deflateBound(&mut strm, in_data.len() as _) as usize;
            let mut out_data: ByteBuffer = vec![0; bound];

            strm.next_in = in_data.as_ptr() as *mut u8;
            strm.avail_in = in_data.len() as u32;
            strm.next_out = out_data.as_mut_ptr();
            strm.avail_out = out_data.len() as u32;

            let ret = deflate(&mut strm, Z_FINISH);
            let produced = strm.total_out as usize;
            deflateEnd(&mut strm);

            if ret != Z_STREAM_END {
                return Err(Error::CorruptInput(format!("deflate failed with {ret}")));
            }

            out_data.truncate(produced);
            Ok(out_data)
        }
    }
}
