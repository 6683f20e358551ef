//! Unpacking of fixed-width integers from bit-packed arrays.
//!
//! Block state indices are stored as `long` arrays. Two layouts exist:
//! before DataVersion 2529 values are packed back to back and may straddle
//! two longs ([`PackedLayout::Spanning`]); from 2529 on every long holds
//! `64 / width` whole values and the leftover high bits are padding
//! ([`PackedLayout::Aligned`]).

use crate::{Error, Result};

/// First DataVersion (20w17a) that stops values from straddling longs.
pub const ALIGNED_DATA_VERSION: i32 = 2529;

const MAX_BIT_WIDTH: u32 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PackedLayout {
    Spanning,
    Aligned,
}

impl PackedLayout {
    pub const fn for_data_version(data_version: i32) -> Self {
        if data_version >= ALIGNED_DATA_VERSION {
            Self::Aligned
        } else {
            Self::Spanning
        }
    }

    /// Number of longs needed to hold `len` values of `bit_width` bits.
    pub const fn expected_long_count(self, bit_width: u32, len: usize) -> usize {
        let bit_width = bit_width as usize;
        match self {
            Self::Spanning => (len * bit_width).div_ceil(64),
            Self::Aligned => len.div_ceil(64 / bit_width),
        }
    }
}

/// Reads `bit_width` bits starting at `bit_offset` from `buf`, treated as a
/// big-endian bit stream addressed from the most significant bit of the first
/// byte.
pub fn extract_bits(buf: &[u8], bit_offset: usize, bit_width: u32) -> Result<u32> {
    if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
        return Err(Error::InvalidBitWidth(bit_width));
    }

    let out_of_range = || Error::BitsOutOfRange {
        offset: bit_offset,
        width: bit_width,
        len: buf.len(),
    };

    let end = bit_offset
        .checked_add(bit_width as usize)
        .ok_or_else(out_of_range)?;

    if end > buf.len() * 8 {
        return Err(out_of_range());
    }

    let first = bit_offset / 8;
    let last = (end - 1) / 8;

    // A value of at most 16 bits touches at most 3 bytes.
    let acc = buf[first..=last]
        .iter()
        .fold(0_u32, |acc, &b| acc << 8 | u32::from(b));

    let shift = (last - first + 1) * 8 - bit_offset % 8 - bit_width as usize;

    Ok((acc >> shift) & ((1 << bit_width) - 1))
}

/// Returns the in-memory byte image of `longs` (little-endian per long)
/// reversed as a whole. Reading this buffer MSB-first with [`extract_bits`]
/// yields the spanning-layout values from last to first.
pub fn longs_to_reversed_bytes(longs: &[i64]) -> Vec<u8> {
    longs.iter().rev().flat_map(|l| l.to_be_bytes()).collect()
}

/// Unpacks `out.len()` values of `bit_width` bits stored in the aligned
/// layout. Value `n` lives in long `n / (64 / w)` at bit `(n % (64 / w)) * w`.
pub fn unpack_aligned(longs: &[i64], bit_width: u32, out: &mut [u16]) -> Result<()> {
    if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
        return Err(Error::InvalidBitWidth(bit_width));
    }

    let per_long = 64 / bit_width as usize;
    let mask = (1_u64 << bit_width) - 1;

    for (n, slot) in out.iter_mut().enumerate() {
        let Some(&word) = longs.get(n / per_long) else {
            return Err(Error::BitsOutOfRange {
                offset: n * bit_width as usize,
                width: bit_width,
                len: longs.len() * 8,
            });
        };

        let shift = (n % per_long) * bit_width as usize;
        *slot = ((word as u64 >> shift) & mask) as u16;
    }

    Ok(())
}
