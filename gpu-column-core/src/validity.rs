//! Validity bitmasks: one bit per row, LSB first, set = valid.

use arrow_buffer::bit_chunk_iterator::UnalignedBitChunk;
use arrow_buffer::bit_util;

/// Number of bytes a bitmask over `rows` rows occupies.
pub fn mask_len(rows: usize) -> usize {
    bit_util::ceil(rows, 8)
}

/// Build a packed bitmask from per-row validity flags.
pub fn build_mask(valid: impl IntoIterator<Item = bool>) -> Vec<u8> {
    let mut mask = Vec::new();
    for (row, is_valid) in valid.into_iter().enumerate() {
        if row % 8 == 0 {
            mask.push(0);
        }
        if is_valid {
            bit_util::set_bit(&mut mask, row);
        }
    }
    mask
}

/// Validity of a column's rows.
///
/// An absent mask means every row is valid; callers query both variants the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityMask<'a> {
    AllValid,
    Bitmap(&'a [u8]),
}

impl<'a> ValidityMask<'a> {
    pub fn from_option(mask: Option<&'a [u8]>) -> Self {
        match mask {
            Some(bits) => ValidityMask::Bitmap(bits),
            None => ValidityMask::AllValid,
        }
    }

    /// Caller guarantees `row` lies within the mask.
    pub fn is_valid(&self, row: usize) -> bool {
        match self {
            ValidityMask::AllValid => true,
            ValidityMask::Bitmap(bits) => bit_util::get_bit(bits, row),
        }
    }

    /// Count of unset bits among the first `rows` rows.
    pub fn null_count(&self, rows: usize) -> usize {
        match self {
            ValidityMask::AllValid => 0,
            ValidityMask::Bitmap(bits) => rows - UnalignedBitChunk::new(bits, 0, rows).count_ones(),
        }
    }

    pub fn bytes(&self) -> Option<&'a [u8]> {
        match self {
            ValidityMask::AllValid => None,
            ValidityMask::Bitmap(bits) => Some(bits),
        }
    }
}
