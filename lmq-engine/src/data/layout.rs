//! Column layouts: a layout is a non-decreasing word-offset vector of
//! length `num_fields + 1`; `offset[i + 1] - offset[i]` is the word
//! width of column `i` (1 for int/float/double, 2 for byte arrays).

use lazy_static::lazy_static;

/// Widest all-single-word preset layout.
pub const MAX_PRESET_FIELDS: usize = 9;

lazy_static! {
    static ref OFFSETS: [Vec<u32>; MAX_PRESET_FIELDS + 1] =
        std::array::from_fn(|n| (0..=n as u32).collect());
    static ref SIZES: [Vec<u32>; MAX_PRESET_FIELDS + 1] = std::array::from_fn(|n| vec![1u32; n]);
}

/// The canonical all-single-word offset layout for `num_fields` columns.
pub fn col_offset(num_fields: usize) -> &'static [u32] {
    &OFFSETS[num_fields]
}

/// The canonical all-single-word size vector for `num_fields` columns.
pub fn col_size(num_fields: usize) -> &'static [u32] {
    &SIZES[num_fields]
}

/// Offsets of an explicit per-column size vector.
pub fn offsets_of(col_size: &[u32]) -> Vec<u32> {
    let mut offsets = Vec::with_capacity(col_size.len() + 1);
    offsets.push(0);
    for &size in col_size {
        offsets.push(offsets.last().unwrap() + size);
    }
    offsets
}

/// Total words per row under a layout.
pub fn width_of(offset: &[u32]) -> u32 {
    *offset.last().unwrap()
}
