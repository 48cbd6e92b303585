//! Per-column dictionaries decoded from dictionary pages.
//!
//! Row values in encoded pages are ordinals into the dictionary. The
//! files this engine targets write their dictionaries sorted ascending,
//! which is what makes ordinal-space predicate evaluation and
//! `lookup` work; `list` only needs the values to be distinct.

use lmq_core::errors::{Error, Result};
use parquet::basic::Type as PhysicalType;

use crate::data::DataField;
use crate::encoding;

/// A value type a dictionary page can decode to. `WIDTH` is the number
/// of 64-bit words the value occupies in a row.
pub trait DictValue: Clone + PartialEq + PartialOrd + Send + Sync + 'static {
    const WIDTH: u32;

    fn accepts(physical: PhysicalType) -> bool;

    fn decode_plain(buf: &[u8], count: usize) -> Result<Vec<Self>>;

    /// Read an owned value back out of a decoded field view.
    fn from_field(field: &DataField<'_>) -> Self;
}

impl DictValue for i32 {
    const WIDTH: u32 = 1;

    fn accepts(physical: PhysicalType) -> bool {
        physical == PhysicalType::INT32
    }

    fn decode_plain(buf: &[u8], count: usize) -> Result<Vec<Self>> {
        encoding::decode_plain_i32(buf, count)
    }

    fn from_field(field: &DataField<'_>) -> Self {
        field.as_int()
    }
}

impl DictValue for i64 {
    const WIDTH: u32 = 1;

    fn accepts(physical: PhysicalType) -> bool {
        physical == PhysicalType::INT64
    }

    fn decode_plain(buf: &[u8], count: usize) -> Result<Vec<Self>> {
        encoding::decode_plain_i64(buf, count)
    }

    fn from_field(field: &DataField<'_>) -> Self {
        field.as_long()
    }
}

impl DictValue for f64 {
    const WIDTH: u32 = 1;

    fn accepts(physical: PhysicalType) -> bool {
        matches!(physical, PhysicalType::DOUBLE | PhysicalType::FLOAT)
    }

    fn decode_plain(buf: &[u8], count: usize) -> Result<Vec<Self>> {
        encoding::decode_plain_f64(buf, count)
    }

    fn from_field(field: &DataField<'_>) -> Self {
        field.as_double()
    }
}

/// Variable-length byte arrays (strings, dates).
impl DictValue for Box<[u8]> {
    const WIDTH: u32 = 2;

    fn accepts(physical: PhysicalType) -> bool {
        physical == PhysicalType::BYTE_ARRAY
    }

    fn decode_plain(buf: &[u8], count: usize) -> Result<Vec<Self>> {
        encoding::decode_plain_byte_arrays(buf, count)
    }

    fn from_field(field: &DataField<'_>) -> Self {
        field.as_bytes().into()
    }
}

/// Immutable array of the distinct values of one column chunk.
pub struct Dictionary<T: DictValue> {
    values: Vec<T>,
}

impl<T: DictValue> Dictionary<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    /// Decode a PLAIN dictionary page payload.
    pub fn from_page(buf: &[u8], num_values: usize, physical: PhysicalType) -> Result<Self> {
        if !T::accepts(physical) {
            return Err(Error::SchemaMismatch(format!(
                "dictionary value type does not accept physical type {}",
                physical
            )));
        }
        Ok(Self {
            values: T::decode_plain(buf, num_values)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn value(&self, ordinal: usize) -> &T {
        &self.values[ordinal]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Binary search for `key`. Returns the matching ordinal, or
    /// `-(insertion_point) - 1` when absent; the sign bit tells a miss
    /// apart and `!result` recovers the insertion point.
    pub fn lookup(&self, key: &T) -> i32 {
        let mut low: i64 = 0;
        let mut high: i64 = self.values.len() as i64 - 1;
        while low <= high {
            let mid = (low + high) >> 1;
            let entry = &self.values[mid as usize];
            if entry < key {
                low = mid + 1;
            } else if entry > key {
                high = mid - 1;
            } else {
                return mid as i32;
            }
        }
        -(low as i32 + 1)
    }

    /// Ordinals whose value satisfies `pred`, ascending.
    pub fn list(&self, pred: impl Fn(&T) -> bool) -> Vec<u32> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| pred(v))
            .map(|(i, _)| i as u32)
            .collect()
    }
}
