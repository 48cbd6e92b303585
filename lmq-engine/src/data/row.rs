//! Row and column access contracts, and the owned snapshot row.

use std::fmt;

use super::arena::ByteArena;
use super::field::{DataField, FieldMut};
use super::layout::{col_offset, offsets_of, width_of};

/// Read access to one row. Field views returned here stay valid until
/// the backing iterator repositions; copy what must survive.
pub trait DataRow {
    fn num_fields(&self) -> usize;

    /// Decoded view of column `i`.
    fn field(&self, i: usize) -> DataField<'_>;

    /// Undecoded view of column `i`: the dictionary ordinal for
    /// dictionary-encoded sources, identical to `field` elsewhere.
    fn raw_field(&self, i: usize) -> DataField<'_> {
        self.field(i)
    }

    /// The flat word storage of the row, when it is dense row-major.
    fn raw_words(&self) -> Option<&[u64]> {
        None
    }

    /// Deep copy into an owned, layout-free row that survives the
    /// source block.
    fn snapshot(&self) -> MemDataRow
    where
        Self: Sized,
    {
        MemDataRow::snapshot_of(self)
    }
}

/// Write access to one row.
pub trait DataRowMut: DataRow {
    fn field_mut(&mut self, i: usize) -> FieldMut<'_>;

    fn raw_words_mut(&mut self) -> Option<&mut [u64]> {
        None
    }

    /// Whole-row copy, one field at a time, honoring byte ownership.
    fn set_row(&mut self, row: &dyn DataRow) {
        for i in 0..row.num_fields() {
            self.field_mut(i).set_field(row.field(i));
        }
    }
}

/// Iterator over the rows of a block. `pos` reports the underlying row
/// index of the last returned row, which for masked blocks is the
/// position in the unmasked row space.
pub trait RowIterator {
    fn row(&mut self, idx: u64) -> &dyn DataRow;

    fn next_row(&mut self) -> Option<&dyn DataRow>;

    fn pos(&self) -> u64;
}

/// Iterator over one column of a block.
pub trait ColumnIterator {
    /// Decoded field at row `idx`.
    fn field(&mut self, idx: u64) -> DataField<'_>;

    /// Next live field, or `None` past the end.
    fn next_field(&mut self) -> Option<DataField<'_>>;

    /// Undecoded (dictionary-ordinal) field at row `idx`.
    fn raw(&mut self, idx: u64) -> DataField<'_> {
        self.field(idx)
    }

    /// Underlying row index of the last returned field.
    fn pos(&self) -> u64;
}

/// An owned row: flat word vector plus explicit layout, with a private
/// arena for byte-array fields. The snapshot type of the engine.
pub struct MemDataRow {
    data: Vec<u64>,
    offset: Vec<u32>,
    arena: ByteArena,
}

impl MemDataRow {
    /// All-single-word row of `num_fields` columns.
    pub fn new(num_fields: usize) -> Self {
        Self::with_offsets(col_offset(num_fields).to_vec())
    }

    pub fn with_offsets(offset: Vec<u32>) -> Self {
        debug_assert!(offset.len() >= 1 && offset[0] == 0);
        Self {
            data: vec![0u64; width_of(&offset) as usize],
            offset,
            arena: ByteArena::new(),
        }
    }

    pub fn with_col_size(col_size: &[u32]) -> Self {
        Self::with_offsets(offsets_of(col_size))
    }

    /// Deep copy of an arbitrary row; the layout is derived from the
    /// observed field widths.
    pub fn snapshot_of(row: &dyn DataRow) -> Self {
        let num_fields = row.num_fields();
        let mut offset = Vec::with_capacity(num_fields + 1);
        offset.push(0u32);
        for i in 0..num_fields {
            offset.push(offset[i] + row.field(i).size() as u32);
        }
        let mut out = Self::with_offsets(offset);
        out.set_row(row);
        out
    }

    /// Words per row.
    pub fn width(&self) -> usize {
        self.data.len()
    }

    pub fn offset(&self) -> &[u32] {
        &self.offset
    }
}

impl DataRow for MemDataRow {
    fn num_fields(&self) -> usize {
        self.offset.len() - 1
    }

    fn field(&self, i: usize) -> DataField<'_> {
        let from = self.offset[i] as usize;
        let to = self.offset[i + 1] as usize;
        DataField::new(&self.data[from..to])
    }

    fn raw_words(&self) -> Option<&[u64]> {
        Some(&self.data)
    }
}

impl DataRowMut for MemDataRow {
    fn field_mut(&mut self, i: usize) -> FieldMut<'_> {
        let from = self.offset[i] as usize;
        let to = self.offset[i + 1] as usize;
        FieldMut::new(&mut self.data[from..to], Some(&self.arena))
    }

    fn raw_words_mut(&mut self) -> Option<&mut [u64]> {
        Some(&mut self.data)
    }
}

impl Clone for MemDataRow {
    fn clone(&self) -> Self {
        let mut out = Self::with_offsets(self.offset.clone());
        out.set_row(self);
        out
    }
}

impl PartialEq for MemDataRow {
    fn eq(&self, other: &Self) -> bool {
        if self.offset != other.offset {
            return false;
        }
        (0..self.num_fields()).all(|i| {
            let a = self.field(i);
            let b = other.field(i);
            if a.size() == 2 {
                a.as_bytes() == b.as_bytes()
            } else {
                a.word(0) == b.word(0)
            }
        })
    }
}

impl fmt::Debug for MemDataRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for i in 0..self.num_fields() {
            let field = self.field(i);
            if field.size() == 2 {
                list.entry(&field.as_str());
            } else {
                list.entry(&field.word(0));
            }
        }
        list.finish()
    }
}
