//! Dense row-major scratch block: one flat word vector, rows appended
//! by operators and grown in place.

use crate::bitmap::Bitmap;

use super::arena::ByteArena;
use super::block::next_block_id;
use super::field::DataField;
use super::layout::{col_offset, width_of};
use super::row::{ColumnIterator, DataRow, DataRowMut, RowIterator};

pub struct RowBlock {
    id: u32,
    size: usize,
    row_size: u32,
    col_offset: Vec<u32>,
    content: Vec<u64>,
    arena: ByteArena,
}

impl RowBlock {
    pub fn new(rows: usize, col_offset: Vec<u32>) -> Self {
        let row_size = width_of(&col_offset);
        Self {
            id: next_block_id(),
            size: rows,
            row_size,
            col_offset,
            content: vec![0u64; rows * row_size as usize],
            arena: ByteArena::new(),
        }
    }

    pub fn with_fields(rows: usize, num_fields: usize) -> Self {
        Self::new(rows, col_offset(num_fields).to_vec())
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size as u64
    }

    pub fn col_offset(&self) -> &[u32] {
        &self.col_offset
    }

    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Grow by `rows_to_add` zeroed rows.
    pub fn inc(&mut self, rows_to_add: usize) {
        self.size += rows_to_add;
        self.content.resize(self.size * self.row_size as usize, 0);
    }

    /// Truncate to `new_size` rows.
    pub fn compact(&mut self, new_size: usize) {
        debug_assert!(new_size <= self.size);
        self.size = new_size;
        self.content.truncate(new_size * self.row_size as usize);
    }

    #[inline]
    pub(crate) fn row_words(&self, idx: usize) -> &[u64] {
        let start = idx * self.row_size as usize;
        &self.content[start..start + self.row_size as usize]
    }

    pub(crate) fn row_parts_mut(&mut self, idx: usize) -> (&mut [u64], &[u32], &ByteArena) {
        let start = idx * self.row_size as usize;
        let words = &mut self.content[start..start + self.row_size as usize];
        (words, &self.col_offset, &self.arena)
    }

    pub(crate) fn row_mut(&mut self, idx: usize) -> RowWordsMut<'_> {
        let (words, offset, arena) = self.row_parts_mut(idx);
        RowWordsMut {
            words,
            offset,
            arena,
        }
    }

    fn has_var_cols(&self) -> bool {
        self.col_offset.windows(2).any(|w| w[1] - w[0] > 1)
    }

    /// Dense copy of the surviving rows.
    pub(crate) fn masked_copy(&self, mask: &Bitmap) -> RowBlock {
        let mut out = RowBlock::new(mask.cardinality() as usize, self.col_offset.clone());
        if self.has_var_cols() {
            let mut iter = self.rows();
            for (target, source) in mask.iter().enumerate() {
                let row = iter.row(source);
                let (words, offset, arena) = out.row_parts_mut(target);
                let mut view = RowWordsMut {
                    words,
                    offset,
                    arena,
                };
                view.set_row(row);
            }
        } else {
            let width = self.row_size as usize;
            for (target, source) in mask.iter().enumerate() {
                let from = source as usize * width;
                out.content[target * width..(target + 1) * width]
                    .copy_from_slice(&self.content[from..from + width]);
            }
        }
        out
    }

    pub fn rows(&self) -> MemRowIter<'_> {
        MemRowIter {
            view: MemRowView {
                block: self,
                index: -1,
            },
        }
    }

    pub fn col(&self, col_index: usize) -> MemColumnIter<'_> {
        MemColumnIter {
            block: self,
            offset: self.col_offset[col_index],
            width: (self.col_offset[col_index + 1] - self.col_offset[col_index]) as u8,
            index: -1,
        }
    }
}

/// Write view over one row's words, used by the mutable row API.
pub(crate) struct RowWordsMut<'a> {
    pub(crate) words: &'a mut [u64],
    pub(crate) offset: &'a [u32],
    pub(crate) arena: &'a ByteArena,
}

impl DataRow for RowWordsMut<'_> {
    fn num_fields(&self) -> usize {
        self.offset.len() - 1
    }

    fn field(&self, i: usize) -> DataField<'_> {
        DataField::new(&self.words[self.offset[i] as usize..self.offset[i + 1] as usize])
    }

    fn raw_words(&self) -> Option<&[u64]> {
        Some(self.words)
    }
}

impl DataRowMut for RowWordsMut<'_> {
    fn field_mut(&mut self, i: usize) -> super::field::FieldMut<'_> {
        super::field::FieldMut::new(
            &mut self.words[self.offset[i] as usize..self.offset[i + 1] as usize],
            Some(self.arena),
        )
    }

    fn raw_words_mut(&mut self) -> Option<&mut [u64]> {
        Some(self.words)
    }
}

pub struct MemRowView<'a> {
    block: &'a RowBlock,
    index: i64,
}

impl DataRow for MemRowView<'_> {
    fn num_fields(&self) -> usize {
        self.block.col_offset.len() - 1
    }

    fn field(&self, i: usize) -> DataField<'_> {
        let words = self.block.row_words(self.index as usize);
        DataField::new(
            &words[self.block.col_offset[i] as usize..self.block.col_offset[i + 1] as usize],
        )
    }

    fn raw_words(&self) -> Option<&[u64]> {
        Some(self.block.row_words(self.index as usize))
    }
}

pub struct MemRowIter<'a> {
    view: MemRowView<'a>,
}

impl RowIterator for MemRowIter<'_> {
    fn row(&mut self, idx: u64) -> &dyn DataRow {
        self.view.index = idx as i64;
        &self.view
    }

    fn next_row(&mut self) -> Option<&dyn DataRow> {
        self.view.index += 1;
        if (self.view.index as usize) < self.view.block.size {
            Some(&self.view)
        } else {
            None
        }
    }

    fn pos(&self) -> u64 {
        self.view.index as u64
    }
}

pub struct MemColumnIter<'a> {
    block: &'a RowBlock,
    offset: u32,
    width: u8,
    index: i64,
}

impl ColumnIterator for MemColumnIter<'_> {
    fn field(&mut self, idx: u64) -> DataField<'_> {
        self.index = idx as i64;
        let start = idx as usize * self.block.row_size as usize + self.offset as usize;
        DataField::new(&self.block.content[start..start + self.width as usize])
    }

    fn next_field(&mut self) -> Option<DataField<'_>> {
        let next = (self.index + 1) as u64;
        if next < self.block.size as u64 {
            Some(self.field(next))
        } else {
            None
        }
    }

    fn pos(&self) -> u64 {
        self.index as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::layout::offsets_of;

    #[test]
    fn test_fill_and_read() {
        let mut block = RowBlock::with_fields(3, 2);
        for i in 0..3usize {
            let (words, offset, arena) = block.row_parts_mut(i);
            let mut row = RowWordsMut {
                words,
                offset,
                arena,
            };
            row.field_mut(0).set_int(i as i32 * 10);
            row.field_mut(1).set_int(i as i32);
        }
        let mut rows = block.rows();
        assert_eq!(rows.row(2).field(0).as_int(), 20);
        let mut col = block.col(1);
        assert_eq!(col.field(1).as_int(), 1);
        let mut seen = 0;
        let mut iter = block.col(0);
        while let Some(f) = iter.next_field() {
            assert_eq!(f.as_int(), seen * 10);
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_masked_copy_with_strings() {
        let mut block = RowBlock::new(4, offsets_of(&[1, 2]));
        for i in 0..4usize {
            let (words, offset, arena) = block.row_parts_mut(i);
            let mut row = RowWordsMut {
                words,
                offset,
                arena,
            };
            row.field_mut(0).set_int(i as i32);
            row.field_mut(1).set_bytes(format!("row-{}", i).as_bytes());
        }
        let mask = Bitmap::from_indices(4, &[1, 3]);
        let dense = block.masked_copy(&mask);
        drop(block);
        assert_eq!(dense.size(), 2);
        let mut rows = dense.rows();
        assert_eq!(rows.row(0).field(0).as_int(), 1);
        assert_eq!(rows.row(0).field(1).as_bytes(), b"row-1");
        assert_eq!(rows.row(1).field(1).as_bytes(), b"row-3");
    }

    #[test]
    fn test_grow_and_compact() {
        let mut block = RowBlock::with_fields(0, 3);
        block.inc(5);
        assert_eq!(block.size(), 5);
        block.compact(2);
        assert_eq!(block.size(), 2);
        assert_eq!(block.content.len(), 6);
    }
}
