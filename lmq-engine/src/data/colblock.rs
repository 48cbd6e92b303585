//! Vertical scratch block: one word vector per column. The shape that
//! makes column moves in column-joins free.

use super::arena::ByteArena;
use super::block::next_block_id;
use super::field::{DataField, FieldMut};
use super::row::{ColumnIterator, DataRow, RowIterator};

pub struct ColumnBlock {
    id: u32,
    size: usize,
    col_size: Vec<u32>,
    cols: Vec<Vec<u64>>,
    arena: ByteArena,
}

impl ColumnBlock {
    pub fn new(rows: usize, col_size: Vec<u32>) -> Self {
        let cols = col_size
            .iter()
            .map(|&w| vec![0u64; rows * w as usize])
            .collect();
        Self {
            id: next_block_id(),
            size: rows,
            col_size,
            cols,
            arena: ByteArena::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size as u64
    }

    pub fn col_size(&self) -> &[u32] {
        &self.col_size
    }

    pub fn inc(&mut self, rows_to_add: usize) {
        self.size += rows_to_add;
        for (col, &w) in self.cols.iter_mut().zip(self.col_size.iter()) {
            col.resize(self.size * w as usize, 0);
        }
    }

    pub fn compact(&mut self, new_size: usize) {
        debug_assert!(new_size <= self.size);
        self.size = new_size;
        for (col, &w) in self.cols.iter_mut().zip(self.col_size.iter()) {
            col.truncate(new_size * w as usize);
        }
    }

    pub(crate) fn field_at(&self, col: usize, row: usize) -> DataField<'_> {
        let w = self.col_size[col] as usize;
        DataField::new(&self.cols[col][row * w..row * w + w])
    }

    pub(crate) fn field_mut_at(&mut self, col: usize, row: usize) -> FieldMut<'_> {
        let w = self.col_size[col] as usize;
        FieldMut::new(
            &mut self.cols[col][row * w..row * w + w],
            Some(&self.arena),
        )
    }

    /// Move columns out of `other` into this block, per `(from, to)`
    /// instructions. `other`'s arena is absorbed so any byte-array
    /// descriptors in the moved columns stay valid.
    pub fn merge(&mut self, other: &mut ColumnBlock, instructions: &[(u8, u8)]) {
        self.size = self.size.max(other.size);
        for &(from, to) in instructions {
            self.cols[to as usize] = std::mem::take(&mut other.cols[from as usize]);
        }
        self.arena.absorb(&other.arena);
        other.cols.clear();
        other.size = 0;
    }

    /// Column-by-column copy from a block that cannot be consumed.
    pub fn copy_columns(&mut self, other: &ColumnBlock, instructions: &[(u8, u8)]) {
        self.size = self.size.max(other.size);
        for &(from, to) in instructions {
            let from = from as usize;
            let to = to as usize;
            if self.col_size[to] == 2 {
                for row in 0..other.size {
                    let field = other.field_at(from, row);
                    self.field_mut_at(to, row).set_field(field);
                }
            } else {
                self.cols[to] = other.cols[from].clone();
            }
        }
    }

    pub fn rows(&self) -> ColumnRowIter<'_> {
        ColumnRowIter {
            view: ColumnRowView {
                block: self,
                index: -1,
            },
        }
    }

    pub fn col(&self, col_index: usize) -> VerticalColumnIter<'_> {
        VerticalColumnIter {
            words: &self.cols[col_index],
            width: self.col_size[col_index] as u8,
            index: -1,
        }
    }
}

pub struct ColumnRowView<'a> {
    block: &'a ColumnBlock,
    index: i64,
}

impl DataRow for ColumnRowView<'_> {
    fn num_fields(&self) -> usize {
        self.block.col_size.len()
    }

    fn field(&self, i: usize) -> DataField<'_> {
        self.block.field_at(i, self.index as usize)
    }
}

pub struct ColumnRowIter<'a> {
    view: ColumnRowView<'a>,
}

impl RowIterator for ColumnRowIter<'_> {
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

pub struct VerticalColumnIter<'a> {
    words: &'a [u64],
    width: u8,
    index: i64,
}

impl ColumnIterator for VerticalColumnIter<'_> {
    fn field(&mut self, idx: u64) -> DataField<'_> {
        self.index = idx as i64;
        let start = idx as usize * self.width as usize;
        DataField::new(&self.words[start..start + self.width as usize])
    }

    fn next_field(&mut self) -> Option<DataField<'_>> {
        let next = (self.index + 1) as u64;
        if (next as usize) * (self.width as usize) < self.words.len() {
            Some(self.field(next))
        } else {
            None
        }
    }

    fn pos(&self) -> u64 {
        self.index as u64
    }
}
