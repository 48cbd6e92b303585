//! The tagged block type unifying the storage variants behind one
//! contract: `size`/`limit`, row and column iterators, and masking.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::scan::ParquetBlock;

use super::colblock::ColumnBlock;
use super::encblock::EncodedColumnBlock;
use super::field::{DataField, FieldMut};
use super::masked::MaskedBlock;
use super::row::{ColumnIterator, DataRow, DataRowMut, RowIterator};
use super::rowblock::{RowBlock, RowWordsMut};

static NEXT_BLOCK_ID: AtomicU32 = AtomicU32::new(0);

/// Process-wide id for scratch blocks; file-backed blocks use their
/// row-group index instead.
pub fn next_block_id() -> u32 {
    NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed)
}

pub enum Block {
    Row(RowBlock),
    Col(ColumnBlock),
    Encoded(EncodedColumnBlock),
    Parquet(ParquetBlock),
    Masked(MaskedBlock),
}

impl Block {
    pub fn id(&self) -> u32 {
        match self {
            Block::Row(b) => b.id(),
            Block::Col(b) => b.id(),
            Block::Encoded(b) => b.id(),
            Block::Parquet(b) => b.index() as u32,
            Block::Masked(b) => b.id(),
        }
    }

    /// Number of live rows.
    pub fn size(&self) -> u64 {
        match self {
            Block::Row(b) => b.size(),
            Block::Col(b) => b.size(),
            Block::Encoded(b) => b.size(),
            Block::Parquet(b) => b.size(),
            Block::Masked(b) => b.size(),
        }
    }

    /// Size of the underlying row space; bitmaps over this block are
    /// sized by this, and `limit() >= size()`.
    pub fn limit(&self) -> u64 {
        match self {
            Block::Masked(b) => b.limit(),
            other => other.size(),
        }
    }

    pub fn col(&self, col_index: usize) -> Box<dyn ColumnIterator + '_> {
        match self {
            Block::Row(b) => Box::new(b.col(col_index)),
            Block::Col(b) => Box::new(b.col(col_index)),
            Block::Encoded(b) => Box::new(b.col(col_index)),
            Block::Parquet(b) => Box::new(b.col(col_index)),
            Block::Masked(b) => Box::new(b.col(col_index)),
        }
    }

    pub fn rows(&self) -> Box<dyn RowIterator + '_> {
        match self {
            Block::Row(b) => Box::new(b.rows()),
            Block::Col(b) => Box::new(b.rows()),
            Block::Encoded(b) => Box::new(b.rows()),
            Block::Parquet(b) => Box::new(b.rows()),
            Block::Masked(b) => Box::new(b.rows()),
        }
    }

    /// Mutable row access for the scratch variants. File-backed,
    /// encoded and masked blocks are read-only.
    pub fn rows_mut(&mut self) -> RowsMut<'_> {
        match self {
            Block::Row(b) => RowsMut::Row(b),
            Block::Col(b) => RowsMut::Col(b),
            _ => panic!("block variant is read-only"),
        }
    }

    /// Restrict the block to the set bits of `mask`. Row blocks copy
    /// the surviving rows dense; every other variant wraps (masked
    /// blocks AND-combine their bitmaps).
    pub fn mask(self: &Arc<Self>, mask: Bitmap) -> Arc<Block> {
        match &**self {
            Block::Row(b) => Arc::new(Block::Row(b.masked_copy(&mask))),
            Block::Masked(b) => Arc::new(Block::Masked(b.and(&mask))),
            _ => Arc::new(Block::Masked(MaskedBlock::new(Arc::clone(self), mask))),
        }
    }

    /// Grow or shrink a scratch block.
    pub fn resize(&mut self, new_size: usize) {
        match self {
            Block::Row(b) => {
                let old = b.size() as usize;
                if new_size >= old {
                    b.inc(new_size - old);
                } else {
                    b.compact(new_size);
                }
            }
            Block::Col(b) => {
                let old = b.size() as usize;
                if new_size >= old {
                    b.inc(new_size - old);
                } else {
                    b.compact(new_size);
                }
            }
            _ => {}
        }
    }
}

/// Writer over the rows of a mutable block.
pub enum RowsMut<'a> {
    Row(&'a mut RowBlock),
    Col(&'a mut ColumnBlock),
}

impl RowsMut<'_> {
    pub fn row(&mut self, idx: usize) -> RowMut<'_> {
        match self {
            RowsMut::Row(block) => {
                let (words, offset, arena) = block.row_parts_mut(idx);
                RowMut(RowMutInner::Row(RowWordsMut {
                    words,
                    offset,
                    arena,
                }))
            }
            RowsMut::Col(block) => RowMut(RowMutInner::Col {
                block: &mut **block,
                idx,
            }),
        }
    }
}

enum RowMutInner<'a> {
    Row(RowWordsMut<'a>),
    Col { block: &'a mut ColumnBlock, idx: usize },
}

pub struct RowMut<'a>(RowMutInner<'a>);

impl DataRow for RowMut<'_> {
    fn num_fields(&self) -> usize {
        match &self.0 {
            RowMutInner::Row(r) => r.num_fields(),
            RowMutInner::Col { block, .. } => block.col_size().len(),
        }
    }

    fn field(&self, i: usize) -> DataField<'_> {
        match &self.0 {
            RowMutInner::Row(r) => r.field(i),
            RowMutInner::Col { block, idx } => block.field_at(i, *idx),
        }
    }

    fn raw_words(&self) -> Option<&[u64]> {
        match &self.0 {
            RowMutInner::Row(r) => r.raw_words(),
            RowMutInner::Col { .. } => None,
        }
    }
}

impl DataRowMut for RowMut<'_> {
    fn field_mut(&mut self, i: usize) -> FieldMut<'_> {
        match &mut self.0 {
            RowMutInner::Row(r) => r.field_mut(i),
            RowMutInner::Col { block, idx } => block.field_mut_at(i, *idx),
        }
    }

    fn raw_words_mut(&mut self) -> Option<&mut [u64]> {
        match &mut self.0 {
            RowMutInner::Row(r) => r.raw_words_mut(),
            RowMutInner::Col { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_cardinality() {
        let mut block = RowBlock::with_fields(10, 1);
        for i in 0..10usize {
            let (words, offset, arena) = block.row_parts_mut(i);
            RowWordsMut {
                words,
                offset,
                arena,
            }
            .field_mut(0)
            .set_int(i as i32);
        }
        let block = Arc::new(Block::Row(block));
        let mask = Bitmap::from_indices(10, &[2, 4, 9]);
        let masked = block.mask(mask);
        assert_eq!(masked.size(), 3);
        // row blocks mask by dense copy
        assert!(matches!(&*masked, Block::Row(_)));
        let mut rows = masked.rows();
        assert_eq!(rows.row(1).field(0).as_int(), 4);
    }

    #[test]
    fn test_chained_masks_intersect() {
        let mut col = ColumnBlock::new(8, vec![1]);
        for i in 0..8usize {
            col.field_mut_at(0, i).set_int(i as i32);
        }
        let block = Arc::new(Block::Col(col));
        let first = block.mask(Bitmap::from_indices(8, &[1, 3, 5, 7]));
        let second = first.mask(Bitmap::from_indices(8, &[0, 3, 7]));
        assert_eq!(second.size(), 2);
        let mut rows = second.rows();
        let mut seen = Vec::new();
        while let Some(row) = rows.next_row() {
            seen.push(row.field(0).as_int());
        }
        assert_eq!(seen, vec![3, 7]);
        // same surviving set as a single combined mask
        let combined = block.mask(
            &Bitmap::from_indices(8, &[1, 3, 5, 7]) & &Bitmap::from_indices(8, &[0, 3, 7]),
        );
        assert_eq!(combined.size(), second.size());
    }

    #[test]
    fn test_vertical_mask_wraps() {
        let col = ColumnBlock::new(4, vec![1, 1]);
        let block = Arc::new(Block::Col(col));
        let masked = block.mask(Bitmap::from_indices(4, &[0]));
        assert!(matches!(&*masked, Block::Masked(_)));
        assert_eq!(masked.limit(), 4);
        assert_eq!(masked.size(), 1);
    }
}
