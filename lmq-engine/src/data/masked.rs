//! A block logically restricted to the set bits of a live bitmap.
//! Masking is monotone: combining masks only shrinks the row set.

use std::sync::Arc;

use crate::bitmap::{Bitmap, BitmapIter};

use super::block::{next_block_id, Block};
use super::field::DataField;
use super::row::{ColumnIterator, DataRow, RowIterator};

pub struct MaskedBlock {
    id: u32,
    inner: Arc<Block>,
    mask: Bitmap,
}

impl MaskedBlock {
    pub fn new(inner: Arc<Block>, mask: Bitmap) -> Self {
        assert_eq!(
            mask.limit(),
            inner.limit(),
            "mask does not span the block row space"
        );
        Self {
            id: next_block_id(),
            inner,
            mask,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Live rows.
    pub fn size(&self) -> u64 {
        self.mask.cardinality()
    }

    /// Underlying row space, which bitmaps over this block span.
    pub fn limit(&self) -> u64 {
        self.inner.limit()
    }

    pub fn inner(&self) -> &Arc<Block> {
        &self.inner
    }

    pub fn mask_ref(&self) -> &Bitmap {
        &self.mask
    }

    /// The same logical block further restricted by `mask`.
    pub fn and(&self, mask: &Bitmap) -> MaskedBlock {
        MaskedBlock::new(Arc::clone(&self.inner), &self.mask & mask)
    }

    pub fn col(&self, col_index: usize) -> MaskedColumnIter<'_> {
        MaskedColumnIter {
            inner: self.inner.col(col_index),
            bits: self.mask.iter(),
        }
    }

    pub fn rows(&self) -> MaskedRowIter<'_> {
        MaskedRowIter {
            inner: self.inner.rows(),
            bits: self.mask.iter(),
        }
    }
}

pub struct MaskedColumnIter<'a> {
    inner: Box<dyn ColumnIterator + 'a>,
    bits: BitmapIter<'a>,
}

impl ColumnIterator for MaskedColumnIter<'_> {
    fn field(&mut self, idx: u64) -> DataField<'_> {
        self.inner.field(idx)
    }

    fn next_field(&mut self) -> Option<DataField<'_>> {
        match self.bits.next() {
            Some(live) => Some(self.inner.field(live)),
            None => None,
        }
    }

    fn raw(&mut self, idx: u64) -> DataField<'_> {
        self.inner.raw(idx)
    }

    fn pos(&self) -> u64 {
        self.inner.pos()
    }
}

pub struct MaskedRowIter<'a> {
    inner: Box<dyn RowIterator + 'a>,
    bits: BitmapIter<'a>,
}

impl RowIterator for MaskedRowIter<'_> {
    fn row(&mut self, idx: u64) -> &dyn DataRow {
        self.inner.row(idx)
    }

    fn next_row(&mut self) -> Option<&dyn DataRow> {
        match self.bits.next() {
            Some(live) => Some(self.inner.row(live)),
            None => None,
        }
    }

    fn pos(&self) -> u64 {
        self.inner.pos()
    }
}
