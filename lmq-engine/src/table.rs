//! Tables: lazy streams of blocks plus a column-width vector.
//! Repeated `blocks()` calls restart iteration.

use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::data::{col_size, offsets_of, Block, ColumnBlock, RowBlock};
use crate::scan::ParquetTable;
use crate::stream::Stream;

pub type TableRef = Arc<dyn Table>;

pub trait Table: Send + Sync {
    fn blocks(&self) -> Stream<Arc<Block>>;

    /// Column widths in words.
    fn col_size(&self) -> &[u32];

    fn num_fields(&self) -> usize {
        self.col_size().len()
    }

    /// Total rows, by walking the block stream.
    fn total_rows(&self) -> u64 {
        let mut sum = 0;
        self.blocks().foreach(|b| sum += b.size());
        sum
    }
}

/// In-memory table of scratch blocks, row-major or vertical.
pub struct MemTable {
    vertical: bool,
    col_size: Vec<u32>,
    col_offset: Vec<u32>,
    blocks: Vec<Arc<Block>>,
}

impl MemTable {
    pub fn make(num_fields: usize, vertical: bool) -> MemTable {
        Self::with_col_size(col_size(num_fields).to_vec(), vertical)
    }

    pub fn with_col_size(col_size: Vec<u32>, vertical: bool) -> MemTable {
        let col_offset = offsets_of(&col_size);
        MemTable {
            vertical,
            col_size,
            col_offset,
            blocks: Vec::new(),
        }
    }

    pub fn vertical(&self) -> bool {
        self.vertical
    }

    pub fn col_offset(&self) -> &[u32] {
        &self.col_offset
    }

    /// Append a zeroed block of `num_rows` rows and hand it out for
    /// filling. The block is shared with the table once iteration
    /// starts.
    pub fn allocate(&mut self, num_rows: usize) -> &mut Block {
        let block = if self.vertical {
            Block::Col(ColumnBlock::new(num_rows, self.col_size.clone()))
        } else {
            Block::Row(RowBlock::new(num_rows, self.col_offset.clone()))
        };
        self.blocks.push(Arc::new(block));
        Arc::get_mut(self.blocks.last_mut().unwrap()).expect("freshly allocated block is shared")
    }

    pub fn append(&mut self, block: Arc<Block>) {
        self.blocks.push(block);
    }

    pub fn append_block(&mut self, block: Block) {
        self.blocks.push(Arc::new(block));
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}

impl Table for MemTable {
    fn blocks(&self) -> Stream<Arc<Block>> {
        Stream::from_vec(self.blocks.clone())
    }

    fn col_size(&self) -> &[u32] {
        &self.col_size
    }
}

/// A lazily derived table: a restartable block-stream recipe over some
/// upstream table, the shape operators hand downstream.
pub struct TableView {
    col_size: Vec<u32>,
    factory: Box<dyn Fn() -> Stream<Arc<Block>> + Send + Sync>,
}

impl TableView {
    pub fn new(
        col_size: Vec<u32>,
        factory: impl Fn() -> Stream<Arc<Block>> + Send + Sync + 'static,
    ) -> TableView {
        TableView {
            col_size,
            factory: Box::new(factory),
        }
    }
}

impl Table for TableView {
    fn blocks(&self) -> Stream<Arc<Block>> {
        (self.factory)()
    }

    fn col_size(&self) -> &[u32] {
        &self.col_size
    }
}

/// A parquet table re-read under per-row-group masks saved from an
/// earlier scan.
pub struct MaskedTable {
    inner: Arc<ParquetTable>,
    masks: Arc<Vec<Bitmap>>,
}

impl MaskedTable {
    /// `masks[i]` restricts row group `i`.
    pub fn new(inner: Arc<ParquetTable>, masks: Vec<Bitmap>) -> MaskedTable {
        assert_eq!(masks.len(), inner.num_row_groups());
        MaskedTable {
            inner,
            masks: Arc::new(masks),
        }
    }
}

impl Table for MaskedTable {
    fn blocks(&self) -> Stream<Arc<Block>> {
        let masks = Arc::clone(&self.masks);
        self.inner
            .blocks()
            .map(move |block| {
                let mask = masks[block.id() as usize].clone();
                block.mask(mask)
            })
    }

    fn col_size(&self) -> &[u32] {
        self.inner.col_size()
    }
}
