//! Materialization: pin the work of predicate-heavy scans before
//! downstream operators iterate the same data more than once.

use std::sync::Arc;

use crate::data::{Block, ColumnBlock, DataRowMut, MemDataRow, RowBlock};
use crate::graph::{ExecNode, NodeOutput};
use crate::table::{MemTable, Table, TableRef};

/// Walks the stream once, forcing lazy masked blocks dense: vertical
/// sources collapse to vertical blocks, everything else to row blocks.
/// Unmasked blocks pass through untouched.
#[derive(Default)]
pub struct FilterMat;

impl FilterMat {
    pub fn new() -> Self {
        Self
    }

    pub fn mat(&self, input: TableRef) -> TableRef {
        let col_size = input.col_size().to_vec();
        let mut out = MemTable::with_col_size(col_size.clone(), false);
        input.blocks().foreach(|block| match &*block {
            Block::Masked(masked) => {
                let dense = match &**masked.inner() {
                    Block::Col(_) | Block::Encoded(_) => dense_vertical(&block, &col_size),
                    _ => dense_rows(&block, &col_size),
                };
                out.append_block(dense);
            }
            _ => out.append(Arc::clone(&block)),
        });
        Arc::new(out)
    }
}

fn dense_rows(block: &Block, col_size: &[u32]) -> Block {
    let mut dense = RowBlock::new(block.size() as usize, crate::data::offsets_of(col_size));
    let mut rows = block.rows();
    let mut index = 0usize;
    while let Some(row) = rows.next_row() {
        dense.row_mut(index).set_row(row);
        index += 1;
    }
    Block::Row(dense)
}

fn dense_vertical(block: &Block, col_size: &[u32]) -> Block {
    let mut dense = Block::Col(ColumnBlock::new(block.size() as usize, col_size.to_vec()));
    {
        let mut writer = dense.rows_mut();
        let mut rows = block.rows();
        let mut index = 0usize;
        while let Some(row) = rows.next_row() {
            writer.row(index).set_row(row);
            index += 1;
        }
    }
    dense
}

impl ExecNode for FilterMat {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.mat(inputs[0].table()))
    }
}

/// Materializes every row through snapshots into hash-partitioned row
/// blocks: row `r` lands in block `key(r) % partitions`. Downstream
/// build sides can then work partition-at-a-time.
pub struct HashMat {
    key: usize,
    partitions: usize,
}

impl HashMat {
    pub fn new(key: usize, partitions: usize) -> Self {
        assert!(partitions > 0);
        Self { key, partitions }
    }

    pub fn mat(&self, input: TableRef) -> TableRef {
        let mut buckets: Vec<Vec<MemDataRow>> = (0..self.partitions).map(|_| Vec::new()).collect();
        input.blocks().foreach(|block| {
            let mut rows = block.rows();
            while let Some(row) = rows.next_row() {
                let slot = row.field(self.key).as_int() as u32 as usize % self.partitions;
                buckets[slot].push(MemDataRow::snapshot_of(row));
            }
        });
        let col_size = input.col_size().to_vec();
        let offsets = crate::data::offsets_of(&col_size);
        let mut out = MemTable::with_col_size(col_size, false);
        for bucket in buckets {
            if bucket.is_empty() {
                continue;
            }
            let mut block = RowBlock::new(bucket.len(), offsets.clone());
            for (i, row) in bucket.iter().enumerate() {
                block.row_mut(i).set_row(row);
            }
            out.append_block(Block::Row(block));
        }
        Arc::new(out)
    }
}

impl ExecNode for HashMat {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.mat(inputs[0].table()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::data::DataRow;
    use crate::table::{Table, TableView};

    fn masked_table() -> TableRef {
        let mut mem = MemTable::make(1, true);
        {
            let block = mem.allocate(6);
            let mut writer = block.rows_mut();
            for i in 0..6usize {
                writer.row(i).field_mut(0).set_int(i as i32);
            }
        }
        let mem = Arc::new(mem);
        let inner = Arc::clone(&mem);
        Arc::new(TableView::new(mem.col_size().to_vec(), move || {
            inner
                .blocks()
                .map(|b| b.mask(Bitmap::from_indices(6, &[1, 4, 5])))
        }))
    }

    #[test]
    fn test_filter_mat_collapses_masks() {
        let mat = FilterMat::new().mat(masked_table());
        let blocks = mat.blocks().collect();
        assert_eq!(blocks.len(), 1);
        // vertical source collapses to a vertical block
        assert!(matches!(&*blocks[0], Block::Col(_)));
        assert_eq!(blocks[0].size(), 3);
        let mut rows = blocks[0].rows();
        assert_eq!(rows.row(0).field(0).as_int(), 1);
        assert_eq!(rows.row(2).field(0).as_int(), 5);
    }

    #[test]
    fn test_hash_mat_partitions() {
        let mut mem = MemTable::make(1, false);
        {
            let block = mem.allocate(10);
            let mut writer = block.rows_mut();
            for i in 0..10usize {
                writer.row(i).field_mut(0).set_int(i as i32);
            }
        }
        let mat = HashMat::new(0, 3).mat(Arc::new(mem));
        let blocks = mat.blocks().collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks.iter().map(|b| b.size()).sum::<u64>(), 10);
        // every row in block p hashes to p
        for (p, block) in blocks.iter().enumerate() {
            let mut rows = block.rows();
            loop {
                match rows.next_row() {
                    Some(row) => assert_eq!(row.field(0).as_int() as usize % 3, p),
                    None => break,
                }
            }
        }
    }
}
