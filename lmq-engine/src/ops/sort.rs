//! Full sort and bounded top-N over snapshotted rows. Comparators have
//! less-than semantics: `cmp(a, b)` means `a` comes first. Stability
//! only comes from tie-breaks embedded in the comparator.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::data::{Block, DataRowMut, MemDataRow, RowBlock};
use crate::graph::{ExecNode, NodeOutput};
use crate::table::{MemTable, Table, TableRef};

pub type Comparator = Arc<dyn Fn(&MemDataRow, &MemDataRow) -> bool + Send + Sync>;

fn ordering(cmp: &Comparator, a: &MemDataRow, b: &MemDataRow) -> Ordering {
    if (**cmp)(a, b) {
        Ordering::Less
    } else if (**cmp)(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

fn emit(rows: Vec<MemDataRow>, col_size: &[u32]) -> TableRef {
    let offset: Vec<u32> = rows
        .first()
        .map(|r| r.offset().to_vec())
        .unwrap_or_else(|| crate::data::offsets_of(col_size));
    let mut out = RowBlock::new(rows.len(), offset);
    for (i, row) in rows.iter().enumerate() {
        out.row_mut(i).set_row(row);
    }
    let mut table = MemTable::with_col_size(col_size.to_vec(), false);
    table.append_block(Block::Row(out));
    Arc::new(table)
}

fn collect_rows(input: &TableRef) -> Vec<MemDataRow> {
    let mut rows = Vec::new();
    input.blocks().foreach(|block| {
        let mut iter = block.rows();
        while let Some(row) = iter.next_row() {
            rows.push(MemDataRow::snapshot_of(row));
        }
    });
    rows
}

/// Collects every input row, sorts in memory, emits one row block.
pub struct SmallSort {
    cmp: Comparator,
}

impl SmallSort {
    pub fn new(cmp: impl Fn(&MemDataRow, &MemDataRow) -> bool + Send + Sync + 'static) -> Self {
        Self { cmp: Arc::new(cmp) }
    }

    pub fn sort(&self, input: TableRef) -> TableRef {
        let mut rows = collect_rows(&input);
        let cmp = Arc::clone(&self.cmp);
        rows.sort_by(|a, b| ordering(&cmp, a, b));
        emit(rows, input.col_size())
    }
}

impl ExecNode for SmallSort {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.sort(inputs[0].table()))
    }
}

/// Bounded heap of the `n` best rows under the comparator; the root is
/// the worst kept row, so a beating row swaps in at the root.
pub struct TopN {
    n: usize,
    cmp: Comparator,
}

impl TopN {
    pub fn new(
        n: usize,
        cmp: impl Fn(&MemDataRow, &MemDataRow) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { n, cmp: Arc::new(cmp) }
    }

    pub fn sort(&self, input: TableRef) -> TableRef {
        let mut heap = BoundedHeap {
            data: Vec::with_capacity(self.n),
            cmp: Arc::clone(&self.cmp),
        };
        input.blocks().foreach(|block| {
            let mut iter = block.rows();
            while let Some(row) = iter.next_row() {
                heap.offer(row, self.n);
            }
        });
        let mut rows = heap.data;
        let cmp = Arc::clone(&self.cmp);
        rows.sort_by(|a, b| ordering(&cmp, a, b));
        emit(rows, input.col_size())
    }
}

impl ExecNode for TopN {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.sort(inputs[0].table()))
    }
}

struct BoundedHeap {
    data: Vec<MemDataRow>,
    cmp: Comparator,
}

impl BoundedHeap {
    /// `a` is kept below `b` when `a` comes later in output order.
    fn later(&self, a: &MemDataRow, b: &MemDataRow) -> bool {
        (*self.cmp)(b, a)
    }

    fn offer(&mut self, row: &dyn crate::data::DataRow, n: usize) {
        if self.data.len() < n {
            self.data.push(MemDataRow::snapshot_of(row));
            self.sift_up(self.data.len() - 1);
        } else if n > 0 {
            let candidate = MemDataRow::snapshot_of(row);
            if (*self.cmp)(&candidate, &self.data[0]) {
                self.data[0] = candidate;
                self.sift_down(0);
            }
        }
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if self.later(&self.data[at], &self.data[parent]) {
                self.data.swap(at, parent);
                at = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        loop {
            let left = 2 * at + 1;
            let right = 2 * at + 2;
            let mut latest = at;
            if left < self.data.len() && self.later(&self.data[left], &self.data[latest]) {
                latest = left;
            }
            if right < self.data.len() && self.later(&self.data[right], &self.data[latest]) {
                latest = right;
            }
            if latest == at {
                break;
            }
            self.data.swap(at, latest);
            at = latest;
        }
    }
}
