//! Per-column predicates and their conjunction.
//!
//! Raw predicates scan dictionary-encoded pages without materializing
//! values: the dictionary pass computes the matching ordinal set, the
//! data-page pass marks bitmap positions whose ordinal is in that set.
//! Decoded evaluation is the fallback for everything else.

use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::data::{Block, DataField};
use crate::dict::{DictValue, Dictionary};
use crate::graph::{ExecNode, NodeOutput};
use crate::scan::{ParquetBlock, RawAccessor};
use crate::table::{Table, TableRef, TableView};

/// A dictionary-driven raw scan for one predicate over decoded values.
pub struct DictScan<T: DictValue> {
    pred: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    /// Matching ordinals, set by the dictionary pass.
    keep: Option<Bitmap>,
    bitmap: Option<Bitmap>,
    offset: u64,
}

impl<T: DictValue> DictScan<T> {
    pub fn new(pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            pred: Arc::new(pred),
            keep: None,
            bitmap: None,
            offset: 0,
        }
    }

    fn pred_arc(&self) -> Arc<dyn Fn(&T) -> bool + Send + Sync> {
        Arc::clone(&self.pred)
    }
}

impl<T: DictValue> RawAccessor<T> for DictScan<T> {
    fn init(&mut self, limit: u64) {
        self.bitmap = Some(Bitmap::empty(limit));
        self.keep = None;
        self.offset = 0;
    }

    fn dict(&mut self, dict: &Dictionary<T>) {
        let mut keep = Bitmap::empty(dict.len() as u64);
        for ordinal in dict.list(|v| (*self.pred)(v)) {
            keep.set(ordinal as u64);
        }
        self.keep = Some(keep);
    }

    fn ordinals(&mut self, chunk: &[u32]) {
        let keep = self
            .keep
            .as_ref()
            .expect("data page scanned before the dictionary page");
        let bitmap = self.bitmap.as_mut().expect("scan not initialized");
        for (i, ordinal) in chunk.iter().enumerate() {
            if keep.test(*ordinal as u64) {
                bitmap.set(self.offset + i as u64);
            }
        }
        self.offset += chunk.len() as u64;
    }

    fn values(&mut self, chunk: &[T]) {
        let bitmap = self.bitmap.as_mut().expect("scan not initialized");
        for (i, value) in chunk.iter().enumerate() {
            if (*self.pred)(value) {
                bitmap.set(self.offset + i as u64);
            }
        }
        self.offset += chunk.len() as u64;
    }

    fn take(&mut self) -> Bitmap {
        self.bitmap.take().expect("scan not initialized")
    }
}

/// value == key
pub fn dict_eq<T: DictValue>(key: T) -> DictScan<T> {
    DictScan::new(move |v| *v == key)
}

/// value < bound
pub fn dict_less<T: DictValue>(bound: T) -> DictScan<T> {
    DictScan::new(move |v| *v < bound)
}

/// lo <= value <= hi
pub fn dict_between<T: DictValue>(lo: T, hi: T) -> DictScan<T> {
    DictScan::new(move |v| *v >= lo && *v <= hi)
}

/// from <= value < to
pub fn dict_range_le<T: DictValue>(from: T, to: T) -> DictScan<T> {
    DictScan::new(move |v| *v >= from && *v < to)
}

/// Type-erased raw predicate: page scan on file-backed blocks, decoded
/// per-row evaluation everywhere else.
pub trait RawScan: Send + Sync {
    fn scan(&self, block: &ParquetBlock, col: usize) -> Bitmap;

    fn eval(&self, field: &DataField<'_>) -> bool;
}

struct TypedRawScan<T: DictValue> {
    build: Box<dyn Fn() -> DictScan<T> + Send + Sync>,
}

impl<T: DictValue> RawScan for TypedRawScan<T> {
    fn scan(&self, block: &ParquetBlock, col: usize) -> Bitmap {
        let mut accessor = (self.build)();
        block
            .scan_raw(col, &mut accessor)
            .expect("raw column scan")
    }

    fn eval(&self, field: &DataField<'_>) -> bool {
        let pred = (self.build)().pred_arc();
        let value = T::from_field(field);
        (*pred)(&value)
    }
}

pub enum ColPredicate {
    Raw {
        col: u32,
        scan: Box<dyn RawScan>,
    },
    Simple {
        col: u32,
        pred: Arc<dyn Fn(&DataField<'_>) -> bool + Send + Sync>,
    },
}

/// Raw predicate over column `col`; `build` creates a fresh scan per
/// block (scans carry per-row-group state).
pub fn raw_pred<T: DictValue>(
    col: u32,
    build: impl Fn() -> DictScan<T> + Send + Sync + 'static,
) -> ColPredicate {
    ColPredicate::Raw {
        col,
        scan: Box::new(TypedRawScan {
            build: Box::new(build),
        }),
    }
}

/// Decoded-value predicate over column `col`.
pub fn simple_pred(
    col: u32,
    pred: impl Fn(&DataField<'_>) -> bool + Send + Sync + 'static,
) -> ColPredicate {
    ColPredicate::Simple {
        col,
        pred: Arc::new(pred),
    }
}

/// Conjunction of per-column predicates: per block, every predicate's
/// bitmap is ANDed and the block is masked with the result. Evaluation
/// short-circuits once the cumulative bitmap is empty.
pub struct ColFilter {
    predicates: Arc<Vec<ColPredicate>>,
}

impl ColFilter {
    pub fn new(predicates: Vec<ColPredicate>) -> Self {
        Self {
            predicates: Arc::new(predicates),
        }
    }

    pub fn filter(&self, input: TableRef) -> TableRef {
        let col_size = input.col_size().to_vec();
        let predicates = Arc::clone(&self.predicates);
        Arc::new(TableView::new(col_size, move || {
            let predicates = Arc::clone(&predicates);
            input
                .blocks()
                .map(move |block| filter_block(&predicates, block))
        }))
    }
}

fn filter_block(predicates: &[ColPredicate], block: Arc<Block>) -> Arc<Block> {
    let mut combined: Option<Bitmap> = None;
    for predicate in predicates {
        if combined.as_ref().is_some_and(|c| c.is_empty()) {
            break;
        }
        let bitmap = eval_predicate(predicate, &block);
        combined = Some(match combined {
            Some(c) => &c & &bitmap,
            None => bitmap,
        });
    }
    match combined {
        Some(mask) => block.mask(mask),
        None => block,
    }
}

fn eval_predicate(predicate: &ColPredicate, block: &Arc<Block>) -> Bitmap {
    match predicate {
        ColPredicate::Raw { col, scan } => {
            if let Block::Parquet(parquet) = &**block {
                return scan.scan(parquet, *col as usize);
            }
            if let Block::Masked(masked) = &**block {
                if let Block::Parquet(parquet) = &**masked.inner() {
                    return scan.scan(parquet, *col as usize);
                }
            }
            decoded_scan(block, *col as usize, |field| scan.eval(field))
        }
        ColPredicate::Simple { col, pred } => {
            decoded_scan(block, *col as usize, |field| (**pred)(field))
        }
    }
}

fn decoded_scan(
    block: &Arc<Block>,
    col: usize,
    pred: impl Fn(&DataField<'_>) -> bool,
) -> Bitmap {
    let mut bitmap = Bitmap::empty(block.limit());
    let mut iter = block.col(col);
    loop {
        let hit = match iter.next_field() {
            Some(field) => pred(&field),
            None => break,
        };
        if hit {
            bitmap.set(iter.pos());
        }
    }
    bitmap
}

impl ExecNode for ColFilter {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.filter(inputs[0].table()))
    }
}
