//! Hash aggregation: per-group reducers over a snapshotted group key,
//! plus the no-grouping and dense-domain variants.
//!
//! Groups are keyed by the hasher's output, so the hasher must be
//! collision-free over the group keys; the column constructors build
//! such hashers for integer keys. Reducers are not thread-safe and the
//! build walks the input stream sequentially.

use std::sync::Arc;

use xxhash_rust::xxh64::xxh64;

use crate::data::{offsets_of, Block, DataRow, DataRowMut, FieldMut, MemDataRow, RowBlock};
use crate::graph::{ExecNode, NodeOutput};
use crate::rowcopy::{FieldType, RowCopyFactory, Snapshoter};
use crate::table::{MemTable, Table, TableRef};

use super::container::Hash64Map;

/// One reducer slot in the aggregation output.
pub trait AggField: Send {
    /// Words the dumped value occupies.
    fn width(&self) -> u32 {
        1
    }

    fn reduce(&mut self, row: &dyn DataRow);

    fn dump(&self, target: FieldMut<'_>);

    /// Recording reducers expose the source rows achieving their
    /// extremum (ties included).
    fn recorded(&self) -> Option<&[MemDataRow]> {
        None
    }
}

pub struct IntSum {
    col: usize,
    sum: i64,
}

impl IntSum {
    pub fn new(col: usize) -> Self {
        Self { col, sum: 0 }
    }
}

impl AggField for IntSum {
    fn reduce(&mut self, row: &dyn DataRow) {
        self.sum += row.field(self.col).as_int() as i64;
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_long(self.sum);
    }
}

pub struct DoubleSum {
    col: usize,
    sum: f64,
}

impl DoubleSum {
    pub fn new(col: usize) -> Self {
        Self { col, sum: 0.0 }
    }
}

impl AggField for DoubleSum {
    fn reduce(&mut self, row: &dyn DataRow) {
        self.sum += row.field(self.col).as_double();
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_double(self.sum);
    }
}

#[derive(Default)]
pub struct Count {
    count: i64,
}

impl Count {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AggField for Count {
    fn reduce(&mut self, _row: &dyn DataRow) {
        self.count += 1;
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_long(self.count);
    }
}

pub struct IntAvg {
    col: usize,
    sum: i64,
    count: u64,
}

impl IntAvg {
    pub fn new(col: usize) -> Self {
        Self {
            col,
            sum: 0,
            count: 0,
        }
    }
}

impl AggField for IntAvg {
    fn reduce(&mut self, row: &dyn DataRow) {
        self.sum += row.field(self.col).as_int() as i64;
        self.count += 1;
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_double(self.sum as f64 / self.count.max(1) as f64);
    }
}

pub struct DoubleAvg {
    col: usize,
    sum: f64,
    count: u64,
}

impl DoubleAvg {
    pub fn new(col: usize) -> Self {
        Self {
            col,
            sum: 0.0,
            count: 0,
        }
    }
}

impl AggField for DoubleAvg {
    fn reduce(&mut self, row: &dyn DataRow) {
        self.sum += row.field(self.col).as_double();
        self.count += 1;
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_double(self.sum / self.count.max(1) as f64);
    }
}

pub struct IntMax {
    col: usize,
    max: i32,
}

impl IntMax {
    pub fn new(col: usize) -> Self {
        Self { col, max: i32::MIN }
    }
}

impl AggField for IntMax {
    fn reduce(&mut self, row: &dyn DataRow) {
        self.max = self.max.max(row.field(self.col).as_int());
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_int(self.max);
    }
}

pub struct DoubleMax {
    col: usize,
    max: f64,
}

impl DoubleMax {
    pub fn new(col: usize) -> Self {
        Self {
            col,
            max: f64::NEG_INFINITY,
        }
    }
}

impl AggField for DoubleMax {
    fn reduce(&mut self, row: &dyn DataRow) {
        self.max = self.max.max(row.field(self.col).as_double());
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_double(self.max);
    }
}

/// Maximum over a double column that keeps the source rows achieving
/// it, for top-by-value-with-ties.
pub struct DoubleRecordingMax {
    watch: usize,
    best: f64,
    rows: Vec<MemDataRow>,
}

impl DoubleRecordingMax {
    pub fn new(watch: usize) -> Self {
        Self {
            watch,
            best: f64::NEG_INFINITY,
            rows: Vec::new(),
        }
    }
}

impl AggField for DoubleRecordingMax {
    fn reduce(&mut self, row: &dyn DataRow) {
        let value = row.field(self.watch).as_double();
        if value > self.best {
            self.best = value;
            self.rows.clear();
            self.rows.push(MemDataRow::snapshot_of(row));
        } else if value == self.best {
            self.rows.push(MemDataRow::snapshot_of(row));
        }
    }

    fn dump(&self, mut target: FieldMut<'_>) {
        target.set_double(self.best);
    }

    fn recorded(&self) -> Option<&[MemDataRow]> {
        Some(&self.rows)
    }
}

pub type Hasher = Arc<dyn Fn(&dyn DataRow) -> u64 + Send + Sync>;
pub type FieldsFactory = Arc<dyn Fn() -> Vec<Box<dyn AggField>> + Send + Sync>;
pub type RowPredicate = Arc<dyn Fn(&dyn DataRow) -> bool + Send + Sync>;

/// The integer key column itself; injective by construction.
pub fn col_hasher(col: usize) -> Hasher {
    Arc::new(move |row| row.field(col).as_int() as u32 as u64)
}

/// xxh64 over the key columns' bytes, for composite or non-integer
/// keys.
pub fn row_hasher(cols: Vec<usize>) -> Hasher {
    Arc::new(move |row| {
        let mut buf = Vec::with_capacity(cols.len() * 8);
        for &col in &cols {
            let field = row.field(col);
            if field.size() == 2 {
                let bytes = field.as_bytes();
                buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                buf.extend_from_slice(bytes);
            } else {
                buf.extend_from_slice(&field.as_long().to_le_bytes());
            }
        }
        xxh64(&buf, 0)
    })
}

/// A group-key column: decoded, or the raw dictionary ordinal.
#[derive(Clone, Copy, Debug)]
pub enum GroupKey {
    Col(u32),
    RawCol(u32),
}

fn key_snapshoter(keys: &[GroupKey]) -> Snapshoter {
    let mut factory = RowCopyFactory::new();
    for (i, key) in keys.iter().enumerate() {
        factory = match key {
            GroupKey::Col(col) => factory.field(FieldType::Regular, *col, i as u32),
            GroupKey::RawCol(col) => factory.field(FieldType::Raw, *col, i as u32),
        };
    }
    factory.build_snapshot()
}

struct Group {
    key: MemDataRow,
    fields: Vec<Box<dyn AggField>>,
}

impl Group {
    fn reduce(&mut self, row: &dyn DataRow) {
        for field in &mut self.fields {
            field.reduce(row);
        }
    }
}

/// Hash aggregation with explicit hasher and key snapshoter.
pub struct HashAgg {
    hasher: Hasher,
    keys: Arc<Snapshoter>,
    fields: FieldsFactory,
    predicate: Option<RowPredicate>,
    recording: bool,
}

impl HashAgg {
    pub fn new(
        hasher: Hasher,
        keys: Snapshoter,
        fields: impl Fn() -> Vec<Box<dyn AggField>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            hasher,
            keys: Arc::new(keys),
            fields: Arc::new(fields),
            predicate: None,
            recording: false,
        }
    }

    /// Group by a key column list; a single integer key hashes to
    /// itself, composite keys through xxh64.
    pub fn by_columns(
        keys: &[GroupKey],
        fields: impl Fn() -> Vec<Box<dyn AggField>> + Send + Sync + 'static,
    ) -> Self {
        let hasher = match keys {
            [GroupKey::Col(col)] => col_hasher(*col as usize),
            _ => row_hasher(
                keys.iter()
                    .map(|k| match k {
                        GroupKey::Col(c) | GroupKey::RawCol(c) => *c as usize,
                    })
                    .collect(),
            ),
        };
        Self::new(hasher, key_snapshoter(keys), fields)
    }

    /// Gate output rows on a predicate over the aggregated row.
    pub fn set_predicate(&mut self, pred: impl Fn(&dyn DataRow) -> bool + Send + Sync + 'static) {
        self.predicate = Some(Arc::new(pred));
    }

    /// Emit the rows recorded by a recording reducer instead of
    /// key-plus-dumps.
    pub fn use_recording(&mut self) {
        self.recording = true;
    }

    pub fn agg(&self, input: TableRef) -> TableRef {
        let mut groups: Hash64Map<Group> = Hash64Map::new();
        let mut order: Vec<u64> = Vec::new();
        input.blocks().foreach(|block| {
            let mut rows = block.rows();
            while let Some(row) = rows.next_row() {
                let hash = (*self.hasher)(row);
                let group = groups.get_or_insert_with(hash, || {
                    order.push(hash);
                    Group {
                        key: self.keys.snapshot(row),
                        fields: (*self.fields)(),
                    }
                });
                group.reduce(row);
            }
        });
        log::debug!("hash agg: {} groups", groups.len());
        let mut groups = groups;
        let ordered: Vec<Group> = order
            .iter()
            .map(|h| groups.remove(*h).expect("group vanished"))
            .collect();
        finalize(
            ordered,
            self.keys.offset(),
            &self.fields,
            self.predicate.as_deref(),
            self.recording,
        )
    }
}

/// Aggregation with one implicit group and no key columns.
pub struct SimpleAgg {
    fields: FieldsFactory,
}

impl SimpleAgg {
    pub fn new(fields: impl Fn() -> Vec<Box<dyn AggField>> + Send + Sync + 'static) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }

    pub fn agg(&self, input: TableRef) -> TableRef {
        let mut group = Group {
            key: MemDataRow::new(0),
            fields: (*self.fields)(),
        };
        input.blocks().foreach(|block| {
            let mut rows = block.rows();
            while let Some(row) = rows.next_row() {
                group.reduce(row);
            }
        });
        finalize(vec![group], &[0], &self.fields, None, false)
    }
}

/// Dense-domain aggregation: an indexer maps each row into `[0, k)`
/// and groups live in a flat slot array; unused slots are dropped.
pub struct TableAgg {
    capacity: usize,
    indexer: Arc<dyn Fn(&dyn DataRow) -> u32 + Send + Sync>,
    keys: Arc<Snapshoter>,
    fields: FieldsFactory,
}

impl TableAgg {
    pub fn new(
        capacity: usize,
        indexer: impl Fn(&dyn DataRow) -> u32 + Send + Sync + 'static,
        keys: &[GroupKey],
        fields: impl Fn() -> Vec<Box<dyn AggField>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            capacity,
            indexer: Arc::new(indexer),
            keys: Arc::new(key_snapshoter(keys)),
            fields: Arc::new(fields),
        }
    }

    pub fn agg(&self, input: TableRef) -> TableRef {
        let mut slots: Vec<Option<Group>> = (0..self.capacity).map(|_| None).collect();
        input.blocks().foreach(|block| {
            let mut rows = block.rows();
            while let Some(row) = rows.next_row() {
                let index = (*self.indexer)(row) as usize;
                assert!(index < self.capacity, "indexer left the group domain");
                let group = slots[index].get_or_insert_with(|| Group {
                    key: self.keys.snapshot(row),
                    fields: (*self.fields)(),
                });
                group.reduce(row);
            }
        });
        let ordered: Vec<Group> = slots.into_iter().flatten().collect();
        finalize(ordered, self.keys.offset(), &self.fields, None, false)
    }
}

fn finalize(
    groups: Vec<Group>,
    key_offset: &[u32],
    fields: &FieldsFactory,
    predicate: Option<&(dyn Fn(&dyn DataRow) -> bool + Send + Sync)>,
    recording: bool,
) -> TableRef {
    if recording {
        return finalize_recording(groups, predicate);
    }
    let num_keys = key_offset.len() - 1;
    let mut col_size: Vec<u32> = (0..num_keys)
        .map(|i| key_offset[i + 1] - key_offset[i])
        .collect();
    let widths: Vec<u32> = (**fields)().iter().map(|f| f.width()).collect();
    col_size.extend(widths);
    let mut out = RowBlock::new(groups.len(), offsets_of(&col_size));
    let mut produced = 0usize;
    for group in &groups {
        let mut target = out.row_mut(produced);
        for i in 0..num_keys {
            target.field_mut(i).set_field(group.key.field(i));
        }
        for (j, field) in group.fields.iter().enumerate() {
            field.dump(target.field_mut(num_keys + j));
        }
        let keep = predicate.map(|p| p(&target)).unwrap_or(true);
        if keep {
            produced += 1;
        }
    }
    out.compact(produced);
    let mut table = MemTable::with_col_size(col_size, false);
    table.append_block(Block::Row(out));
    Arc::new(table)
}

fn finalize_recording(
    groups: Vec<Group>,
    predicate: Option<&(dyn Fn(&dyn DataRow) -> bool + Send + Sync)>,
) -> TableRef {
    let mut rows: Vec<&MemDataRow> = Vec::new();
    for group in &groups {
        if let Some(recorded) = group.fields.iter().find_map(|f| f.recorded()) {
            rows.extend(recorded.iter());
        }
    }
    let offset: Vec<u32> = rows
        .first()
        .map(|r| r.offset().to_vec())
        .unwrap_or_else(|| vec![0]);
    let col_size: Vec<u32> = (0..offset.len() - 1)
        .map(|i| offset[i + 1] - offset[i])
        .collect();
    let mut out = RowBlock::new(rows.len(), offset);
    let mut produced = 0usize;
    for row in rows {
        if predicate.map(|p| p(row as &dyn DataRow)).unwrap_or(true) {
            out.row_mut(produced).set_row(row);
            produced += 1;
        }
    }
    out.compact(produced);
    let mut table = MemTable::with_col_size(col_size, false);
    table.append_block(Block::Row(out));
    Arc::new(table)
}

impl ExecNode for HashAgg {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.agg(inputs[0].table()))
    }
}

impl ExecNode for SimpleAgg {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.agg(inputs[0].table()))
    }
}

impl ExecNode for TableAgg {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.agg(inputs[0].table()))
    }
}
