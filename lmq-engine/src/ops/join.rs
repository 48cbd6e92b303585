//! The hash-join family: build one side into a hash container keyed by
//! the join column, then stream the other side through it.
//!
//! Build is single-threaded per stream; probes run per block and are
//! parallel-safe (the container is read-only once built). Probe-side
//! iteration order is preserved within a block, and across blocks the
//! parallel stream re-establishes input order at `collect`.

use std::sync::Arc;

use crate::bitmap::Bitmap;
use crate::data::{
    offsets_of, Block, ColumnBlock, DataRow, DataRowMut, MemDataRow, RowBlock,
};
use crate::graph::{ExecNode, NodeOutput};
use crate::rowcopy::{FieldType, RowCopyFactory, Snapshoter};
use crate::table::{Table, TableRef, TableView};

use super::container::Int32SparseMap;

/// One output field of a join: which side, which column, decoded /
/// string / raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinField {
    Left(u32),
    Right(u32),
    LeftStr(u32),
    RightStr(u32),
    LeftRaw(u32),
    RightRaw(u32),
}

pub fn jl(col: u32) -> JoinField {
    JoinField::Left(col)
}

pub fn jr(col: u32) -> JoinField {
    JoinField::Right(col)
}

pub fn jls(col: u32) -> JoinField {
    JoinField::LeftStr(col)
}

pub fn jrs(col: u32) -> JoinField {
    JoinField::RightStr(col)
}

pub fn jlr(col: u32) -> JoinField {
    JoinField::LeftRaw(col)
}

pub fn jrr(col: u32) -> JoinField {
    JoinField::RightRaw(col)
}

impl JoinField {
    fn is_right(&self) -> bool {
        matches!(
            self,
            JoinField::Right(_) | JoinField::RightStr(_) | JoinField::RightRaw(_)
        )
    }

    fn col(&self) -> u32 {
        match self {
            JoinField::Left(c)
            | JoinField::Right(c)
            | JoinField::LeftStr(c)
            | JoinField::RightStr(c)
            | JoinField::LeftRaw(c)
            | JoinField::RightRaw(c) => *c,
        }
    }

    fn width(&self) -> u32 {
        match self {
            JoinField::LeftStr(_) | JoinField::RightStr(_) => 2,
            _ => 1,
        }
    }

    fn kind(&self) -> FieldType {
        match self {
            JoinField::LeftStr(_) | JoinField::RightStr(_) => FieldType::String,
            JoinField::LeftRaw(_) | JoinField::RightRaw(_) => FieldType::Raw,
            _ => FieldType::Regular,
        }
    }
}

enum Instr {
    Key {
        to: usize,
    },
    Left {
        from: usize,
        to: usize,
        raw: bool,
    },
    Right {
        /// Index in the build-side snapshot.
        snap: usize,
        /// Source right-side column, for probes over live right rows.
        col: usize,
        to: usize,
        raw: bool,
    },
}

type BuildFn =
    dyn Fn(&mut dyn DataRowMut, &dyn DataRow, &dyn DataRow, i32) + Send + Sync;

/// Join-key extraction: the decoded integer, or the raw dictionary
/// ordinal when both sides read the same dictionary.
#[inline]
fn key_of(row: &dyn DataRow, col: usize, raw: bool) -> i32 {
    if raw {
        row.raw_field(col).as_int()
    } else {
        row.field(col).as_int()
    }
}

/// Assembles one output row from a probe row and a build-side snapshot,
/// through a compiled instruction list. `keep_key` prepends the join
/// key; `vertical` makes the join emit vertical blocks.
pub struct RowBuilder {
    keep_key: bool,
    vertical: bool,
    col_size: Vec<u32>,
    right_snapshoter: Snapshoter,
    instructions: Vec<Instr>,
    custom: Option<Box<BuildFn>>,
}

impl RowBuilder {
    pub fn new(fields: Vec<JoinField>) -> Self {
        Self::with_options(fields, false, false)
    }

    pub fn with_options(fields: Vec<JoinField>, keep_key: bool, vertical: bool) -> Self {
        let mut col_size = Vec::with_capacity(fields.len() + keep_key as usize);
        if keep_key {
            col_size.push(1);
        }
        let mut instructions = Vec::with_capacity(fields.len() + keep_key as usize);
        if keep_key {
            instructions.push(Instr::Key { to: 0 });
        }
        let mut snapshot = RowCopyFactory::new();
        let mut snap_next = 0usize;
        for (position, field) in fields.iter().enumerate() {
            let to = position + keep_key as usize;
            col_size.push(field.width());
            if field.is_right() {
                snapshot = snapshot.field(field.kind(), field.col(), snap_next as u32);
                instructions.push(Instr::Right {
                    snap: snap_next,
                    col: field.col() as usize,
                    to,
                    raw: field.kind() == FieldType::Raw,
                });
                snap_next += 1;
            } else {
                instructions.push(Instr::Left {
                    from: field.col() as usize,
                    to,
                    raw: field.kind() == FieldType::Raw,
                });
            }
        }
        Self {
            keep_key,
            vertical,
            col_size,
            right_snapshoter: snapshot.build_snapshot(),
            instructions,
            custom: None,
        }
    }

    /// Replace the compiled copy with a hand-written one; the field
    /// list still defines the output layout and build-side snapshot.
    pub fn with_build(
        mut self,
        f: impl Fn(&mut dyn DataRowMut, &dyn DataRow, &dyn DataRow, i32) + Send + Sync + 'static,
    ) -> Self {
        self.custom = Some(Box::new(f));
        self
    }

    pub fn num_fields(&self) -> usize {
        self.col_size.len()
    }

    pub fn num_string_fields(&self) -> usize {
        self.col_size.iter().filter(|w| **w == 2).count()
    }

    pub fn use_vertical(&self) -> bool {
        self.vertical
    }

    pub fn output_col_size(&self) -> &[u32] {
        &self.col_size
    }

    /// Build-side payload: the right fields, renumbered densely.
    pub fn snapshot(&self, row: &dyn DataRow) -> MemDataRow {
        self.right_snapshoter.snapshot(row)
    }

    pub fn build(
        &self,
        target: &mut dyn DataRowMut,
        left: &dyn DataRow,
        right: &dyn DataRow,
        key: i32,
    ) {
        if let Some(custom) = &self.custom {
            custom(target, left, right, key);
            return;
        }
        for instr in &self.instructions {
            match instr {
                Instr::Key { to } => target.field_mut(*to).set_int(key),
                Instr::Left { from, to, raw } => {
                    let field = if *raw {
                        left.raw_field(*from)
                    } else {
                        left.field(*from)
                    };
                    target.field_mut(*to).set_field(field);
                }
                Instr::Right { snap, to, .. } => {
                    target.field_mut(*to).set_field(right.field(*snap));
                }
            }
        }
    }

    /// Assemble from a live right-side row (exist joins probe the right
    /// side directly, no snapshot in between).
    pub(crate) fn build_from_right(
        &self,
        target: &mut dyn DataRowMut,
        right: &dyn DataRow,
        key: i32,
    ) {
        for instr in &self.instructions {
            match instr {
                Instr::Key { to } => target.field_mut(*to).set_int(key),
                Instr::Left { .. } => {
                    panic!("left field in a right-side-only builder")
                }
                Instr::Right { col, to, raw, .. } => {
                    let field = if *raw {
                        right.raw_field(*col)
                    } else {
                        right.field(*col)
                    };
                    target.field_mut(*to).set_field(field);
                }
            }
        }
    }
}

/// Inner join with row-materialized output.
pub struct HashJoin {
    left_key: usize,
    right_key: usize,
    raw_key: bool,
    builder: Arc<RowBuilder>,
}

impl HashJoin {
    pub fn new(left_key: usize, right_key: usize, builder: RowBuilder) -> Self {
        Self {
            left_key,
            right_key,
            raw_key: false,
            builder: Arc::new(builder),
        }
    }

    /// Key on undecoded dictionary ordinals. Only sound when both
    /// sides scan the same file column, so they share a dictionary.
    pub fn use_raw_key(&mut self) {
        self.raw_key = true;
    }

    pub fn join(&self, left: TableRef, right: TableRef) -> TableRef {
        let mut map = Int32SparseMap::new();
        let right_key = self.right_key;
        let raw_key = self.raw_key;
        let builder = Arc::clone(&self.builder);
        right.blocks().foreach(|block| {
            let mut rows = block.rows();
            while let Some(row) = rows.next_row() {
                map.insert(key_of(row, right_key, raw_key), builder.snapshot(row));
            }
        });
        log::debug!("hash join: built {} keys", map.len());
        let map = Arc::new(map);
        let builder = Arc::clone(&self.builder);
        let left_key = self.left_key;
        Arc::new(TableView::new(
            self.builder.output_col_size().to_vec(),
            move || {
                let map = Arc::clone(&map);
                let builder = Arc::clone(&builder);
                left.blocks()
                    .map(move |block| probe_rows(&map, &builder, left_key, raw_key, &block))
            },
        ))
    }
}

fn probe_rows(
    map: &Int32SparseMap<MemDataRow>,
    builder: &RowBuilder,
    left_key: usize,
    raw_key: bool,
    block: &Block,
) -> Arc<Block> {
    let capacity = block.size() as usize;
    let mut out = if builder.use_vertical() {
        Block::Col(ColumnBlock::new(capacity, builder.output_col_size().to_vec()))
    } else {
        Block::Row(RowBlock::new(
            capacity,
            offsets_of(builder.output_col_size()),
        ))
    };
    let mut produced = 0usize;
    {
        let mut writer = out.rows_mut();
        let mut rows = block.rows();
        while let Some(row) = rows.next_row() {
            let key = key_of(row, left_key, raw_key);
            if let Some(snapshot) = map.get(key) {
                let mut target = writer.row(produced);
                builder.build(&mut target, row, snapshot, key);
                produced += 1;
            }
        }
    }
    out.resize(produced);
    Arc::new(out)
}

impl ExecNode for HashJoin {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.join(inputs[0].table(), inputs[1].table()))
    }
}

/// Column-concat output builder for `HashColumnJoin`: left fields are
/// column moves, right fields per-row materializations.
pub struct ColumnBuilder {
    col_size: Vec<u32>,
    left_inst: Vec<(u8, u8)>,
    right_inst: Vec<(usize, usize)>,
    right_snapshoter: Snapshoter,
    right_col_size: Vec<u32>,
}

impl ColumnBuilder {
    pub fn new(fields: Vec<JoinField>) -> Self {
        let mut col_size = Vec::with_capacity(fields.len());
        let mut left_inst = Vec::new();
        let mut right_inst = Vec::new();
        let mut right_col_size = Vec::new();
        let mut snapshot = RowCopyFactory::new();
        let mut snap_next = 0usize;
        for (position, field) in fields.iter().enumerate() {
            col_size.push(field.width());
            if field.is_right() {
                snapshot = snapshot.field(field.kind(), field.col(), snap_next as u32);
                right_col_size.push(field.width());
                right_inst.push((snap_next, position));
                snap_next += 1;
            } else {
                left_inst.push((field.col() as u8, position as u8));
            }
        }
        Self {
            col_size,
            left_inst,
            right_inst,
            right_snapshoter: snapshot.build_snapshot(),
            right_col_size,
        }
    }

    pub fn use_vertical(&self) -> bool {
        true
    }

    pub fn num_fields(&self) -> usize {
        self.col_size.len()
    }

    pub fn num_string_fields(&self) -> usize {
        self.col_size.iter().filter(|w| **w == 2).count()
    }

    pub fn output_col_size(&self) -> &[u32] {
        &self.col_size
    }

    pub fn left_inst(&self) -> &[(u8, u8)] {
        &self.left_inst
    }

    pub fn right_inst(&self) -> &[(usize, usize)] {
        &self.right_inst
    }

    pub fn right_col_size(&self) -> &[u32] {
        &self.right_col_size
    }

    pub fn snapshot(&self, row: &dyn DataRow) -> MemDataRow {
        self.right_snapshoter.snapshot(row)
    }
}

/// 1:1 inner join producing vertical blocks; the probe side's columns
/// are moved into the output, the build side's materialized by lookup.
pub struct HashColumnJoin {
    left_key: usize,
    right_key: usize,
    raw_key: bool,
    builder: Arc<ColumnBuilder>,
}

impl HashColumnJoin {
    pub fn new(left_key: usize, right_key: usize, builder: ColumnBuilder) -> Self {
        Self {
            left_key,
            right_key,
            raw_key: false,
            builder: Arc::new(builder),
        }
    }

    /// Key on undecoded dictionary ordinals (shared-dictionary case).
    pub fn use_raw_key(&mut self) {
        self.raw_key = true;
    }

    pub fn join(&self, left: TableRef, right: TableRef) -> TableRef {
        let mut map = Int32SparseMap::new();
        let right_key = self.right_key;
        let raw_key = self.raw_key;
        let builder = Arc::clone(&self.builder);
        right.blocks().foreach(|block| {
            let mut rows = block.rows();
            while let Some(row) = rows.next_row() {
                map.insert(key_of(row, right_key, raw_key), builder.snapshot(row));
            }
        });
        let map = Arc::new(map);
        let builder = Arc::clone(&self.builder);
        let left_key = self.left_key;
        Arc::new(TableView::new(
            self.builder.output_col_size().to_vec(),
            move || {
                let map = Arc::clone(&map);
                let builder = Arc::clone(&builder);
                left.blocks()
                    .map(move |block| probe_columns(&map, &builder, left_key, raw_key, block))
            },
        ))
    }
}

fn probe_columns(
    map: &Int32SparseMap<MemDataRow>,
    builder: &ColumnBuilder,
    left_key: usize,
    raw_key: bool,
    block: Arc<Block>,
) -> Arc<Block> {
    let size = block.size() as usize;
    let mut out = ColumnBlock::new(size, builder.output_col_size().to_vec());
    if map.is_empty() {
        out.compact(0);
        return Arc::new(Block::Col(out));
    }
    // materialize right columns first, while the probe block is intact
    {
        let mut rows = block.rows();
        let mut index = 0usize;
        while let Some(row) = rows.next_row() {
            let key = key_of(row, left_key, raw_key);
            let snapshot = map
                .get(key)
                .unwrap_or_else(|| panic!("probe key {} missing on build side", key));
            for (snap, to) in builder.right_inst() {
                out.field_mut_at(*to, index).set_field(snapshot.field(*snap));
            }
            index += 1;
        }
    }
    // then take the probe block's own columns
    match Arc::try_unwrap(block) {
        Ok(Block::Col(mut col)) => {
            out.merge(&mut col, builder.left_inst());
        }
        Ok(other) => copy_left_columns(&mut out, &other, builder.left_inst()),
        Err(shared) => match &*shared {
            Block::Col(col) => {
                let inst = builder.left_inst();
                out.copy_columns(col, inst);
            }
            other => copy_left_columns(&mut out, other, builder.left_inst()),
        },
    }
    Arc::new(Block::Col(out))
}

fn copy_left_columns(out: &mut ColumnBlock, block: &Block, inst: &[(u8, u8)]) {
    let mut rows = block.rows();
    let mut index = 0usize;
    while let Some(row) = rows.next_row() {
        for (from, to) in inst {
            out.field_mut_at(*to as usize, index)
                .set_field(row.field(*from as usize));
        }
        index += 1;
    }
}

impl ExecNode for HashColumnJoin {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.join(inputs[0].table(), inputs[1].table()))
    }
}

/// Semi join: keeps the left rows whose key exists on the right, as a
/// masked block.
pub struct HashFilterJoin {
    left_key: usize,
    right_key: usize,
    raw_key: bool,
}

impl HashFilterJoin {
    pub fn new(left_key: usize, right_key: usize) -> Self {
        Self {
            left_key,
            right_key,
            raw_key: false,
        }
    }

    /// Key on undecoded dictionary ordinals (shared-dictionary case).
    pub fn use_raw_key(&mut self) {
        self.raw_key = true;
    }

    pub fn join(&self, left: TableRef, right: TableRef) -> TableRef {
        let mut keys = Int32SparseMap::new();
        let right_key = self.right_key;
        let raw_key = self.raw_key;
        right.blocks().foreach(|block| {
            let mut rows = block.rows();
            loop {
                let key = match rows.next_row() {
                    Some(row) => key_of(row, right_key, raw_key),
                    None => break,
                };
                keys.insert(key, ());
            }
        });
        let keys = Arc::new(keys);
        let left_key = self.left_key;
        Arc::new(TableView::new(left.col_size().to_vec(), move || {
            let keys = Arc::clone(&keys);
            left.blocks().map(move |block| {
                let mut bitmap = Bitmap::empty(block.limit());
                let mut rows = block.rows();
                loop {
                    let key = match rows.next_row() {
                        Some(row) => key_of(row, left_key, raw_key),
                        None => break,
                    };
                    if keys.contains(key) {
                        bitmap.set(rows.pos());
                    }
                }
                block.mask(bitmap)
            })
        }))
    }
}

impl ExecNode for HashFilterJoin {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.join(inputs[0].table(), inputs[1].table()))
    }
}

/// Exist join: the *right* side is the probe; emits one row per right
/// row whose key appears on the left, in right-side input order.
pub struct HashExistJoin {
    left_key: usize,
    right_key: usize,
    raw_key: bool,
    builder: Arc<RowBuilder>,
}

impl HashExistJoin {
    pub fn new(left_key: usize, right_key: usize, builder: RowBuilder) -> Self {
        Self {
            left_key,
            right_key,
            raw_key: false,
            builder: Arc::new(builder),
        }
    }

    /// Key on undecoded dictionary ordinals (shared-dictionary case).
    pub fn use_raw_key(&mut self) {
        self.raw_key = true;
    }

    pub fn num_fields(&self) -> usize {
        self.builder.num_fields()
    }

    pub fn join(&self, left: TableRef, right: TableRef) -> TableRef {
        let mut keys = Int32SparseMap::new();
        let left_key = self.left_key;
        let raw_key = self.raw_key;
        left.blocks().foreach(|block| {
            let mut rows = block.rows();
            loop {
                let key = match rows.next_row() {
                    Some(row) => key_of(row, left_key, raw_key),
                    None => break,
                };
                keys.insert(key, ());
            }
        });
        log::debug!("exist join: built {} keys", keys.len());
        let keys = Arc::new(keys);
        let builder = Arc::clone(&self.builder);
        let right_key = self.right_key;
        Arc::new(TableView::new(
            self.builder.output_col_size().to_vec(),
            move || {
                let keys = Arc::clone(&keys);
                let builder = Arc::clone(&builder);
                right.blocks().map(move |block| {
                    let capacity = block.size() as usize;
                    let mut out = Block::Row(RowBlock::new(
                        capacity,
                        offsets_of(builder.output_col_size()),
                    ));
                    let mut produced = 0usize;
                    {
                        let mut writer = out.rows_mut();
                        let mut rows = block.rows();
                        while let Some(row) = rows.next_row() {
                            let key = key_of(row, right_key, raw_key);
                            if keys.contains(key) {
                                let mut target = writer.row(produced);
                                builder.build_from_right(&mut target, row, key);
                                produced += 1;
                            }
                        }
                    }
                    out.resize(produced);
                    Arc::new(out)
                })
            },
        ))
    }
}

impl ExecNode for HashExistJoin {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        NodeOutput::Table(self.join(inputs[0].table(), inputs[1].table()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{MemTable, Table};

    #[test]
    fn test_row_builder_layout() {
        let rb = RowBuilder::new(vec![jl(0), jl(1), jr(0), jr(2)]);
        assert_eq!(rb.num_fields(), 4);
        assert_eq!(rb.num_string_fields(), 0);
        assert!(!rb.use_vertical());

        let mut left = MemDataRow::new(4);
        let mut right = MemDataRow::new(3);
        left.field_mut(0).set_int(424);
        left.field_mut(1).set_int(3243);
        left.field_mut(2).set_int(87452);
        left.field_mut(3).set_int(21232323);
        right.field_mut(0).set_int(33244);
        right.field_mut(1).set_int(34359543);
        right.field_mut(2).set_int(33901);

        let rsn = rb.snapshot(&right);
        assert_eq!(rsn.field(0).as_int(), 33244);
        assert_eq!(rsn.field(1).as_int(), 33901);
        // the snapshoter takes the right columns from any row shape
        let lsn = rb.snapshot(&left);
        assert_eq!(lsn.field(0).as_int(), 424);
        assert_eq!(lsn.field(1).as_int(), 87452);

        let mut output = MemDataRow::new(4);
        rb.build(&mut output, &left, &rsn, 0);
        assert_eq!(output.field(0).as_int(), 424);
        assert_eq!(output.field(1).as_int(), 3243);
        assert_eq!(output.field(2).as_int(), 33244);
        assert_eq!(output.field(3).as_int(), 34359543);
    }

    #[test]
    fn test_row_builder_with_strings() {
        let rb = RowBuilder::new(vec![jl(0), jl(1), jr(0), jr(2), jls(3), jrs(3)]);
        assert_eq!(rb.num_fields(), 6);
        assert_eq!(rb.num_string_fields(), 2);

        let mut left = MemDataRow::with_offsets(vec![0, 1, 2, 3, 5]);
        let mut right = MemDataRow::with_offsets(vec![0, 1, 2, 4]);
        left.field_mut(0).set_int(424);
        left.field_mut(1).set_int(3243);
        left.field_mut(2).set_int(87452);
        left.field_mut(3).set_bytes(b"ref");
        right.field_mut(0).set_int(33244);
        right.field_mut(1).set_int(34359543);
        right.field_mut(2).set_bytes(b"ddb=");

        let rsn = rb.snapshot(&right);
        let mut output = MemDataRow::with_offsets(vec![0, 1, 2, 3, 4, 6, 8]);
        rb.build(&mut output, &left, &rsn, 0);
        assert_eq!(output.field(0).as_int(), 424);
        assert_eq!(output.field(1).as_int(), 3243);
        assert_eq!(output.field(2).as_int(), 33244);
        assert_eq!(output.field(3).as_int(), 34359543);
        assert_eq!(output.field(4).as_bytes(), b"ref");
        assert_eq!(output.field(5).as_bytes(), b"ddb=");
    }

    #[test]
    fn test_column_builder_instructions() {
        let cb = ColumnBuilder::new(vec![jl(0), jl(1), jr(2), jr(0)]);
        assert!(cb.use_vertical());
        assert_eq!(cb.num_string_fields(), 0);
        assert_eq!(cb.num_fields(), 4);
        assert_eq!(cb.right_col_size(), &[1, 1]);
        assert_eq!(cb.left_inst(), &[(0, 0), (1, 1)]);
        assert_eq!(cb.right_inst(), &[(0, 2), (1, 3)]);
    }

    #[test]
    fn test_column_builder_with_strings() {
        let cb = ColumnBuilder::new(vec![jl(0), jl(1), jr(2), jr(0), jls(3), jrs(3)]);
        assert_eq!(cb.num_string_fields(), 2);
        assert_eq!(cb.num_fields(), 6);
        assert_eq!(cb.right_col_size(), &[1, 1, 2]);
        assert_eq!(cb.left_inst(), &[(0, 0), (1, 1), (3, 4)]);
        assert_eq!(cb.right_inst(), &[(0, 2), (1, 3), (2, 5)]);
    }

    fn two_col_table(rows: &[(i32, i32)]) -> TableRef {
        let mut table = MemTable::make(2, false);
        {
            let block = table.allocate(rows.len());
            let mut writer = block.rows_mut();
            for (i, (a, b)) in rows.iter().enumerate() {
                let mut row = writer.row(i);
                row.field_mut(0).set_int(*a);
                row.field_mut(1).set_int(*b);
            }
        }
        Arc::new(table)
    }

    #[test]
    fn test_hash_join_cardinality() {
        let left = two_col_table(&[(1, 10), (2, 20), (3, 30), (2, 21), (9, 90)]);
        let right = two_col_table(&[(2, 200), (3, 300), (4, 400)]);
        let join = HashJoin::new(0, 0, RowBuilder::new(vec![jl(1), jr(1)]));
        let joined = join.join(left, right);
        let blocks = joined.blocks().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].size(), 3);
        let mut rows = blocks[0].rows();
        // probe order preserved
        assert_eq!(rows.row(0).field(0).as_int(), 20);
        assert_eq!(rows.row(0).field(1).as_int(), 200);
        assert_eq!(rows.row(1).field(0).as_int(), 30);
        assert_eq!(rows.row(2).field(0).as_int(), 21);
    }

    #[test]
    fn test_hash_join_empty_build() {
        let left = two_col_table(&[(1, 10), (2, 20)]);
        let right = two_col_table(&[]);
        let join = HashJoin::new(0, 0, RowBuilder::new(vec![jl(1), jr(1)]));
        let joined = join.join(left, right);
        assert_eq!(joined.total_rows(), 0);
    }

    #[test]
    fn test_filter_join_masks() {
        let left = two_col_table(&[(5, 0), (6, 0), (7, 0), (8, 0)]);
        let right = two_col_table(&[(6, 0), (8, 0), (99, 0)]);
        let join = HashFilterJoin::new(0, 0);
        let joined = join.join(left, right);
        let blocks = joined.blocks().collect();
        assert_eq!(blocks[0].size(), 2);
        assert!(matches!(&*blocks[0], Block::Masked(_)));
    }

    #[test]
    fn test_exist_join_probes_right() {
        let left = two_col_table(&[(35, 0), (99, 0), (35, 1)]);
        let right = two_col_table(&[(35, 0), (40, 1), (99, 2)]);
        let join = HashExistJoin::new(0, 0, RowBuilder::new(vec![jr(0), jr(1)]));
        assert_eq!(join.num_fields(), 2);
        let joined = join.join(left, right);
        let blocks = joined.blocks().collect();
        assert_eq!(blocks[0].size(), 2);
        let mut rows = blocks[0].rows();
        assert_eq!(rows.row(0).field(0).as_int(), 35);
        assert_eq!(rows.row(0).field(1).as_int(), 0);
        assert_eq!(rows.row(1).field(0).as_int(), 99);
        assert_eq!(rows.row(1).field(1).as_int(), 2);
    }
}
