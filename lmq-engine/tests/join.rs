//! Hash-join family over the lineitem fixture: row-materialized inner
//! join (with and without the key kept), semi join, exist join, and
//! the vertical column join.

mod common;

use std::sync::Arc;

use common::{
    write_lineitem, write_lineitem_single_group, LineItem, ORDERKEY, PARTKEY, QUANTITY, SHIPDATE,
};
use lmq_engine::data::{Block, DataRow, DataRowMut};
use lmq_engine::ops::join::{
    jl, jls, jr, ColumnBuilder, HashColumnJoin, HashExistJoin, HashFilterJoin, HashJoin,
    RowBuilder,
};
use lmq_engine::scan::ParquetTable;
use lmq_engine::table::{MemTable, Table, TableRef};
use rand::{Rng, SeedableRng};

const BUILD_KEYS: [i32; 5] = [35, 99, 1154, 4452, 5987];

fn lineitem_table(path: &std::path::Path) -> TableRef {
    Arc::new(ParquetTable::open(path, 0).unwrap())
}

fn build_side(keys: &[i32]) -> TableRef {
    let mut table = MemTable::make(2, false);
    {
        let block = table.allocate(keys.len());
        let mut writer = block.rows_mut();
        for (i, key) in keys.iter().enumerate() {
            let mut row = writer.row(i);
            row.field_mut(0).set_int(*key);
            row.field_mut(1).set_int(i as i32);
        }
    }
    Arc::new(table)
}

fn matching_rows(rows: &[LineItem]) -> Vec<(&LineItem, i32)> {
    rows.iter()
        .filter_map(|r| {
            BUILD_KEYS
                .iter()
                .position(|k| *k == r.orderkey)
                .map(|payload| (r, payload as i32))
        })
        .collect()
}

fn collect_rows(table: &TableRef, cols: usize) -> Vec<Vec<i64>> {
    let mut out = Vec::new();
    table.blocks().foreach(|block| {
        let mut rows = block.rows();
        loop {
            let collected = match rows.next_row() {
                Some(row) => (0..cols).map(|c| row.field(c).as_long()).collect::<Vec<_>>(),
                None => break,
            };
            out.push(collected);
        }
    });
    out
}

#[test]
fn test_hash_join_against_lineitem() {
    let fixture = write_lineitem();
    let left = lineitem_table(&fixture.path);
    let right = build_side(&BUILD_KEYS);

    let join = HashJoin::new(
        ORDERKEY,
        0,
        RowBuilder::new(vec![
            jl(PARTKEY as u32),
            jl(QUANTITY as u32),
            jr(1),
            jls(SHIPDATE as u32),
        ]),
    );
    let joined = join.join(left, right);
    assert_eq!(joined.num_fields(), 4);

    let expected = matching_rows(&fixture.rows);
    assert_eq!(expected.len(), 22);

    let mut seen = 0usize;
    joined.blocks().foreach(|block| {
        let mut rows = block.rows();
        for _ in 0..block.size() {
            let row = rows.next_row().unwrap();
            let (item, payload) = expected[seen];
            assert_eq!(row.field(0).as_int(), item.partkey);
            assert_eq!(row.field(1).as_int(), item.quantity);
            assert_eq!(row.field(2).as_int(), payload);
            assert_eq!(row.field(3).as_bytes(), item.shipdate.as_bytes());
            seen += 1;
        }
    });
    assert_eq!(seen, 22);

    // key 35 comes first in the fixture: partkey/quantity/shipdate runs
    let head: Vec<(i32, i32, &str)> = expected[..6]
        .iter()
        .map(|(r, _)| (r.partkey, r.quantity, r.shipdate))
        .collect();
    assert_eq!(
        head,
        vec![
            (1, 4, "1996-02-21"),
            (162, 1, "1996-01-22"),
            (121, 4, "1996-01-19"),
            (86, 7, "1995-11-26"),
            (120, 7, "1995-11-08"),
            (31, 7, "1996-02-01"),
        ]
    );
}

#[test]
fn test_hash_join_keeps_key() {
    let fixture = write_lineitem();
    let left = lineitem_table(&fixture.path);
    let right = build_side(&BUILD_KEYS);

    let join = HashJoin::new(
        ORDERKEY,
        0,
        RowBuilder::with_options(
            vec![
                jl(PARTKEY as u32),
                jl(QUANTITY as u32),
                jr(1),
                jls(SHIPDATE as u32),
            ],
            true,
            false,
        ),
    );
    let joined = join.join(left, right);
    assert_eq!(joined.num_fields(), 5);

    let expected = matching_rows(&fixture.rows);
    let mut seen = 0usize;
    joined.blocks().foreach(|block| {
        let mut rows = block.rows();
        for _ in 0..block.size() {
            let row = rows.next_row().unwrap();
            let (item, payload) = expected[seen];
            assert_eq!(row.field(0).as_int(), item.orderkey);
            assert_eq!(row.field(1).as_int(), item.partkey);
            assert_eq!(row.field(2).as_int(), item.quantity);
            assert_eq!(row.field(3).as_int(), payload);
            assert_eq!(row.field(4).as_bytes(), item.shipdate.as_bytes());
            seen += 1;
        }
    });
    assert_eq!(seen, 22);
}

#[test]
fn test_hash_filter_join_is_semi() {
    let fixture = write_lineitem();
    let left = lineitem_table(&fixture.path);
    let right = build_side(&BUILD_KEYS);

    let join = HashFilterJoin::new(ORDERKEY, 0);
    let joined = join.join(left, right);
    assert_eq!(joined.total_rows(), 22);
    let blocks = joined.blocks().collect();
    assert!(blocks.iter().all(|b| matches!(&**b, Block::Masked(_))));
    // surviving rows keep their full lineitem shape
    let mut rows = blocks[0].rows();
    let row = rows.next_row().unwrap();
    assert_eq!(row.field(ORDERKEY).as_int(), 35);
}

#[test]
fn test_hash_exist_join_probes_right() {
    let fixture = write_lineitem();
    let left = lineitem_table(&fixture.path);
    let right = build_side(&[35, 99, 1154, 4452, 5987, 14145, 21859, 40]);

    let join = HashExistJoin::new(ORDERKEY, 0, RowBuilder::new(vec![jr(0), jr(1)]));
    assert_eq!(join.num_fields(), 2);
    let joined = join.join(left, right);

    let rows = collect_rows(&joined, 2);
    assert_eq!(
        rows,
        vec![vec![35, 0], vec![99, 1], vec![1154, 2], vec![4452, 3], vec![5987, 4]]
    );
}

#[test]
fn test_hash_column_join_vertical() {
    let data: [i32; 10] = [35, 99, 1154, 4452, 5987, 14145, 21859, 40, 1230, 3234];
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);

    let mut left = MemTable::make(2, true);
    let mut left_keys: Vec<Vec<i32>> = Vec::new();
    for rows in [100usize, 150] {
        let block = left.allocate(rows);
        let mut writer = block.rows_mut();
        let mut keys = Vec::with_capacity(rows);
        for i in 0..rows {
            let k: i32 = rng.gen_range(0..10);
            let mut row = writer.row(i);
            row.field_mut(0).set_int(k);
            row.field_mut(1).set_double(rng.gen_range(1.0..2.0));
            keys.push(k);
        }
        left_keys.push(keys);
    }

    let right = build_side(&data);

    let join = HashColumnJoin::new(0, 1, ColumnBuilder::new(vec![jl(0), jl(1), jr(0)]));
    let joined = join.join(Arc::new(left), right);
    assert_eq!(joined.num_fields(), 3);

    let blocks = joined.blocks().collect();
    assert_eq!(blocks.len(), 2);
    for (block, keys) in blocks.iter().zip(left_keys.iter()) {
        assert!(matches!(&**block, Block::Col(_)));
        assert_eq!(block.size(), keys.len() as u64);
        let mut rows = block.rows();
        for (i, k) in keys.iter().enumerate() {
            let row = rows.row(i as u64);
            assert_eq!(row.field(0).as_int(), *k);
            assert_eq!(row.field(2).as_int(), data[*k as usize]);
        }
    }
}

#[test]
fn test_raw_key_semi_join_on_shared_dictionary() {
    use lmq_engine::ops::filter::{simple_pred, ColFilter};

    // one row group, so left and right probe the same dictionary and
    // shipdate ordinals are comparable without decoding
    let fixture = write_lineitem_single_group();
    let left = lineitem_table(&fixture.path);
    let right = {
        let table = lineitem_table(&fixture.path);
        let filter = ColFilter::new(vec![simple_pred(ORDERKEY as u32, |f| f.as_int() == 35)]);
        filter.filter(table)
    };

    let mut join = HashFilterJoin::new(SHIPDATE, SHIPDATE);
    join.use_raw_key();
    let joined = join.join(left, right);

    let dates_of_35: Vec<&str> = fixture
        .rows
        .iter()
        .filter(|r| r.orderkey == 35)
        .map(|r| r.shipdate)
        .collect();
    let expected = fixture
        .rows
        .iter()
        .filter(|r| dates_of_35.contains(&r.shipdate))
        .count() as u64;
    assert_eq!(expected, 6);
    assert_eq!(joined.total_rows(), expected);
}

#[test]
fn test_join_on_masked_left_preserves_live_rows() {
    use lmq_engine::ops::filter::{simple_pred, ColFilter};

    let fixture = write_lineitem();
    let left = lineitem_table(&fixture.path);
    let filter = ColFilter::new(vec![simple_pred(QUANTITY as u32, |f| f.as_int() >= 4)]);
    let filtered = filter.filter(left);

    let right = build_side(&BUILD_KEYS);
    let join = HashJoin::new(
        ORDERKEY,
        0,
        RowBuilder::new(vec![jl(PARTKEY as u32), jr(1)]),
    );
    let joined = join.join(filtered, right);

    let expected: Vec<i64> = matching_rows(&fixture.rows)
        .into_iter()
        .filter(|(r, _)| r.quantity >= 4)
        .map(|(r, _)| r.partkey as i64)
        .collect();
    let got: Vec<i64> = collect_rows(&joined, 2).into_iter().map(|r| r[0]).collect();
    assert_eq!(got, expected);
}
