//! File scan behavior over a generated fixture: projection, decoded
//! and raw column access, dictionary loading, masking algebra and the
//! raw predicate path.

mod common;

use std::ops::ControlFlow;
use std::sync::Arc;

use common::{write_lineitem, date, ORDERKEY, QUANTITY, SHIPDATE};
use lmq_engine::bitmap::Bitmap;
use lmq_engine::data::{Block, DataRow};
use lmq_engine::dict::Dictionary;
use lmq_engine::ops::filter::{dict_range_le, raw_pred, simple_pred, ColFilter};
use lmq_engine::scan::ParquetTable;
use lmq_engine::table::Table;

#[test]
fn test_open_and_block_structure() {
    let fixture = write_lineitem();
    let table = ParquetTable::open(&fixture.path, 0).unwrap();
    assert_eq!(table.num_fields(), 6);
    assert_eq!(table.col_size(), &[1, 1, 1, 1, 1, 2]);
    assert_eq!(table.num_rows(), fixture.rows.len() as u64);
    assert_eq!(table.num_row_groups(), 2);

    let blocks = table.blocks().collect();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].size(), 40);
    assert_eq!(blocks[0].id(), 0);
    assert_eq!(
        blocks.iter().map(|b| b.size()).sum::<u64>(),
        fixture.rows.len() as u64
    );
}

#[test]
fn test_missing_file_is_an_open_error() {
    let err = ParquetTable::open("/nonexistent/q.parquet", 0).unwrap_err();
    assert!(matches!(err, lmq_core::errors::Error::FileOpen(_)));
}

#[test]
fn test_decoded_column_iterator() {
    let fixture = write_lineitem();
    let table = ParquetTable::open(&fixture.path, 0).unwrap();
    let blocks = table.blocks().collect();

    let mut row_at = 0usize;
    for block in &blocks {
        let mut quantities = block.col(QUANTITY);
        let mut dates = block.col(SHIPDATE);
        for i in 0..block.size() {
            let expected = &fixture.rows[row_at];
            assert_eq!(quantities.field(i).as_int(), expected.quantity);
            assert_eq!(dates.field(i).as_bytes(), expected.shipdate.as_bytes());
            row_at += 1;
        }
        // backward seek re-opens the reader
        assert_eq!(
            quantities.field(0).as_int(),
            fixture.rows[row_at - block.size() as usize].quantity
        );
    }
}

#[test]
fn test_row_iterator_and_snapshot() {
    let fixture = write_lineitem();
    let table = ParquetTable::open(&fixture.path, 0).unwrap();
    let blocks = table.blocks().collect();
    let snap = {
        let mut rows = blocks[0].rows();
        let row = rows.row(5); // first orderkey-35 row
        lmq_engine::data::MemDataRow::snapshot_of(row)
    };
    drop(blocks);
    assert_eq!(snap.field(ORDERKEY).as_int(), 35);
    assert_eq!(snap.field(1).as_int(), 1);
    assert_eq!(snap.field(SHIPDATE).as_bytes(), b"1996-02-21");
}

#[test]
fn test_load_dictionary_and_raw_ordinals() {
    let fixture = write_lineitem();
    let table = ParquetTable::open(&fixture.path, 0).unwrap();
    let dict: Dictionary<Box<[u8]>> = table.load_dictionary(SHIPDATE).unwrap();
    assert_eq!(dict.len(), table.dictionary_size(SHIPDATE).unwrap());

    // every raw ordinal of row group 0 translates back to its value
    let blocks = table.blocks().collect();
    let mut rows = blocks[0].rows();
    for (i, expected) in fixture.rows.iter().take(40).enumerate() {
        let row = rows.row(i as u64);
        let ordinal = row.raw_field(SHIPDATE).as_int();
        assert!(ordinal >= 0 && (ordinal as usize) < dict.len());
        assert_eq!(&**dict.value(ordinal as usize), expected.shipdate.as_bytes());
    }
}

#[test]
fn test_mask_algebra_on_file_blocks() {
    let fixture = write_lineitem();
    let table = ParquetTable::open(&fixture.path, 0).unwrap();
    let blocks = table.blocks().collect();
    let block = &blocks[0];

    let mask = Bitmap::from_indices(block.limit(), &[0, 5, 6, 39]);
    let masked = block.mask(mask.clone());
    assert_eq!(masked.size(), mask.cardinality());
    assert_eq!(masked.limit(), block.limit());

    // chained masks survive exactly the intersection
    let second = Bitmap::from_indices(block.limit(), &[5, 39, 17]);
    let chained = masked.mask(second.clone());
    let combined = block.mask(&mask & &second);
    assert_eq!(chained.size(), combined.size());
    assert_eq!(chained.size(), 2);

    let mut survivors = Vec::new();
    let mut rows = chained.rows();
    loop {
        match rows.next_row() {
            Some(row) => survivors.push(row.field(ORDERKEY).as_int()),
            None => break,
        }
    }
    assert_eq!(
        survivors,
        vec![fixture.rows[5].orderkey, fixture.rows[39].orderkey]
    );
}

#[test]
fn test_raw_predicate_matches_reference() {
    let fixture = write_lineitem();
    let table = Arc::new(ParquetTable::open(&fixture.path, 0).unwrap());
    let filter = ColFilter::new(vec![raw_pred(SHIPDATE as u32, || {
        dict_range_le(date("1994-01-01"), date("1995-01-01"))
    })]);
    let filtered = filter.filter(table);
    let expected = fixture
        .rows
        .iter()
        .filter(|r| ("1994-01-01".."1995-01-01").contains(&r.shipdate))
        .count() as u64;
    assert!(expected > 0);
    assert_eq!(filtered.total_rows(), expected);
}

#[test]
fn test_raw_and_simple_predicates_compose() {
    let fixture = write_lineitem();
    let table = Arc::new(ParquetTable::open(&fixture.path, 0).unwrap());
    let filter = ColFilter::new(vec![
        raw_pred(SHIPDATE as u32, || {
            dict_range_le(date("1992-01-01"), date("1997-01-01"))
        }),
        simple_pred(QUANTITY as u32, |f| f.as_int() < 5),
    ]);
    let filtered = filter.filter(table);
    let expected = fixture
        .rows
        .iter()
        .filter(|r| r.shipdate < "1997-01-01" && r.quantity < 5)
        .count() as u64;
    assert_eq!(filtered.total_rows(), expected);

    // filtered blocks stay masked views over the file blocks
    let blocks = filtered.blocks().collect();
    assert!(blocks.iter().all(|b| matches!(&**b, Block::Masked(_))));
}

#[test]
fn test_stream_early_stop() {
    let fixture = write_lineitem();
    let table = ParquetTable::open(&fixture.path, 0).unwrap();
    let mut seen = 0;
    table.blocks().foreach_while(|_| {
        seen += 1;
        ControlFlow::Break(())
    });
    assert_eq!(seen, 1);
}

#[test]
fn test_projection_mask() {
    let fixture = write_lineitem();
    let table =
        ParquetTable::open_cols(&fixture.path, &[ORDERKEY as u32, QUANTITY as u32]).unwrap();
    let blocks = table.blocks().collect();
    let mut rows = blocks[0].rows();
    let row = rows.row(0);
    assert_eq!(row.field(ORDERKEY).as_int(), fixture.rows[0].orderkey);
    assert_eq!(row.field(QUANTITY).as_int(), fixture.rows[0].quantity);
}
