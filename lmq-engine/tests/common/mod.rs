//! Shared fixtures: a small lineitem-shaped parquet file with known
//! contents, dictionary-encoded and split over two row groups.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use arrow_array::{Float64Array, Int32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tempfile::TempDir;

pub const ORDERKEY: usize = 0;
pub const PARTKEY: usize = 1;
pub const QUANTITY: usize = 2;
pub const EXTENDEDPRICE: usize = 3;
pub const DISCOUNT: usize = 4;
pub const SHIPDATE: usize = 5;

#[derive(Clone, Debug)]
pub struct LineItem {
    pub orderkey: i32,
    pub partkey: i32,
    pub quantity: i32,
    pub extendedprice: f64,
    pub discount: f64,
    pub shipdate: &'static str,
}

fn item(
    orderkey: i32,
    partkey: i32,
    quantity: i32,
    extendedprice: f64,
    discount: f64,
    shipdate: &'static str,
) -> LineItem {
    LineItem {
        orderkey,
        partkey,
        quantity,
        extendedprice,
        discount,
        shipdate,
    }
}

/// The fixture rows, sorted by order key. Keys 35, 99, 1154, 4452 and
/// 5987 are the interesting ones (6 + 4 + 6 + 2 + 4 = 22 rows); the
/// rest is filler. 40, 14145 and 21859 never appear.
pub fn lineitem_rows() -> Vec<LineItem> {
    let mut rows = vec![
        item(1, 7, 17, 901.0, 0.04, "1996-03-13"),
        item(2, 88, 38, 342.5, 0.00, "1997-01-28"),
        item(3, 29, 45, 83.25, 0.06, "1994-02-02"),
        item(7, 182, 12, 733.2, 0.07, "1996-05-07"),
        item(32, 198, 28, 92.0, 0.05, "1995-10-23"),
        // orderkey 35
        item(35, 1, 4, 450.0, 0.03, "1996-02-21"),
        item(35, 162, 1, 56.1, 0.00, "1996-01-22"),
        item(35, 121, 4, 821.9, 0.09, "1996-01-19"),
        item(35, 86, 7, 198.6, 0.10, "1995-11-26"),
        item(35, 120, 7, 333.3, 0.01, "1995-11-08"),
        item(35, 31, 7, 620.4, 0.02, "1996-02-01"),
        item(37, 23, 8, 444.4, 0.08, "1992-07-21"),
        item(64, 200, 3, 75.0, 0.00, "1994-09-30"),
        // orderkey 99
        item(99, 88, 9, 810.0, 0.02, "1994-05-18"),
        item(99, 124, 5, 205.7, 0.00, "1994-05-06"),
        item(99, 135, 1, 98.3, 0.05, "1994-04-19"),
        item(99, 109, 2, 313.9, 0.04, "1994-07-04"),
        item(101, 64, 26, 120.75, 0.06, "1996-06-29"),
        item(640, 16, 33, 509.1, 0.03, "1993-03-27"),
        // orderkey 1154
        item(1154, 143, 10, 64.4, 0.00, "1992-04-17"),
        item(1154, 148, 7, 290.0, 0.09, "1992-04-22"),
        item(1154, 97, 1, 770.2, 0.01, "1992-06-07"),
        item(1154, 1, 2, 440.5, 0.07, "1992-03-30"),
        item(1154, 36, 2, 666.6, 0.02, "1992-02-26"),
        item(1154, 196, 8, 222.2, 0.05, "1992-03-04"),
        item(1500, 55, 19, 158.9, 0.10, "1995-01-15"),
        item(3000, 77, 41, 712.3, 0.00, "1993-12-01"),
        // orderkey 4452
        item(4452, 114, 8, 390.0, 0.06, "1994-10-06"),
        item(4452, 1, 8, 515.5, 0.03, "1994-10-08"),
        item(5000, 150, 22, 88.8, 0.04, "1992-11-11"),
        // orderkey 5987
        item(5987, 23, 2, 630.0, 0.01, "1996-09-13"),
        item(5987, 176, 5, 270.3, 0.08, "1996-11-28"),
        item(5987, 92, 3, 142.7, 0.05, "1996-10-30"),
        item(5987, 97, 1, 907.0, 0.00, "1996-10-15"),
        item(6000, 33, 14, 266.1, 0.02, "1997-08-09"),
        item(7100, 5, 36, 481.0, 0.07, "1995-06-17"),
    ];
    // pad with more filler so the file spans two row groups
    for i in 0..24 {
        rows.push(item(
            8000 + 7 * i,
            (i % 200) + 1,
            (i % 49) + 1,
            10.0 + i as f64,
            0.01 * (i % 10) as f64,
            "1998-01-01",
        ));
    }
    rows
}

pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
    pub rows: Vec<LineItem>,
}

/// Write the fixture with a 40-row row-group cap: 60 rows, two row
/// groups, dictionary-encoded pages throughout.
pub fn write_lineitem() -> Fixture {
    write_lineitem_grouped(40)
}

/// One row group, one dictionary per column; what ordinal-keyed
/// operations need.
pub fn write_lineitem_single_group() -> Fixture {
    write_lineitem_grouped(1000)
}

fn write_lineitem_grouped(row_group_size: usize) -> Fixture {
    let rows = lineitem_rows();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lineitem.parquet");
    let schema = Arc::new(Schema::new(vec![
        Field::new("orderkey", DataType::Int32, false),
        Field::new("partkey", DataType::Int32, false),
        Field::new("quantity", DataType::Int32, false),
        Field::new("extendedprice", DataType::Float64, false),
        Field::new("discount", DataType::Float64, false),
        Field::new("shipdate", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.orderkey).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.partkey).collect::<Vec<_>>(),
            )),
            Arc::new(Int32Array::from(
                rows.iter().map(|r| r.quantity).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.extendedprice).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.discount).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.shipdate).collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap();
    let props = WriterProperties::builder()
        .set_compression(Compression::UNCOMPRESSED)
        .set_max_row_group_size(row_group_size)
        .build();
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    Fixture { dir, path, rows }
}

pub fn date(s: &str) -> Box<[u8]> {
    s.as_bytes().to_vec().into_boxed_slice()
}
