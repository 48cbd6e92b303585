//! Columnar file scan: tables over parquet files, one block per row
//! group, with decoded and raw (dictionary-ordinal) column iterators.
//!
//! Decoded access runs through the parquet crate's typed column
//! readers with a small batch buffer. Raw access walks the column's
//! pages directly and decodes only the ordinal stream, which is what
//! lets predicates filter without materializing values.

use std::cell::RefCell;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use bytes::{Buf, Bytes};
use byteorder::{ByteOrder, LittleEndian};
use lmq_core::errors::{Error, Result};
use lmq_core::util::bit_util::Bitset;
use parquet::basic::{Encoding, Type as PhysicalType};
use parquet::column::page::{Page, PageReader};
use parquet::column::reader::{get_typed_column_reader, ColumnReader, ColumnReaderImpl};
use parquet::data_type::{
    BoolType, ByteArray as PByteArray, ByteArrayType, DataType as ParquetDataType, DoubleType,
    FloatType, Int32Type, Int64Type,
};
use parquet::file::reader::{FileReader, SerializedFileReader};

use crate::bitmap::Bitmap;
use crate::data::{Block, ColumnIterator, DataField, DataRow, RowIterator};
use crate::dict::{DictValue, Dictionary};
use crate::encoding::HybridDecoder;
use crate::stream::Stream;
use crate::table::{Table, TableRef};

const COL_BUF_SIZE: usize = 8;

/// Physical column shapes the engine scans. Floats widen to doubles at
/// decode so one accessor covers both.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColumnKind {
    Bool,
    I32,
    I64,
    F32,
    F64,
    Bytes,
}

impl ColumnKind {
    pub fn of(physical: PhysicalType) -> Result<ColumnKind> {
        match physical {
            PhysicalType::BOOLEAN => Ok(ColumnKind::Bool),
            PhysicalType::INT32 => Ok(ColumnKind::I32),
            PhysicalType::INT64 => Ok(ColumnKind::I64),
            PhysicalType::FLOAT => Ok(ColumnKind::F32),
            PhysicalType::DOUBLE => Ok(ColumnKind::F64),
            PhysicalType::BYTE_ARRAY => Ok(ColumnKind::Bytes),
            other => Err(Error::SchemaMismatch(format!(
                "unsupported physical type {}",
                other
            ))),
        }
    }

    /// Words per field in a row layout.
    pub fn width(self) -> u32 {
        match self {
            ColumnKind::Bytes => 2,
            _ => 1,
        }
    }
}

/// Receives a column's dictionary and pages during a raw scan and marks
/// a bitmap over the row group's rows.
pub trait RawAccessor<T: DictValue> {
    fn init(&mut self, limit: u64);

    fn dict(&mut self, dict: &Dictionary<T>);

    /// A run of dictionary ordinals from a data page.
    fn ordinals(&mut self, chunk: &[u32]);

    /// A run of decoded values from a PLAIN data page.
    fn values(&mut self, chunk: &[T]);

    fn take(&mut self) -> Bitmap;
}

/// A table backed by one parquet file, with a 64-bit projection mask
/// (bit `i` projects column `i`; zero projects everything).
pub struct ParquetTable {
    name: String,
    columns: u64,
    reader: Arc<SerializedFileReader<File>>,
    kinds: Arc<[ColumnKind]>,
    col_size: Vec<u32>,
}

impl std::fmt::Debug for ParquetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetTable")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("kinds", &self.kinds)
            .field("col_size", &self.col_size)
            .finish()
    }
}

impl ParquetTable {
    pub fn open(path: impl AsRef<Path>, columns: u64) -> Result<ParquetTable> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::FileOpen(format!("{}: {}", path.display(), e)))?;
        let reader = SerializedFileReader::new(file)?;
        let schema = reader.metadata().file_metadata().schema_descr_ptr();
        let kinds: Arc<[ColumnKind]> = (0..schema.num_columns())
            .map(|i| ColumnKind::of(schema.column(i).physical_type()))
            .collect::<Result<Vec<_>>>()?
            .into();
        let col_size = kinds.iter().map(|k| k.width()).collect();
        log::debug!(
            "opened {} with {} row groups",
            path.display(),
            reader.metadata().num_row_groups()
        );
        Ok(ParquetTable {
            name: path.display().to_string(),
            columns,
            reader: Arc::new(reader),
            kinds,
            col_size,
        })
    }

    /// Open with an explicit projected-column list.
    pub fn open_cols(path: impl AsRef<Path>, cols: &[u32]) -> Result<ParquetTable> {
        let mask = cols.iter().fold(0u64, |acc, c| acc | 1u64 << c);
        Self::open(path, mask)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Re-project an already-open table.
    pub fn update_columns(&mut self, columns: u64) {
        self.columns = columns;
    }

    pub fn num_row_groups(&self) -> usize {
        self.reader.metadata().num_row_groups()
    }

    pub fn num_rows(&self) -> u64 {
        self.reader.metadata().file_metadata().num_rows() as u64
    }

    pub fn kind(&self, col: usize) -> ColumnKind {
        self.kinds[col]
    }

    pub(crate) fn block(&self, index: usize) -> ParquetBlock {
        ParquetBlock::new(
            Arc::clone(&self.reader),
            index,
            self.columns,
            Arc::clone(&self.kinds),
        )
    }

    /// Decode the dictionary page of `col` in row group 0. The files
    /// this engine targets share one dictionary across row groups.
    pub fn load_dictionary<T: DictValue>(&self, col: usize) -> Result<Dictionary<T>> {
        self.block(0).read_dictionary(col)
    }

    pub fn dictionary_size(&self, col: usize) -> Result<usize> {
        let rg = self.reader.get_row_group(0)?;
        let mut pages = rg.get_column_page_reader(col)?;
        match pages.get_next_page()? {
            Some(Page::DictionaryPage { num_values, .. }) => Ok(num_values as usize),
            _ => Err(Error::General(format!("column {} has no dictionary", col))),
        }
    }
}

impl Table for ParquetTable {
    fn blocks(&self) -> Stream<Arc<Block>> {
        let reader = Arc::clone(&self.reader);
        let kinds = Arc::clone(&self.kinds);
        let columns = self.columns;
        Stream::from_iter(0..self.num_row_groups())
            .map(move |index| {
                Arc::new(Block::Parquet(ParquetBlock::new(
                    Arc::clone(&reader),
                    index,
                    columns,
                    Arc::clone(&kinds),
                )))
            })
            .parallel()
    }

    fn col_size(&self) -> &[u32] {
        &self.col_size
    }
}

/// One row group of a parquet table.
pub struct ParquetBlock {
    reader: Arc<SerializedFileReader<File>>,
    index: usize,
    num_rows: u64,
    columns: u64,
    kinds: Arc<[ColumnKind]>,
}

impl ParquetBlock {
    fn new(
        reader: Arc<SerializedFileReader<File>>,
        index: usize,
        columns: u64,
        kinds: Arc<[ColumnKind]>,
    ) -> Self {
        let num_rows = reader.metadata().row_group(index).num_rows() as u64;
        Self {
            reader,
            index,
            num_rows,
            columns,
            kinds,
        }
    }

    /// Row group index; doubles as the block id.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> u64 {
        self.num_rows
    }

    pub fn col(&self, col_index: usize) -> ParquetColumnIter {
        ParquetColumnIter::new(
            Arc::clone(&self.reader),
            self.index,
            col_index,
            self.kinds[col_index],
            self.num_rows,
        )
    }

    pub(crate) fn raw_col(&self, col_index: usize) -> RawOrdinalIter {
        RawOrdinalIter::new(Arc::clone(&self.reader), self.index, col_index, self.num_rows)
    }

    pub fn rows(&self) -> ParquetRowIter<'_> {
        let n = self.kinds.len();
        let mut cols: Vec<Option<Box<ParquetColumnIter>>> = Vec::with_capacity(n);
        let mut raws = Vec::with_capacity(n);
        cols.resize_with(n, || None);
        raws.resize_with(n, || None);
        // sparse column array: the projected ordinals get readers now,
        // raw twins stay lazy
        for i in Bitset::new(self.columns) {
            if (i as usize) < n {
                cols[i as usize] = Some(Box::new(self.col(i as usize)));
            }
        }
        ParquetRowIter {
            view: ParquetRowView {
                block: self,
                cols: RefCell::new(cols),
                raws: RefCell::new(raws),
                index: -1,
            },
        }
    }

    /// Decode the column's dictionary page.
    pub fn read_dictionary<T: DictValue>(&self, col_index: usize) -> Result<Dictionary<T>> {
        let physical = self.physical(col_index);
        let rg = self.reader.get_row_group(self.index)?;
        let mut pages = rg.get_column_page_reader(col_index)?;
        match pages.get_next_page()? {
            Some(Page::DictionaryPage {
                buf, num_values, ..
            }) => Dictionary::from_page(&buf, num_values as usize, physical),
            _ => Err(Error::General(format!(
                "column {} has no dictionary page",
                col_index
            ))),
        }
    }

    /// Walk the column's pages through `accessor` and return its
    /// bitmap, spanning this row group's rows.
    pub fn scan_raw<T: DictValue>(
        &self,
        col_index: usize,
        accessor: &mut dyn RawAccessor<T>,
    ) -> Result<Bitmap> {
        accessor.init(self.num_rows);
        let physical = self.physical(col_index);
        let (max_def, max_rep) = self.levels(col_index);
        let rg = self.reader.get_row_group(self.index)?;
        let mut pages = rg.get_column_page_reader(col_index)?;
        let mut chunk = vec![0u32; 1024];
        while let Some(page) = pages.get_next_page()? {
            match page {
                Page::DictionaryPage {
                    buf, num_values, ..
                } => {
                    let dict = Dictionary::<T>::from_page(&buf, num_values as usize, physical)?;
                    accessor.dict(&dict);
                }
                Page::DataPage {
                    buf,
                    num_values,
                    encoding,
                    ..
                } => {
                    let values = strip_levels_v1(buf, max_def, max_rep)?;
                    self.scan_page::<T>(accessor, values, num_values as usize, encoding, &mut chunk)?;
                }
                Page::DataPageV2 {
                    buf,
                    num_values,
                    encoding,
                    def_levels_byte_len,
                    rep_levels_byte_len,
                    ..
                } => {
                    let skip = (def_levels_byte_len + rep_levels_byte_len) as usize;
                    self.scan_page::<T>(
                        accessor,
                        buf.slice(skip..),
                        num_values as usize,
                        encoding,
                        &mut chunk,
                    )?;
                }
            }
        }
        Ok(accessor.take())
    }

    fn scan_page<T: DictValue>(
        &self,
        accessor: &mut dyn RawAccessor<T>,
        values: Bytes,
        num_values: usize,
        encoding: Encoding,
        chunk: &mut [u32],
    ) -> Result<()> {
        match encoding {
            Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY => {
                let mut decoder = HybridDecoder::from_page_values(values)?;
                let mut left = num_values;
                while left > 0 {
                    let want = left.min(chunk.len());
                    let got = decoder.read(&mut chunk[..want])?;
                    if got == 0 {
                        return Err(Error::EOF(format!(
                            "ordinal stream ended {} values early",
                            left
                        )));
                    }
                    accessor.ordinals(&chunk[..got]);
                    left -= got;
                }
                Ok(())
            }
            Encoding::PLAIN => {
                let decoded = T::decode_plain(&values, num_values)?;
                accessor.values(&decoded);
                Ok(())
            }
            other => Err(Error::NYI(format!("raw scan over {} pages", other))),
        }
    }

    fn physical(&self, col_index: usize) -> PhysicalType {
        self.reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .column(col_index)
            .physical_type()
    }

    fn levels(&self, col_index: usize) -> (i16, i16) {
        let descr = self
            .reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .column(col_index);
        (descr.max_def_level(), descr.max_rep_level())
    }
}

/// Data page v1: optional rep- then def-level sections, each an RLE run
/// with a u32 length prefix. All engine columns are mandatory, so the
/// sections are skipped rather than decoded.
fn strip_levels_v1(mut buf: Bytes, max_def: i16, max_rep: i16) -> Result<Bytes> {
    for max in [max_rep, max_def] {
        if max > 0 {
            if buf.len() < 4 {
                return Err(Error::EOF("truncated level section".to_string()));
            }
            let len = LittleEndian::read_u32(&buf[..4]) as usize;
            if buf.len() < 4 + len {
                return Err(Error::EOF("truncated level section".to_string()));
            }
            buf.advance(4 + len);
        }
    }
    Ok(buf)
}

enum TypedReader {
    Bool(ColumnReaderImpl<BoolType>, Vec<bool>),
    I32(ColumnReaderImpl<Int32Type>, Vec<i32>),
    I64(ColumnReaderImpl<Int64Type>, Vec<i64>),
    F32(ColumnReaderImpl<FloatType>, Vec<f32>),
    F64(ColumnReaderImpl<DoubleType>, Vec<f64>),
    Bytes(ColumnReaderImpl<ByteArrayType>, Vec<PByteArray>),
}

fn refill<T: ParquetDataType>(
    reader: &mut ColumnReaderImpl<T>,
    values: &mut Vec<T::T>,
    skip: usize,
) -> usize {
    if skip > 0 {
        reader
            .skip_records(skip)
            .expect("skipping records in column chunk");
    }
    values.clear();
    let (records, _, _) = reader
        .read_records(COL_BUF_SIZE, None, None, values)
        .expect("reading records from column chunk");
    records
}

/// Decoded column iterator: an 8-row window of decoded values exposed
/// as field words. Backward seeks rebuild the typed reader.
pub struct ParquetColumnIter {
    reader: Arc<SerializedFileReader<File>>,
    rg_index: usize,
    col_index: usize,
    kind: ColumnKind,
    num_rows: u64,
    typed: TypedReader,
    /// Rows consumed from the typed reader so far.
    consumed: u64,
    buf_start: i64,
    buf_len: usize,
    words: [u64; 2 * COL_BUF_SIZE],
    index: i64,
    raw_twin: Option<Box<RawOrdinalIter>>,
}

impl ParquetColumnIter {
    fn new(
        reader: Arc<SerializedFileReader<File>>,
        rg_index: usize,
        col_index: usize,
        kind: ColumnKind,
        num_rows: u64,
    ) -> Self {
        let typed = Self::make_typed(&reader, rg_index, col_index, kind);
        Self {
            reader,
            rg_index,
            col_index,
            kind,
            num_rows,
            typed,
            consumed: 0,
            buf_start: -(COL_BUF_SIZE as i64),
            buf_len: 0,
            words: [0; 2 * COL_BUF_SIZE],
            index: -1,
            raw_twin: None,
        }
    }

    fn make_typed(
        reader: &Arc<SerializedFileReader<File>>,
        rg_index: usize,
        col_index: usize,
        kind: ColumnKind,
    ) -> TypedReader {
        let rg = reader.get_row_group(rg_index).expect("row group reader");
        let col = rg.get_column_reader(col_index).expect("column reader");
        match kind {
            ColumnKind::Bool => TypedReader::Bool(get_typed_column_reader(col), Vec::new()),
            ColumnKind::I32 => TypedReader::I32(get_typed_column_reader(col), Vec::new()),
            ColumnKind::I64 => TypedReader::I64(get_typed_column_reader(col), Vec::new()),
            ColumnKind::F32 => TypedReader::F32(get_typed_column_reader(col), Vec::new()),
            ColumnKind::F64 => TypedReader::F64(get_typed_column_reader(col), Vec::new()),
            ColumnKind::Bytes => TypedReader::Bytes(get_typed_column_reader(col), Vec::new()),
        }
    }

    fn reload(&mut self, idx: u64) {
        debug_assert!(idx < self.num_rows);
        if (idx as i64) < self.buf_start {
            // typed readers only run forward
            self.typed =
                Self::make_typed(&self.reader, self.rg_index, self.col_index, self.kind);
            self.consumed = 0;
        }
        let skip = (idx - self.consumed) as usize;
        let records = match &mut self.typed {
            TypedReader::Bool(reader, values) => {
                let n = refill(reader, values, skip);
                for (k, v) in values.iter().enumerate() {
                    self.words[k] = *v as u64;
                }
                n
            }
            TypedReader::I32(reader, values) => {
                let n = refill(reader, values, skip);
                for (k, v) in values.iter().enumerate() {
                    self.words[k] = *v as i64 as u64;
                }
                n
            }
            TypedReader::I64(reader, values) => {
                let n = refill(reader, values, skip);
                for (k, v) in values.iter().enumerate() {
                    self.words[k] = *v as u64;
                }
                n
            }
            TypedReader::F32(reader, values) => {
                let n = refill(reader, values, skip);
                for (k, v) in values.iter().enumerate() {
                    self.words[k] = (*v as f64).to_bits();
                }
                n
            }
            TypedReader::F64(reader, values) => {
                let n = refill(reader, values, skip);
                for (k, v) in values.iter().enumerate() {
                    self.words[k] = v.to_bits();
                }
                n
            }
            TypedReader::Bytes(reader, values) => {
                let n = refill(reader, values, skip);
                for (k, v) in values.iter().enumerate() {
                    self.words[2 * k] = v.data().as_ptr() as u64;
                    self.words[2 * k + 1] = v.len() as u64;
                }
                n
            }
        };
        assert!(records > 0, "read past the end of column chunk");
        self.consumed = idx + records as u64;
        self.buf_start = idx as i64;
        self.buf_len = records;
    }

    #[inline]
    fn slot(&self, idx: u64) -> usize {
        (idx as i64 - self.buf_start) as usize
    }
}

impl ColumnIterator for ParquetColumnIter {
    fn field(&mut self, idx: u64) -> DataField<'_> {
        if (idx as i64) < self.buf_start || idx as i64 >= self.buf_start + self.buf_len as i64 {
            self.reload(idx);
        }
        self.index = idx as i64;
        let slot = self.slot(idx);
        match self.kind {
            ColumnKind::Bytes => DataField::new(&self.words[2 * slot..2 * slot + 2]),
            _ => DataField::new(&self.words[slot..slot + 1]),
        }
    }

    fn next_field(&mut self) -> Option<DataField<'_>> {
        let next = (self.index + 1) as u64;
        if next < self.num_rows {
            Some(self.field(next))
        } else {
            None
        }
    }

    fn raw(&mut self, idx: u64) -> DataField<'_> {
        if self.raw_twin.is_none() {
            self.raw_twin = Some(Box::new(RawOrdinalIter::new(
                Arc::clone(&self.reader),
                self.rg_index,
                self.col_index,
                self.num_rows,
            )));
        }
        self.index = idx as i64;
        self.raw_twin.as_mut().unwrap().field(idx)
    }

    fn pos(&self) -> u64 {
        self.index as u64
    }
}

/// Undecoded column iterator: yields the 32-bit dictionary ordinals of
/// a dictionary-encoded column without touching the dictionary.
pub struct RawOrdinalIter {
    reader: Arc<SerializedFileReader<File>>,
    rg_index: usize,
    col_index: usize,
    num_rows: u64,
    max_def: i16,
    max_rep: i16,
    pages: Box<dyn PageReader>,
    decoder: Option<(HybridDecoder, u64)>,
    /// Absolute row index of the next undecoded value.
    cursor: u64,
    buffer: [u32; COL_BUF_SIZE],
    buf_start: i64,
    buf_len: usize,
    view: [u64; 1],
    index: i64,
}

impl RawOrdinalIter {
    fn new(
        reader: Arc<SerializedFileReader<File>>,
        rg_index: usize,
        col_index: usize,
        num_rows: u64,
    ) -> Self {
        let descr = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .column(col_index);
        let (max_def, max_rep) = (descr.max_def_level(), descr.max_rep_level());
        let pages = Self::open_pages(&reader, rg_index, col_index);
        Self {
            reader,
            rg_index,
            col_index,
            num_rows,
            max_def,
            max_rep,
            pages,
            decoder: None,
            cursor: 0,
            buffer: [0; COL_BUF_SIZE],
            buf_start: -(COL_BUF_SIZE as i64),
            buf_len: 0,
            view: [0],
            index: -1,
        }
    }

    fn open_pages(
        reader: &Arc<SerializedFileReader<File>>,
        rg_index: usize,
        col_index: usize,
    ) -> Box<dyn PageReader> {
        reader
            .get_row_group(rg_index)
            .expect("row group reader")
            .get_column_page_reader(col_index)
            .expect("column page reader")
    }

    fn rewind(&mut self) {
        self.pages = Self::open_pages(&self.reader, self.rg_index, self.col_index);
        self.decoder = None;
        self.cursor = 0;
        self.buf_start = -(COL_BUF_SIZE as i64);
        self.buf_len = 0;
    }

    fn next_data_page(&mut self) -> (HybridDecoder, u64) {
        loop {
            let page = self
                .pages
                .get_next_page()
                .expect("page read")
                .expect("ordinal read past the last page");
            match page {
                Page::DictionaryPage { .. } => continue,
                Page::DataPage {
                    buf,
                    num_values,
                    encoding,
                    ..
                } => {
                    assert_dict_encoded(encoding);
                    let values = strip_levels_v1(buf, self.max_def, self.max_rep)
                        .expect("page levels");
                    return (
                        HybridDecoder::from_page_values(values).expect("ordinal section"),
                        num_values as u64,
                    );
                }
                Page::DataPageV2 {
                    buf,
                    num_values,
                    encoding,
                    def_levels_byte_len,
                    rep_levels_byte_len,
                    ..
                } => {
                    assert_dict_encoded(encoding);
                    let skip = (def_levels_byte_len + rep_levels_byte_len) as usize;
                    return (
                        HybridDecoder::from_page_values(buf.slice(skip..))
                            .expect("ordinal section"),
                        num_values as u64,
                    );
                }
            }
        }
    }

    fn reload(&mut self, idx: u64) {
        debug_assert!(idx < self.num_rows);
        if (idx as i64) < self.buf_start {
            self.rewind();
        }
        // advance page by page until the window covers idx
        loop {
            if self.decoder.is_none() {
                let (decoder, values) = self.next_data_page();
                self.decoder = Some((decoder, values));
            }
            let page_end = {
                let (_, left) = self.decoder.as_ref().unwrap();
                self.cursor + left
            };
            if idx >= page_end {
                let (decoder, left) = self.decoder.as_mut().unwrap();
                decoder.skip(*left as usize).expect("ordinal skip");
                self.cursor = page_end;
                self.decoder = None;
                continue;
            }
            let (decoder, left) = self.decoder.as_mut().unwrap();
            if idx > self.cursor {
                let skip = (idx - self.cursor) as usize;
                decoder.skip(skip).expect("ordinal skip");
                *left -= skip as u64;
                self.cursor = idx;
            }
            let want = (*left as usize).min(COL_BUF_SIZE);
            let got = decoder.read(&mut self.buffer[..want]).expect("ordinal read");
            assert!(got > 0, "ordinal stream ended early");
            *left -= got as u64;
            self.buf_start = self.cursor as i64;
            self.buf_len = got;
            self.cursor += got as u64;
            return;
        }
    }
}

fn assert_dict_encoded(encoding: Encoding) {
    assert!(
        matches!(
            encoding,
            Encoding::PLAIN_DICTIONARY | Encoding::RLE_DICTIONARY
        ),
        "raw ordinal access over a non-dictionary page ({})",
        encoding
    );
}

impl ColumnIterator for RawOrdinalIter {
    fn field(&mut self, idx: u64) -> DataField<'_> {
        if (idx as i64) < self.buf_start || idx as i64 >= self.buf_start + self.buf_len as i64 {
            self.reload(idx);
        }
        self.index = idx as i64;
        self.view[0] = self.buffer[(idx as i64 - self.buf_start) as usize] as u64;
        DataField::new(&self.view)
    }

    fn next_field(&mut self) -> Option<DataField<'_>> {
        let next = (self.index + 1) as u64;
        if next < self.num_rows {
            Some(self.field(next))
        } else {
            None
        }
    }

    fn pos(&self) -> u64 {
        self.index as u64
    }
}

pub struct ParquetRowView<'a> {
    block: &'a ParquetBlock,
    cols: RefCell<Vec<Option<Box<ParquetColumnIter>>>>,
    raws: RefCell<Vec<Option<Box<RawOrdinalIter>>>>,
    index: i64,
}

impl DataRow for ParquetRowView<'_> {
    fn num_fields(&self) -> usize {
        self.block.kinds.len()
    }

    fn field(&self, i: usize) -> DataField<'_> {
        debug_assert!(
            self.block.columns == 0 || self.block.columns >> i & 1 == 1,
            "column {} is not projected",
            i
        );
        let mut cols = self.cols.borrow_mut();
        let iter = cols[i].get_or_insert_with(|| Box::new(self.block.col(i)));
        let (ptr, size) = iter.field(self.index as u64).raw_parts();
        // Points into the boxed iterator's window, stable until the next
        // access of the same column.
        DataField::from_raw(ptr, size)
    }

    fn raw_field(&self, i: usize) -> DataField<'_> {
        let mut raws = self.raws.borrow_mut();
        let iter = raws[i].get_or_insert_with(|| Box::new(self.block.raw_col(i)));
        let (ptr, size) = iter.field(self.index as u64).raw_parts();
        DataField::from_raw(ptr, size)
    }
}

pub struct ParquetRowIter<'a> {
    view: ParquetRowView<'a>,
}

impl RowIterator for ParquetRowIter<'_> {
    fn row(&mut self, idx: u64) -> &dyn DataRow {
        self.view.index = idx as i64;
        &self.view
    }

    fn next_row(&mut self) -> Option<&dyn DataRow> {
        self.view.index += 1;
        if (self.view.index as u64) < self.view.block.num_rows {
            Some(&self.view)
        } else {
            None
        }
    }

    fn pos(&self) -> u64 {
        self.view.index as u64
    }
}

/// `TableRef` to a freshly opened file, the common operator input.
pub fn open_table(path: impl AsRef<Path>, columns: u64) -> Result<TableRef> {
    Ok(Arc::new(ParquetTable::open(path, columns)?))
}
