//! Dictionary/RLE-encoded vertical scratch block for i32 columns.
//! Write-once at construction, then read-only through decoding
//! iterators with a small value buffer.

use std::cell::RefCell;

use bytes::Bytes;
use lmq_core::errors::Result;

use crate::encoding::{bit_width_for, encode_hybrid, HybridDecoder};

use super::block::next_block_id;
use super::field::DataField;
use super::row::{ColumnIterator, DataRow, RowIterator};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColEncoding {
    /// Little-endian i32 values, directly addressable.
    Plain,
    /// Sorted distinct dictionary plus hybrid-coded ordinals.
    Dict,
}

struct EncodedColumn {
    encoding: ColEncoding,
    /// Present for `Dict` columns.
    dict: Vec<i32>,
    bit_width: u8,
    data: Bytes,
}

pub struct EncodedColumnBlock {
    id: u32,
    size: usize,
    columns: Vec<EncodedColumn>,
}

impl EncodedColumnBlock {
    /// Encode `cols` (all the same length) under the given encodings.
    pub fn from_columns(cols: &[Vec<i32>], encodings: &[ColEncoding]) -> Result<Self> {
        assert_eq!(cols.len(), encodings.len());
        let size = cols.first().map(|c| c.len()).unwrap_or(0);
        let mut columns = Vec::with_capacity(cols.len());
        for (values, &encoding) in cols.iter().zip(encodings.iter()) {
            assert_eq!(values.len(), size, "ragged columns");
            columns.push(match encoding {
                ColEncoding::Plain => EncodedColumn {
                    encoding,
                    dict: Vec::new(),
                    bit_width: 0,
                    data: bytemuck::cast_slice::<i32, u8>(values).to_vec().into(),
                },
                ColEncoding::Dict => {
                    let mut dict = values.clone();
                    dict.sort_unstable();
                    dict.dedup();
                    let ordinals: Vec<u32> = values
                        .iter()
                        .map(|v| dict.binary_search(v).unwrap() as u32)
                        .collect();
                    let bit_width = bit_width_for(dict.len().saturating_sub(1) as u32);
                    let data = encode_hybrid(&ordinals, bit_width).into();
                    EncodedColumn {
                        encoding,
                        dict,
                        bit_width,
                        data,
                    }
                }
            });
        }
        Ok(Self {
            id: next_block_id(),
            size,
            columns,
        })
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size as u64
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn encoding(&self, col: usize) -> ColEncoding {
        self.columns[col].encoding
    }

    pub fn col(&self, col_index: usize) -> EncodedColumnIter<'_> {
        EncodedColumnIter::new(self, col_index)
    }

    pub fn rows(&self) -> EncodedRowIter<'_> {
        EncodedRowIter {
            view: EncodedRowView {
                cols: RefCell::new((0..self.columns.len()).map(|i| self.col(i)).collect()),
                num_cols: self.columns.len(),
                index: -1,
            },
            size: self.size,
        }
    }
}

const ENC_BUF_SIZE: usize = 10;

pub struct EncodedColumnIter<'a> {
    column: &'a EncodedColumn,
    size: usize,
    decoder: Option<HybridDecoder>,
    buffer: [u32; ENC_BUF_SIZE],
    /// Row index of `buffer[0]`; negative before the first load.
    buf_start: i64,
    buf_len: usize,
    view: [u64; 1],
    index: i64,
}

impl<'a> EncodedColumnIter<'a> {
    fn new(block: &'a EncodedColumnBlock, col_index: usize) -> Self {
        Self {
            column: &block.columns[col_index],
            size: block.size,
            decoder: None,
            buffer: [0; ENC_BUF_SIZE],
            buf_start: -(ENC_BUF_SIZE as i64),
            buf_len: 0,
            view: [0],
            index: -1,
        }
    }

    fn load(&mut self, idx: usize) -> u64 {
        match self.column.encoding {
            ColEncoding::Plain => {
                let at = idx * 4;
                let raw = i32::from_le_bytes(self.column.data[at..at + 4].try_into().unwrap());
                raw as i64 as u64
            }
            ColEncoding::Dict => {
                let in_buffer = self.buf_start >= 0
                    && idx as i64 >= self.buf_start
                    && (idx as i64) < self.buf_start + self.buf_len as i64;
                if !in_buffer {
                    // The hybrid stream only runs forward; rewinds restart it.
                    if self.decoder.is_none() || (idx as i64) < self.buf_start {
                        self.decoder = Some(HybridDecoder::new(
                            self.column.data.clone(),
                            self.column.bit_width,
                        ));
                        self.buf_start = -(ENC_BUF_SIZE as i64);
                        self.buf_len = 0;
                    }
                    let decoder = self.decoder.as_mut().unwrap();
                    let mut next = if self.buf_start < 0 {
                        0
                    } else {
                        self.buf_start as usize + self.buf_len
                    };
                    while next <= idx {
                        let want = (self.size - next).min(ENC_BUF_SIZE);
                        let got = decoder.read(&mut self.buffer[..want]).unwrap();
                        assert!(got > 0, "encoded column ran out at row {}", next);
                        self.buf_start = next as i64;
                        self.buf_len = got;
                        next += got;
                    }
                }
                let ordinal = self.buffer[(idx as i64 - self.buf_start) as usize];
                self.column.dict[ordinal as usize] as i64 as u64
            }
        }
    }

    fn load_raw(&mut self, idx: usize) -> u64 {
        match self.column.encoding {
            ColEncoding::Plain => self.load(idx),
            ColEncoding::Dict => {
                self.load(idx);
                self.buffer[(idx as i64 - self.buf_start) as usize] as u64
            }
        }
    }
}

impl ColumnIterator for EncodedColumnIter<'_> {
    fn field(&mut self, idx: u64) -> DataField<'_> {
        self.index = idx as i64;
        self.view[0] = self.load(idx as usize);
        DataField::new(&self.view)
    }

    fn next_field(&mut self) -> Option<DataField<'_>> {
        let next = (self.index + 1) as u64;
        if (next as usize) < self.size {
            Some(self.field(next))
        } else {
            None
        }
    }

    fn raw(&mut self, idx: u64) -> DataField<'_> {
        self.index = idx as i64;
        self.view[0] = self.load_raw(idx as usize);
        DataField::new(&self.view)
    }

    fn pos(&self) -> u64 {
        self.index as u64
    }
}

pub struct EncodedRowView<'a> {
    cols: RefCell<Vec<EncodedColumnIter<'a>>>,
    num_cols: usize,
    index: i64,
}

impl DataRow for EncodedRowView<'_> {
    fn num_fields(&self) -> usize {
        self.num_cols
    }

    fn field(&self, i: usize) -> DataField<'_> {
        let mut cols = self.cols.borrow_mut();
        let (ptr, size) = cols[i].field(self.index as u64).raw_parts();
        // The word lives in the column iterator's view buffer, which is
        // owned by this row view and untouched until the next access of
        // the same column.
        DataField::from_raw(ptr, size)
    }

    fn raw_field(&self, i: usize) -> DataField<'_> {
        let mut cols = self.cols.borrow_mut();
        let (ptr, size) = cols[i].raw(self.index as u64).raw_parts();
        DataField::from_raw(ptr, size)
    }
}

pub struct EncodedRowIter<'a> {
    view: EncodedRowView<'a>,
    size: usize,
}

impl RowIterator for EncodedRowIter<'_> {
    fn row(&mut self, idx: u64) -> &dyn DataRow {
        self.view.index = idx as i64;
        &self.view
    }

    fn next_row(&mut self) -> Option<&dyn DataRow> {
        self.view.index += 1;
        if (self.view.index as usize) < self.size {
            Some(&self.view)
        } else {
            None
        }
    }

    fn pos(&self) -> u64 {
        self.view.index as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_both_encodings() {
        let values: Vec<i32> = (0..300).map(|i| (i % 7) * 3).collect();
        let plain: Vec<i32> = (0..300).rev().collect();
        let block = EncodedColumnBlock::from_columns(
            &[values.clone(), plain.clone()],
            &[ColEncoding::Dict, ColEncoding::Plain],
        )
        .unwrap();
        assert_eq!(block.size(), 300);

        let mut col = block.col(0);
        for (i, expected) in values.iter().enumerate() {
            assert_eq!(col.field(i as u64).as_int(), *expected);
        }
        // backwards seek restarts the decoder
        assert_eq!(col.field(3).as_int(), values[3]);

        let mut col = block.col(1);
        assert_eq!(col.field(299).as_int(), 0);
        assert_eq!(col.field(0).as_int(), 299);
    }

    #[test]
    fn test_raw_ordinals_follow_sorted_dict() {
        let values = vec![30i32, 10, 20, 10, 30];
        let block =
            EncodedColumnBlock::from_columns(&[values], &[ColEncoding::Dict]).unwrap();
        let mut col = block.col(0);
        let ordinals: Vec<i32> = (0..5).map(|i| col.raw(i).as_int()).collect();
        assert_eq!(ordinals, vec![2, 0, 1, 0, 2]);
    }

    #[test]
    fn test_rows_view() {
        let block = EncodedColumnBlock::from_columns(
            &[vec![1, 2, 3], vec![10, 20, 30]],
            &[ColEncoding::Dict, ColEncoding::Plain],
        )
        .unwrap();
        let mut rows = block.rows();
        let mut sum = 0;
        while let Some(row) = rows.next_row() {
            sum += row.field(0).as_int() + row.field(1).as_int();
        }
        assert_eq!(sum, 66);
    }
}
