//! Page-level codecs for the columnar scan path and for encoded scratch
//! blocks: PLAIN value decoders and the RLE/bit-packed hybrid used for
//! dictionary ordinals.
//!
//! The hybrid layout is the parquet one: a ULEB128 run header whose low
//! bit selects bit-packed (`groups = header >> 1`, eight values per
//! group, LSB-first) or RLE (`count = header >> 1`, one little-endian
//! value of `ceil(bit_width / 8)` bytes).

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use lmq_core::errors::{Error, Result};

pub fn decode_plain_i32(buf: &[u8], count: usize) -> Result<Vec<i32>> {
    if buf.len() < count * 4 {
        return Err(Error::EOF(format!("need {} bytes, have {}", count * 4, buf.len())));
    }
    Ok((0..count)
        .map(|i| LittleEndian::read_i32(&buf[i * 4..]))
        .collect())
}

pub fn decode_plain_i64(buf: &[u8], count: usize) -> Result<Vec<i64>> {
    if buf.len() < count * 8 {
        return Err(Error::EOF(format!("need {} bytes, have {}", count * 8, buf.len())));
    }
    Ok((0..count)
        .map(|i| LittleEndian::read_i64(&buf[i * 8..]))
        .collect())
}

pub fn decode_plain_f32(buf: &[u8], count: usize) -> Result<Vec<f32>> {
    if buf.len() < count * 4 {
        return Err(Error::EOF(format!("need {} bytes, have {}", count * 4, buf.len())));
    }
    Ok((0..count)
        .map(|i| LittleEndian::read_f32(&buf[i * 4..]))
        .collect())
}

pub fn decode_plain_f64(buf: &[u8], count: usize) -> Result<Vec<f64>> {
    if buf.len() < count * 8 {
        return Err(Error::EOF(format!("need {} bytes, have {}", count * 8, buf.len())));
    }
    Ok((0..count)
        .map(|i| LittleEndian::read_f64(&buf[i * 8..]))
        .collect())
}

/// PLAIN byte arrays: `u32` length prefix then the raw bytes, repeated.
pub fn decode_plain_byte_arrays(buf: &[u8], count: usize) -> Result<Vec<Box<[u8]>>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    for _ in 0..count {
        if pos + 4 > buf.len() {
            return Err(Error::EOF(format!("need {} bytes, have {}", pos + 4, buf.len())));
        }
        let len = LittleEndian::read_u32(&buf[pos..]) as usize;
        pos += 4;
        if pos + len > buf.len() {
            return Err(Error::EOF(format!("need {} bytes, have {}", pos + len, buf.len())));
        }
        out.push(buf[pos..pos + len].into());
        pos += len;
    }
    Ok(out)
}

/// Minimum bit width that can hold `max`.
#[inline]
pub fn bit_width_for(max: u32) -> u8 {
    (32 - max.leading_zeros()) as u8
}

#[inline]
fn read_bits(data: &[u8], bit_pos: usize, width: usize) -> u32 {
    if width == 0 {
        return 0;
    }
    let start = bit_pos / 8;
    let offset = bit_pos % 8;
    let nbytes = (offset + width).div_ceil(8);
    let mut word = 0u64;
    for i in 0..nbytes {
        word |= (data[start + i] as u64) << (8 * i);
    }
    ((word >> offset) & ((1u64 << width) - 1)) as u32
}

fn read_uleb128(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| Error::EOF(format!("need {} bytes, have {}", *pos + 1, data.len())))?;
        *pos += 1;
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

fn write_uleb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

enum Run {
    /// Same value repeated.
    Rle { value: u32, left: usize },
    /// Reading from a bit-packed section at `base_bit` in the buffer.
    Packed { base_bit: usize, cursor: usize, left: usize },
}

/// Streaming decoder for the RLE/bit-packed hybrid.
pub struct HybridDecoder {
    data: Bytes,
    pos: usize,
    bit_width: usize,
    run: Option<Run>,
}

impl HybridDecoder {
    pub fn new(data: Bytes, bit_width: u8) -> Self {
        Self {
            data,
            pos: 0,
            bit_width: bit_width as usize,
            run: None,
        }
    }

    /// A data-page values section: one byte of bit width, then runs.
    pub fn from_page_values(mut data: Bytes) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EOF("empty values section".to_string()));
        }
        let bit_width = data[0];
        let data = data.split_off(1);
        if bit_width > 32 {
            return Err(Error::ParseError(format!(
                "ordinal bit width {} out of range",
                bit_width
            )));
        }
        Ok(Self::new(data, bit_width))
    }

    fn next_run(&mut self) -> Result<()> {
        let indicator = read_uleb128(&self.data, &mut self.pos)?;
        if indicator & 1 == 1 {
            let groups = (indicator >> 1) as usize;
            let base_bit = self.pos * 8;
            self.pos += groups * self.bit_width;
            if self.pos > self.data.len() {
                return Err(Error::EOF(format!("need {} bytes, have {}", self.pos, self.data.len())));
            }
            self.run = Some(Run::Packed {
                base_bit,
                cursor: 0,
                left: groups * 8,
            });
        } else {
            let count = (indicator >> 1) as usize;
            let byte_width = self.bit_width.div_ceil(8);
            if self.pos + byte_width > self.data.len() {
                return Err(Error::EOF(format!("need {} bytes, have {}", self.pos + byte_width, self.data.len())));
            }
            let mut value = 0u32;
            for i in 0..byte_width {
                value |= (self.data[self.pos + i] as u32) << (8 * i);
            }
            self.pos += byte_width;
            self.run = Some(Run::Rle { value, left: count });
        }
        Ok(())
    }

    /// Decode up to `out.len()` values; returns the number produced,
    /// zero only at end of data.
    pub fn read(&mut self, out: &mut [u32]) -> Result<usize> {
        let mut produced = 0;
        while produced < out.len() {
            match &mut self.run {
                Some(Run::Rle { value, left }) if *left > 0 => {
                    let take = (*left).min(out.len() - produced);
                    out[produced..produced + take].fill(*value);
                    *left -= take;
                    produced += take;
                }
                Some(Run::Packed { base_bit, cursor, left }) if *left > 0 => {
                    let take = (*left).min(out.len() - produced);
                    for slot in out[produced..produced + take].iter_mut() {
                        *slot = read_bits(&self.data, *base_bit + *cursor, self.bit_width);
                        *cursor += self.bit_width;
                    }
                    *left -= take;
                    produced += take;
                }
                _ => {
                    if self.pos >= self.data.len() {
                        break;
                    }
                    self.next_run()?;
                }
            }
        }
        Ok(produced)
    }

    pub fn skip(&mut self, n: usize) -> Result<usize> {
        let mut scratch = [0u32; 64];
        let mut skipped = 0;
        while skipped < n {
            let take = (n - skipped).min(scratch.len());
            let got = self.read(&mut scratch[..take])?;
            if got == 0 {
                break;
            }
            skipped += got;
        }
        Ok(skipped)
    }
}

/// One-shot hybrid encoder: long runs become RLE, the rest bit-packed
/// groups of eight (padded with zeros past the end; readers stop at the
/// value count).
pub fn encode_hybrid(values: &[u32], bit_width: u8) -> Vec<u8> {
    let bw = bit_width as usize;
    let byte_width = bw.div_ceil(8);
    let mut out = Vec::new();
    let mut i = 0;
    while i < values.len() {
        let mut run = 1;
        while i + run < values.len() && values[i + run] == values[i] {
            run += 1;
        }
        if run >= 8 {
            write_uleb128(&mut out, (run as u64) << 1);
            for b in 0..byte_width {
                out.push((values[i] >> (8 * b)) as u8);
            }
            i += run;
        } else {
            let take = (values.len() - i).min(8);
            write_uleb128(&mut out, (1u64 << 1) | 1);
            let mut group = [0u32; 8];
            group[..take].copy_from_slice(&values[i..i + take]);
            let mut acc = 0u64;
            let mut acc_bits = 0usize;
            for v in group {
                acc |= (v as u64 & ((1u64 << bw.max(1)) - 1)) << acc_bits;
                acc_bits += bw;
                while acc_bits >= 8 {
                    out.push(acc as u8);
                    acc >>= 8;
                    acc_bits -= 8;
                }
            }
            if acc_bits > 0 {
                out.push(acc as u8);
            }
            i += take;
        }
    }
    out
}
