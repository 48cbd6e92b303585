//! The row-copy compiler: given source/target layouts and a field
//! schedule, produce one specialized closure that performs the copy.
//!
//! When both ends are dense row-major and the layouts are known, runs
//! of adjacent single-word fields collapse into bulk word copies.
//! Byte-array fields never join a run: they are re-anchored into the
//! target's arena so each container owns its bytes.

use crate::data::{DataRow, DataRowMut, MemDataRow};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputType {
    /// Dense row-major words (`RowBlock`, `MemDataRow`).
    Raw,
    /// File-backed rows.
    External,
    /// Anything else (vertical, encoded, masked).
    Other,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldType {
    Regular,
    String,
    /// Copy the undecoded (dictionary-ordinal) field.
    Raw,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldInst {
    pub kind: FieldType,
    pub from: u32,
    pub to: u32,
}

impl FieldInst {
    pub fn new(kind: FieldType, from: u32, to: u32) -> Self {
        Self { kind, from, to }
    }
}

pub type CopyFn = Box<dyn Fn(&mut dyn DataRowMut, &dyn DataRow) + Send + Sync>;

/// The compiled copier: a flat list of copy elements applied in order.
pub struct RowCopier {
    elements: Vec<CopyFn>,
}

impl RowCopier {
    pub fn copy(&self, to: &mut dyn DataRowMut, from: &dyn DataRow) {
        for element in &self.elements {
            element(to, from);
        }
    }
}

/// Snapshot specialization: the target layout is synthesized from the
/// field kinds so `snapshot` produces a minimally sized owned row.
pub struct Snapshoter {
    offset: Vec<u32>,
    copier: RowCopier,
}

impl Snapshoter {
    pub fn offset(&self) -> &[u32] {
        &self.offset
    }

    pub fn snapshot(&self, row: &dyn DataRow) -> MemDataRow {
        let mut out = MemDataRow::with_offsets(self.offset.clone());
        self.copier.copy(&mut out, row);
        out
    }
}

fn copy_field(from: usize, to: usize) -> CopyFn {
    Box::new(move |target, source| {
        target.field_mut(to).set_field(source.field(from));
    })
}

fn copy_raw_field(from: usize, to: usize) -> CopyFn {
    Box::new(move |target, source| {
        target.field_mut(to).set_field(source.raw_field(from));
    })
}

fn copy_words(from_start: usize, to_start: usize, words: usize) -> CopyFn {
    Box::new(move |target, source| {
        let src = source.raw_words().expect("bulk copy from a non-raw source");
        let dst = target
            .raw_words_mut()
            .expect("bulk copy into a non-raw target");
        dst[to_start..to_start + words].copy_from_slice(&src[from_start..from_start + words]);
    })
}

#[derive(Default)]
pub struct RowCopyFactory {
    from_type: Option<InputType>,
    to_type: Option<InputType>,
    from_offset: Vec<u32>,
    to_offset: Vec<u32>,
    fields: Vec<FieldInst>,
    processors: Vec<CopyFn>,
}

impl RowCopyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: InputType) -> Self {
        self.from_type = Some(from);
        self
    }

    pub fn to(mut self, to: InputType) -> Self {
        self.to_type = Some(to);
        self
    }

    pub fn from_layout(mut self, offset: Vec<u32>) -> Self {
        self.from_offset = offset;
        self
    }

    pub fn to_layout(mut self, offset: Vec<u32>) -> Self {
        self.to_offset = offset;
        self
    }

    pub fn field(mut self, kind: FieldType, from: u32, to: u32) -> Self {
        self.fields.push(FieldInst::new(kind, from, to));
        self
    }

    /// Post-processor run after the scheduled fields, in order.
    pub fn process(
        mut self,
        f: impl Fn(&mut dyn DataRowMut, &dyn DataRow) + Send + Sync + 'static,
    ) -> Self {
        self.processors.push(Box::new(f));
        self
    }

    pub fn build(mut self) -> RowCopier {
        let elements = self.build_elements();
        RowCopier { elements }
    }

    pub fn build_snapshot(mut self) -> Snapshoter {
        if self.to_offset.is_empty() {
            self.fields.sort_by_key(|f| f.to);
            let mut offset = Vec::with_capacity(self.fields.len() + 1);
            offset.push(0u32);
            for (i, field) in self.fields.iter().enumerate() {
                let width = if field.kind == FieldType::String { 2 } else { 1 };
                offset.push(offset[i] + width);
            }
            self.to_offset = offset;
        }
        let offset = self.to_offset.clone();
        let elements = self.build_elements();
        Snapshoter {
            offset,
            copier: RowCopier { elements },
        }
    }

    /// Identity copier over one layout; width-2 columns are treated as
    /// byte arrays.
    pub fn build_assign(from: InputType, to: InputType, col_offset: &[u32]) -> RowCopier {
        let mut factory = RowCopyFactory::new()
            .from(from)
            .to(to)
            .from_layout(col_offset.to_vec())
            .to_layout(col_offset.to_vec());
        for i in 0..col_offset.len() - 1 {
            let kind = if col_offset[i + 1] - col_offset[i] == 2 {
                FieldType::String
            } else {
                FieldType::Regular
            };
            factory = factory.field(kind, i as u32, i as u32);
        }
        factory.build()
    }

    fn build_elements(&mut self) -> Vec<CopyFn> {
        let mut elements = Vec::new();
        if !self.fields.is_empty() {
            let raw_both = self.from_type == Some(InputType::Raw)
                && self.to_type == Some(InputType::Raw)
                && self.from_offset.len() > 1
                && self.to_offset.len() > 1;
            if raw_both {
                self.fields.sort_by_key(|f| f.from);
                let mut run: Option<(usize, usize, usize)> = None;
                let mut prev: Option<(u32, u32)> = None;
                for field in &self.fields {
                    let from_width =
                        self.from_offset[field.from as usize + 1] - self.from_offset[field.from as usize];
                    let to_width =
                        self.to_offset[field.to as usize + 1] - self.to_offset[field.to as usize];
                    let single = field.kind != FieldType::String
                        && from_width == 1
                        && to_width == 1;
                    if !single {
                        if let Some((fs, ts, len)) = run.take() {
                            elements.push(copy_words(fs, ts, len));
                        }
                        prev = None;
                        elements.push(match field.kind {
                            FieldType::Raw => copy_raw_field(field.from as usize, field.to as usize),
                            _ => copy_field(field.from as usize, field.to as usize),
                        });
                        continue;
                    }
                    let adjacent = matches!(prev, Some((pf, pt)) if field.from == pf + 1 && field.to == pt + 1);
                    match (&mut run, adjacent) {
                        (Some((_, _, len)), true) => *len += 1,
                        (current, _) => {
                            if let Some((fs, ts, len)) = current.take() {
                                elements.push(copy_words(fs, ts, len));
                            }
                            *current = Some((
                                self.from_offset[field.from as usize] as usize,
                                self.to_offset[field.to as usize] as usize,
                                1,
                            ));
                        }
                    }
                    prev = Some((field.from, field.to));
                }
                if let Some((fs, ts, len)) = run.take() {
                    elements.push(copy_words(fs, ts, len));
                }
            } else {
                for field in &self.fields {
                    elements.push(match field.kind {
                        FieldType::Raw => copy_raw_field(field.from as usize, field.to as usize),
                        _ => copy_field(field.from as usize, field.to as usize),
                    });
                }
            }
        }
        elements.extend(self.processors.drain(..));
        elements
    }
}
