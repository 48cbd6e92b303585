//! Terminal sink: formats selected output columns to a writer, one row
//! per line, tab-separated. Dictionary columns print the decoded value
//! for the ordinal stored in the row.

use std::io::Write;
use std::sync::Arc;

use crate::dict::Dictionary;
use crate::graph::{ExecNode, NodeOutput};
use crate::table::{Table, TableRef};

pub enum PrintField {
    Int(usize),
    Double(usize),
    Bytes(usize),
    Dict(usize, Arc<Dictionary<Box<[u8]>>>),
}

pub struct Printer {
    fields: Vec<PrintField>,
}

impl Printer {
    pub fn new(fields: Vec<PrintField>) -> Self {
        Self { fields }
    }

    pub fn print(&self, table: TableRef) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.write(&mut lock, table).expect("writing to stdout");
    }

    pub fn write(&self, out: &mut impl Write, table: TableRef) -> std::io::Result<()> {
        let mut count = 0u64;
        for block in table.blocks().collect() {
            let mut rows = block.rows();
            loop {
                let line = match rows.next_row() {
                    Some(row) => {
                        let mut parts = Vec::with_capacity(self.fields.len());
                        for field in &self.fields {
                            parts.push(match field {
                                PrintField::Int(i) => row.field(*i).as_long().to_string(),
                                PrintField::Double(i) => {
                                    format!("{:.4}", row.field(*i).as_double())
                                }
                                PrintField::Bytes(i) => row.field(*i).as_str().into_owned(),
                                PrintField::Dict(i, dict) => {
                                    let ordinal = row.field(*i).as_int();
                                    String::from_utf8_lossy(dict.value(ordinal as usize))
                                        .into_owned()
                                }
                            });
                        }
                        parts.join("\t")
                    }
                    None => break,
                };
                writeln!(out, "{}", line)?;
                count += 1;
            }
        }
        log::debug!("printed {} rows", count);
        Ok(())
    }
}

impl ExecNode for Printer {
    fn execute(&mut self, inputs: &[&NodeOutput]) -> NodeOutput {
        self.print(inputs[0].table());
        NodeOutput::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataRowMut;
    use crate::table::MemTable;

    #[test]
    fn test_formats_row() {
        let mut table = MemTable::with_col_size(vec![1, 1, 2], false);
        {
            let block = table.allocate(1);
            let mut writer = block.rows_mut();
            let mut row = writer.row(0);
            row.field_mut(0).set_int(42);
            row.field_mut(1).set_double(1.5);
            row.field_mut(2).set_bytes(b"1996-02-21");
        }
        let printer = Printer::new(vec![
            PrintField::Int(0),
            PrintField::Double(1),
            PrintField::Bytes(2),
        ]);
        let mut buf = Vec::new();
        printer.write(&mut buf, Arc::new(table)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "42\t1.5000\t1996-02-21\n");
    }

    #[test]
    fn test_dict_column() {
        let dict = Arc::new(Dictionary::new(vec![
            b"A".to_vec().into_boxed_slice(),
            b"N".to_vec().into_boxed_slice(),
            b"R".to_vec().into_boxed_slice(),
        ]));
        let mut table = MemTable::make(1, false);
        {
            let block = table.allocate(2);
            let mut writer = block.rows_mut();
            writer.row(0).field_mut(0).set_int(2);
            writer.row(1).field_mut(0).set_int(0);
        }
        let printer = Printer::new(vec![PrintField::Dict(0, dict)]);
        let mut buf = Vec::new();
        printer.write(&mut buf, Arc::new(table)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "R\nA\n");
    }
}
