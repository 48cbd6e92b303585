//! The two-level data model: word-layout rows behind `DataRow` /
//! `ColumnIterator` views, and the block variants that hold them.

mod arena;
mod block;
mod colblock;
mod encblock;
mod field;
mod layout;
mod masked;
mod row;
mod rowblock;

pub use arena::ByteArena;
pub use block::{next_block_id, Block, RowMut, RowsMut};
pub use colblock::ColumnBlock;
pub use encblock::{ColEncoding, EncodedColumnBlock};
pub use field::{DataField, FieldMut};
pub use layout::{col_offset, col_size, offsets_of, width_of, MAX_PRESET_FIELDS};
pub use masked::MaskedBlock;
pub use row::{ColumnIterator, DataRow, DataRowMut, MemDataRow, RowIterator};
pub use rowblock::RowBlock;
pub(crate) use rowblock::RowWordsMut;
