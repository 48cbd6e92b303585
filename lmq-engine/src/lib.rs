pub mod bitmap;
pub mod data;
pub mod dict;
pub mod encoding;
pub mod executor;
pub mod graph;
pub mod ops;
pub mod rowcopy;
pub mod scan;
pub mod stream;
pub mod table;
