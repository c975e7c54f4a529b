//! # Formats
//!
//! Byte-level encodings of machine state. File I/O lives in the binary.

mod checkpoint;

pub use checkpoint::*;
