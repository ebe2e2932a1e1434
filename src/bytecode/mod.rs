//! C1: the bytecode scanner.

mod scan;

pub use scan::{scan, CodeMap};
