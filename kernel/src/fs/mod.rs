//! File-system facing pieces of the char device layer.

pub mod file_operations;

pub use file_operations::{File, FileHandle, FileMode, FileOperations, SeekFrom};
