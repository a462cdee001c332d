pub mod storage;

pub use storage::{Context, CsvTable, StorageError};
