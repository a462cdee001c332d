mod csv_table;

pub use csv_table::CsvTable;

use model::{MetricsRecord, RepositoryRecord};
use std::path::PathBuf;
use thiserror::Error;

pub const REPOSITORIES_FILE: &str = "repos.csv";
pub const METRICS_FILE: &str = "metrics.csv";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("table {0} not found, run the previous stage first")]
    NotFound(PathBuf),

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle on the shared data directory the stages exchange tables through.
#[derive(Debug, Clone)]
pub struct Context {
    data_dir: PathBuf,
}

impl Context {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Context {
            data_dir: data_dir.into(),
        }
    }

    /// Collector output, extractor and report input.
    pub fn repository_stg(&self) -> CsvTable<RepositoryRecord> {
        CsvTable::new(self.data_dir.join(REPOSITORIES_FILE))
    }

    /// Extractor output, report input.
    pub fn metrics_stg(&self) -> CsvTable<MetricsRecord> {
        CsvTable::new(self.data_dir.join(METRICS_FILE))
    }
}
