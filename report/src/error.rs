use database::StorageError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(
        "no repository is present in both tables ({repositories} repositories, {metrics} metric rows)"
    )]
    JoinEmpty { repositories: usize, metrics: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to draw {name}: {reason}")]
    Chart { name: String, reason: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
