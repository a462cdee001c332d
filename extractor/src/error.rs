use database::StorageError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to clone {url}: {stderr}")]
    CloneFailed { url: String, stderr: String },

    #[error("timed out after {timeout:?} cloning {url}")]
    CloneTimeout { url: String, timeout: Duration },

    #[error("analysis of {} failed ({reason}), see {}", .source_dir.display(), .log_file.display())]
    AnalysisFailed {
        source_dir: PathBuf,
        reason: String,
        log_file: PathBuf,
    },

    #[error("analysis of {} timed out after {timeout:?}, see {}", .source_dir.display(), .log_file.display())]
    AnalysisTimeout {
        source_dir: PathBuf,
        timeout: Duration,
        log_file: PathBuf,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
