//! Metrics Extractor: clones each collected repository, runs CK over its
//! sources, folds the per-class output into one `MetricsRecord` and deletes
//! the clone before moving on.

pub mod checkout;
pub mod ck;
pub mod driver;
pub mod error;
pub mod layout;

pub use checkout::ClonedRepository;
pub use ck::{CkAnalyzer, StaticAnalyzer};
pub use driver::{extract_all, process_repository};
pub use error::AnalysisError;
