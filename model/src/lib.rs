//! Records shared by every stage of the pipeline.
//!
//! The column names of the persisted CSV tables are the serde field names of
//! the types in [`repository`]; the stages never address columns by string.

pub mod github;
pub mod repository;
pub mod settings;

pub use repository::{round2, ClassMetrics, MetricsRecord, RepositoryRecord};
pub use settings::{
    CollectorContext, ConfigError, ExtractorContext, PipelineContext, ReportContext,
};
