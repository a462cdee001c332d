//! Report Generator: joins the collected repositories with their CK metrics,
//! correlates process metrics with code quality and renders the tables and
//! charts of the study.

pub mod chart;
pub mod dataset;
pub mod error;
pub mod export;
pub mod manager;
pub mod pass;
pub mod scale;
pub mod stats;

pub use dataset::{join, QualityMetric, ReportRow};
pub use error::ReportError;
pub use manager::{ReportManager, ReportOutcome};
pub use pass::ReportPass;
pub use scale::AxisScale;
