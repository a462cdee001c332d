pub mod activity;
pub mod maturity;
pub mod popularity;
pub mod size;

use crate::dataset::ReportRow;
use crate::scale::AxisScale;

/// A research question: one process metric of the repository, correlated
/// against every quality metric.
pub trait ReportPass: Send + Sync {
    /// Column name in the statistics tables.
    fn name(&self) -> &'static str;
    /// Research question id, e.g. `RQ01`.
    fn question(&self) -> &'static str;
    /// Axis description.
    fn label(&self) -> &'static str;
    fn scale(&self) -> AxisScale;
    fn apply(&self, row: &ReportRow) -> f64;
}
