use crate::dataset::ReportRow;
use crate::pass::ReportPass;
use crate::scale::AxisScale;

pub struct Popularity;

impl ReportPass for Popularity {
    fn name(&self) -> &'static str {
        "popularity"
    }
    fn question(&self) -> &'static str {
        "RQ01"
    }
    fn label(&self) -> &'static str {
        "Popularity (stars)"
    }
    fn scale(&self) -> AxisScale {
        AxisScale::Log
    }
    fn apply(&self, row: &ReportRow) -> f64 {
        row.stars_count as f64
    }
}
