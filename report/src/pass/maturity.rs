use crate::dataset::ReportRow;
use crate::pass::ReportPass;
use crate::scale::AxisScale;

pub struct Maturity;

impl ReportPass for Maturity {
    fn name(&self) -> &'static str {
        "maturity"
    }
    fn question(&self) -> &'static str {
        "RQ02"
    }
    fn label(&self) -> &'static str {
        "Maturity (years)"
    }
    fn scale(&self) -> AxisScale {
        AxisScale::Linear
    }
    fn apply(&self, row: &ReportRow) -> f64 {
        row.repo_age_years
    }
}
