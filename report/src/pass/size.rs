use crate::dataset::ReportRow;
use crate::pass::ReportPass;
use crate::scale::AxisScale;

pub struct Size;

impl ReportPass for Size {
    fn name(&self) -> &'static str {
        "size"
    }
    fn question(&self) -> &'static str {
        "RQ04"
    }
    fn label(&self) -> &'static str {
        "Size (lines of code)"
    }
    fn scale(&self) -> AxisScale {
        AxisScale::Log
    }
    fn apply(&self, row: &ReportRow) -> f64 {
        row.ck_loc as f64
    }
}
