use crate::dataset::ReportRow;
use crate::pass::ReportPass;
use crate::scale::AxisScale;

pub struct Activity;

impl ReportPass for Activity {
    fn name(&self) -> &'static str {
        "activity"
    }
    fn question(&self) -> &'static str {
        "RQ03"
    }
    fn label(&self) -> &'static str {
        "Activity (releases)"
    }
    // many repositories publish no releases at all
    fn scale(&self) -> AxisScale {
        AxisScale::SymLog { linthresh: 1.0 }
    }
    fn apply(&self, row: &ReportRow) -> f64 {
        row.releases_count as f64
    }
}
