//! PNG charts drawn with plotters.
//!
//! Every chart is drawn in the transformed coordinate space of its
//! [`AxisScale`]s; tick labels are mapped back to data values.

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use crate::dataset::{QualityMetric, ReportRow};
use crate::error::ReportError;
use crate::pass::ReportPass;
use crate::scale::{format_tick, AxisScale};
use crate::stats::CorrelationMatrix;

pub const HEATMAP_FILE: &str = "correlation_heatmap.png";
pub const STARS_VS_LOC_FILE: &str = "stars_vs_loc.png";
pub const AGE_VS_CBO_FILE: &str = "repo_age_vs_cbo.png";
pub const TOP_BY_LOC_FILE: &str = "top_10_by_loc.png";

const FONT: &str = "sans-serif";
const POINT_COLOR: RGBColor = RGBColor(59, 82, 139);
const BAR_COLOR: RGBColor = RGBColor(33, 145, 140);
const UNDEFINED_COLOR: RGBColor = RGBColor(200, 200, 200);

type DrawResult = Result<(), Box<dyn Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

struct ScatterSpec<'a> {
    title: String,
    x_label: &'a str,
    y_label: &'a str,
    x_scale: AxisScale,
    y_scale: AxisScale,
}

/// File name of the scatter grid holding the passes `first..first + len`.
pub fn question_grid_file(first: usize, len: usize) -> String {
    let ids: Vec<String> = (first + 1..=first + len).map(|i| format!("rq{i}")).collect();
    format!("{}_plots.png", ids.join("_"))
}

pub fn correlation_heatmap(path: &Path, matrix: &CorrelationMatrix) -> Result<(), ReportError> {
    finish(path, draw_heatmap(path, matrix))
}

/// One row per pass, one column per quality metric.
pub fn question_grid(
    path: &Path,
    rows: &[ReportRow],
    passes: &[Arc<dyn ReportPass>],
) -> Result<(), ReportError> {
    finish(path, draw_question_grid(path, rows, passes))
}

pub fn stars_vs_loc(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let spec = ScatterSpec {
        title: "Stars vs. lines of code".to_owned(),
        x_label: "Stars",
        y_label: "Lines of code",
        x_scale: AxisScale::Log,
        y_scale: AxisScale::Log,
    };
    let points: Vec<(f64, f64)> = rows
        .iter()
        .map(|r| (r.stars_count as f64, r.ck_loc as f64))
        .collect();
    finish(path, draw_single_scatter(path, &spec, &points))
}

pub fn age_vs_cbo(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    let spec = ScatterSpec {
        title: "Repository age vs. coupling (CBO)".to_owned(),
        x_label: "Repository age (years)",
        y_label: "Total coupling (CBO)",
        x_scale: AxisScale::Linear,
        y_scale: AxisScale::Linear,
    };
    let points: Vec<(f64, f64)> = rows
        .iter()
        .map(|r| (r.repo_age_years, r.ck_cbo as f64))
        .collect();
    finish(path, draw_single_scatter(path, &spec, &points))
}

pub fn top_by_loc(path: &Path, rows: &[ReportRow]) -> Result<(), ReportError> {
    finish(path, draw_top_by_loc(path, rows, 10))
}

fn finish(path: &Path, result: DrawResult) -> Result<(), ReportError> {
    result.map_err(|e| ReportError::Chart {
        name: path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
        reason: e.to_string(),
    })
}

fn draw_scatter(area: &Area<'_>, spec: &ScatterSpec<'_>, points: &[(f64, f64)]) -> DrawResult {
    let (xs, ys) = (spec.x_scale, spec.y_scale);
    let placed: Vec<(f64, f64)> = points
        .iter()
        .filter(|(x, y)| xs.accepts(*x) && ys.accepts(*y))
        .map(|&(x, y)| (xs.forward(x), ys.forward(y)))
        .collect();
    let x_range = AxisScale::Linear.range(placed.iter().map(|p| p.0));
    let y_range = AxisScale::Linear.range(placed.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(&spec.title, (FONT, 20))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(65)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(format!("{}{}", spec.x_label, xs.describe()))
        .y_desc(format!("{}{}", spec.y_label, ys.describe()))
        .x_label_formatter(&|v| format_tick(xs.inverse(*v)))
        .y_label_formatter(&|v| format_tick(ys.inverse(*v)))
        .draw()?;

    chart.draw_series(
        placed
            .iter()
            .map(|&p| Circle::new(p, 4, POINT_COLOR.mix(0.6).filled())),
    )?;
    Ok(())
}

fn draw_single_scatter(path: &Path, spec: &ScatterSpec<'_>, points: &[(f64, f64)]) -> DrawResult {
    let root = BitMapBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    draw_scatter(&root, spec, points)?;
    root.present()?;
    Ok(())
}

fn draw_question_grid(path: &Path, rows: &[ReportRow], passes: &[Arc<dyn ReportPass>]) -> DrawResult {
    let columns = QualityMetric::ALL.len();
    let height = 520 * u32::try_from(passes.len().max(1))?;
    let root = BitMapBackend::new(path, (600 * columns as u32, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((passes.len().max(1), columns));
    for (pass, row_panels) in passes.iter().zip(panels.chunks(columns)) {
        for (metric, panel) in QualityMetric::ALL.iter().zip(row_panels) {
            let spec = ScatterSpec {
                title: format!("{}: {} vs. {}", pass.question(), metric.label(), pass.label()),
                x_label: pass.label(),
                y_label: metric.label(),
                x_scale: pass.scale(),
                y_scale: metric.scale(),
            };
            let points: Vec<(f64, f64)> = rows
                .iter()
                .map(|r| (pass.apply(r), metric.value(r)))
                .collect();
            draw_scatter(panel, &spec, &points)?;
        }
    }
    root.present()?;
    Ok(())
}

fn draw_heatmap(path: &Path, matrix: &CorrelationMatrix) -> DrawResult {
    let names: Vec<&str> = matrix.names.iter().map(String::as_str).collect();
    let n = i32::try_from(names.len())?;

    let root = BitMapBackend::new(path, (1200, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Spearman correlation matrix", (FONT, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(120)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(names.len())
        .y_labels(names.len())
        .x_label_formatter(&|v| segment_name(&names, v, false).to_owned())
        .y_label_formatter(&|v| segment_name(&names, v, true).to_owned())
        .label_style((FONT, 15))
        .draw()?;

    // row 0 is drawn at the top
    let cells: Vec<(i32, i32, f64)> = (0..n)
        .zip(&matrix.values)
        .flat_map(|(i, row)| (0..n).zip(row).map(move |(j, v)| (j, n - 1 - i, *v)))
        .collect();

    chart.draw_series(cells.iter().map(|&(x, y, v)| {
        Rectangle::new(
            [
                (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
            ],
            diverging_color(v).filled(),
        )
    }))?;

    let annotation = TextStyle::from((FONT, 18).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(cells.iter().map(|&(x, y, v)| {
        Text::new(
            annotate(v),
            (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
            annotation.clone(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_top_by_loc(path: &Path, rows: &[ReportRow], limit: usize) -> DrawResult {
    let mut top: Vec<&ReportRow> = rows.iter().collect();
    top.sort_by(|a, b| b.ck_loc.cmp(&a.ck_loc));
    top.truncate(limit);
    let names: Vec<&str> = top.iter().map(|r| r.repo_name.as_str()).collect();
    let k = i32::try_from(top.len())?;
    let max = top.first().map_or(1.0, |r| r.ck_loc as f64).max(1.0);

    let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Top 10 repositories by lines of code", (FONT, 26))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(180)
        .build_cartesian_2d(0f64..max * 1.05, (0..k).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(names.len())
        .x_desc("Lines of code")
        .y_desc("Repository")
        .x_label_formatter(&|v| format_tick(*v))
        .y_label_formatter(&|v| segment_name(&names, v, true).to_owned())
        .draw()?;

    // the largest repository is drawn at the top
    chart.draw_series((0..k).zip(&top).map(|(rank, r)| {
        let y = k - 1 - rank;
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(y)),
                (r.ck_loc as f64, SegmentValue::Exact(y + 1)),
            ],
            BAR_COLOR.filled(),
        );
        bar.set_margin(6, 6, 0, 0);
        bar
    }))?;

    root.present()?;
    Ok(())
}

/// Category name under a segmented axis tick. `reversed` axes count from
/// the far end.
fn segment_name<'a>(names: &[&'a str], value: &SegmentValue<i32>, reversed: bool) -> &'a str {
    let index = match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => *i,
        SegmentValue::Last => return "",
    };
    let index = if reversed {
        names.len() as i32 - 1 - index
    } else {
        index
    };
    usize::try_from(index)
        .ok()
        .and_then(|i| names.get(i))
        .copied()
        .unwrap_or("")
}

fn annotate(value: f64) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else {
        format!("{value:.2}")
    }
}

/// Blue at -1, grey at 0, red at +1.
fn diverging_color(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if value.is_nan() {
        return UNDEFINED_COLOR;
    }
    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (NEUTRAL, COLD, -v)
    } else {
        (NEUTRAL, HOT, v)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_file_names() {
        assert_eq!(question_grid_file(0, 2), "rq1_rq2_plots.png");
        assert_eq!(question_grid_file(2, 2), "rq3_rq4_plots.png");
        assert_eq!(question_grid_file(4, 1), "rq5_plots.png");
    }

    #[test]
    fn test_diverging_palette_endpoints() {
        assert_eq!(diverging_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging_color(0.0), RGBColor(221, 221, 221));
        assert_eq!(diverging_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging_color(3.0), diverging_color(1.0));
        assert_eq!(diverging_color(f64::NAN), UNDEFINED_COLOR);
    }

    #[test]
    fn test_segment_names() {
        let names = ["popularity", "maturity", "cbo_avg"];
        assert_eq!(segment_name(&names, &SegmentValue::CenterOf(0), false), "popularity");
        assert_eq!(segment_name(&names, &SegmentValue::CenterOf(0), true), "cbo_avg");
        assert_eq!(segment_name(&names, &SegmentValue::Exact(3), false), "");
        assert_eq!(segment_name(&names, &SegmentValue::Last, false), "");
    }

    #[test]
    fn test_annotations() {
        assert_eq!(annotate(0.456), "0.46");
        assert_eq!(annotate(-1.0), "-1.00");
        assert_eq!(annotate(f64::NAN), "nan");
    }
}
