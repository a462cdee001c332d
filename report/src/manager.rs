use crate::chart;
use crate::dataset::{join, QualityMetric, ReportRow};
use crate::error::ReportError;
use crate::export;
use crate::pass::activity::Activity;
use crate::pass::maturity::Maturity;
use crate::pass::popularity::Popularity;
use crate::pass::size::Size;
use crate::pass::ReportPass;
use crate::stats::{describe, CorrelationMatrix, DescriptiveStats, Series};
use database::Context;
use model::ReportContext;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Research questions drawn side by side in one figure.
const QUESTIONS_PER_FIGURE: usize = 2;

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub rows: Vec<ReportRow>,
    pub stats: Vec<DescriptiveStats>,
    pub correlation: CorrelationMatrix,
}

pub struct ReportManager {
    passes: Vec<Arc<dyn ReportPass>>,
    draw_charts: bool,
}

impl Default for ReportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportManager {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            draw_charts: true,
        }
    }

    pub fn add_default_passes(&mut self) {
        self.add_pass(Arc::new(Popularity));
        self.add_pass(Arc::new(Maturity));
        self.add_pass(Arc::new(Activity));
        self.add_pass(Arc::new(Size));
    }

    pub fn add_pass(&mut self, pass: Arc<dyn ReportPass>) {
        self.passes.push(pass);
    }

    pub fn without_charts(mut self) -> Self {
        self.draw_charts = false;
        self
    }

    /// Process metric columns in pass order, then the quality metrics.
    pub fn series(&self, rows: &[ReportRow]) -> Vec<Series> {
        let process = self
            .passes
            .iter()
            .map(|pass| Series::new(pass.name(), rows.iter().map(|r| pass.apply(r)).collect()));
        let quality = QualityMetric::ALL
            .iter()
            .map(|m| Series::new(m.column(), rows.iter().map(|r| m.value(r)).collect()));
        process.chain(quality).collect()
    }

    pub fn run(&self, ctx: &ReportContext, storage: &Context) -> Result<ReportOutcome, ReportError> {
        let repositories = storage.repository_stg().read_all()?;
        let metrics = storage.metrics_stg().read_all()?;
        let rows = join(&repositories, &metrics)?;
        info!("{} repositories in the analysis.", rows.len());

        let series = self.series(&rows);
        let stats: Vec<DescriptiveStats> = series.iter().map(describe).collect();
        log_stats(&stats);
        let correlation = CorrelationMatrix::spearman(&series);

        export::write_descriptive_stats(&ctx.data_dir.join(export::STATS_FILE), &stats)?;
        export::write_correlation(&ctx.data_dir.join(export::CORRELATION_FILE), &correlation)?;
        export::write_spreadsheet(&ctx.data_dir.join(export::SPREADSHEET_FILE), &rows)?;

        if self.draw_charts {
            self.draw_all(&ctx.charts_dir, &rows, &correlation);
        }

        Ok(ReportOutcome {
            rows,
            stats,
            correlation,
        })
    }

    /// Chart failures are logged; the tables above are already on disk.
    fn draw_all(&self, charts_dir: &Path, rows: &[ReportRow], correlation: &CorrelationMatrix) {
        if let Err(e) = std::fs::create_dir_all(charts_dir) {
            warn!("Charts skipped, cannot create {}: {}", charts_dir.display(), e);
            return;
        }

        let mut results = vec![
            chart::correlation_heatmap(&charts_dir.join(chart::HEATMAP_FILE), correlation),
            chart::stars_vs_loc(&charts_dir.join(chart::STARS_VS_LOC_FILE), rows),
            chart::age_vs_cbo(&charts_dir.join(chart::AGE_VS_CBO_FILE), rows),
            chart::top_by_loc(&charts_dir.join(chart::TOP_BY_LOC_FILE), rows),
        ];
        for (index, group) in self.passes.chunks(QUESTIONS_PER_FIGURE).enumerate() {
            let file = chart::question_grid_file(index * QUESTIONS_PER_FIGURE, group.len());
            results.push(chart::question_grid(&charts_dir.join(file), rows, group));
        }

        let total = results.len();
        let mut drawn = 0;
        for result in results {
            match result {
                Ok(()) => drawn += 1,
                Err(e) => warn!("{}", e),
            }
        }
        info!("{}/{} charts saved to {}", drawn, total, charts_dir.display());
    }
}

fn log_stats(stats: &[DescriptiveStats]) {
    info!("--- descriptive statistics ---");
    info!(
        "{:<12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "metric", "mean", "median", "std", "min", "max"
    );
    for s in stats {
        info!(
            "{:<12} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            s.metric, s.mean, s.median, s.std, s.min, s.max
        );
    }
}
