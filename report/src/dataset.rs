use model::{MetricsRecord, RepositoryRecord};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ReportError;
use crate::scale::AxisScale;

/// One repository of the analysis: the repository record joined with its
/// metrics, plus the per-class normalized quality values.
///
/// Field order is the column order of the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub full_name: String,
    pub repo_name: String,
    pub owner: String,
    pub stars_count: u64,
    pub releases_count: u64,
    pub repo_age_years: f64,
    pub ck_loc: i64,
    pub java_files_count: u64,
    pub ck_cbo: i64,
    pub ck_dit: f64,
    pub ck_lcom: f64,
    pub url: String,
    pub cbo_avg: f64,
    pub dit_avg: f64,
    pub lcom_avg: f64,
}

impl ReportRow {
    /// `java_files_count` must be positive.
    fn joined(repo: &RepositoryRecord, metrics: &MetricsRecord) -> Self {
        let files = metrics.java_files_count as f64;
        ReportRow {
            full_name: repo.full_name.clone(),
            repo_name: repo.repo_name.clone(),
            owner: repo.owner.clone(),
            stars_count: repo.stars_count,
            releases_count: repo.releases_count,
            repo_age_years: repo.repo_age_years,
            ck_loc: metrics.ck_loc,
            java_files_count: metrics.java_files_count,
            ck_cbo: metrics.ck_cbo,
            ck_dit: metrics.ck_dit,
            ck_lcom: metrics.ck_lcom,
            url: repo.url.clone(),
            cbo_avg: metrics.ck_cbo as f64 / files,
            // ck_dit and ck_lcom are already per-class means.
            dit_avg: metrics.ck_dit,
            lcom_avg: metrics.ck_lcom,
        }
    }
}

/// Inner join on `full_name`, in repository table order. Metric rows without
/// analyzed files are dropped first.
///
/// `repo_name` alone is not an identity: forks and namesakes under different
/// owners share it.
pub fn join(
    repositories: &[RepositoryRecord],
    metrics: &[MetricsRecord],
) -> Result<Vec<ReportRow>, ReportError> {
    let mut by_name: HashMap<&str, &MetricsRecord> = HashMap::new();
    for m in metrics.iter().filter(|m| m.java_files_count > 0) {
        by_name.entry(m.full_name.as_str()).or_insert(m);
    }

    let rows: Vec<ReportRow> = repositories
        .iter()
        .filter_map(|repo| {
            by_name
                .get(repo.full_name.as_str())
                .map(|m| ReportRow::joined(repo, m))
        })
        .collect();

    if rows.is_empty() {
        return Err(ReportError::JoinEmpty {
            repositories: repositories.len(),
            metrics: metrics.len(),
        });
    }
    Ok(rows)
}

/// The normalized code-quality columns every research question is plotted
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMetric {
    Cbo,
    Dit,
    Lcom,
}

impl QualityMetric {
    pub const ALL: [QualityMetric; 3] = [QualityMetric::Cbo, QualityMetric::Dit, QualityMetric::Lcom];

    pub fn column(self) -> &'static str {
        match self {
            QualityMetric::Cbo => "cbo_avg",
            QualityMetric::Dit => "dit_avg",
            QualityMetric::Lcom => "lcom_avg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityMetric::Cbo => "Mean CBO",
            QualityMetric::Dit => "Mean DIT",
            QualityMetric::Lcom => "Mean LCOM",
        }
    }

    /// LCOM spans several orders of magnitude.
    pub fn scale(self) -> AxisScale {
        match self {
            QualityMetric::Lcom => AxisScale::SymLog { linthresh: 1.0 },
            QualityMetric::Cbo | QualityMetric::Dit => AxisScale::Linear,
        }
    }

    pub fn value(self, row: &ReportRow) -> f64 {
        match self {
            QualityMetric::Cbo => row.cbo_avg,
            QualityMetric::Dit => row.dit_avg,
            QualityMetric::Lcom => row.lcom_avg,
        }
    }
}
