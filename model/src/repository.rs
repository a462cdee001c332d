use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::RepositoryNode;

/// One row of `repos.csv`: identity plus popularity, activity and maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub owner: String,
    pub repo_name: String,
    pub full_name: String,
    pub url: String,
    pub stars_count: u64,
    pub releases_count: u64,
    pub repo_age_years: f64,
}

impl RepositoryRecord {
    pub fn from_node(node: RepositoryNode, now: DateTime<Utc>) -> Self {
        let full_name = format!("{}/{}", node.owner.login, node.name);
        Self {
            repo_age_years: repo_age_years(node.created_at, now),
            owner: node.owner.login,
            repo_name: node.name,
            full_name,
            url: node.url,
            stars_count: node.stargazer_count,
            releases_count: node.releases.total_count,
        }
    }
}

/// Whole days since creation over 365.25, two decimals. Clock skew never yields a negative age.
pub fn repo_age_years(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_days().max(0);
    round2(days as f64 / 365.25)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One row of CK's `class.csv`. CK writes many more columns; only these are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub file: String,
    pub cbo: i64,
    pub dit: f64,
    pub lcom: f64,
    pub loc: i64,
}

/// One row of `metrics.csv`, keyed by `full_name` like `repos.csv`.
///
/// `ck_cbo` and `ck_loc` are totals over the analyzed classes, `ck_dit` and
/// `ck_lcom` are per-class means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub full_name: String,
    pub repo_name: String,
    pub ck_cbo: i64,
    pub ck_dit: f64,
    pub ck_lcom: f64,
    pub ck_loc: i64,
    pub java_files_count: u64,
}

impl MetricsRecord {
    /// Folds a per-class table into one record. `None` when the table is empty.
    pub fn aggregate(repository: &RepositoryRecord, classes: &[ClassMetrics]) -> Option<Self> {
        if classes.is_empty() {
            return None;
        }
        let count = classes.len() as f64;
        let dit_sum: f64 = classes.iter().map(|c| c.dit).sum();
        let lcom_sum: f64 = classes.iter().map(|c| c.lcom).sum();

        Some(Self {
            full_name: repository.full_name.clone(),
            repo_name: repository.repo_name.clone(),
            ck_cbo: classes.iter().map(|c| c.cbo).sum(),
            ck_dit: round2(dit_sum / count),
            ck_lcom: round2(lcom_sum / count),
            ck_loc: classes.iter().map(|c| c.loc).sum(),
            java_files_count: classes.len() as u64,
        })
    }
}
