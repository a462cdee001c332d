use async_trait::async_trait;
use chrono::{DateTime, Utc};
use database::Context;
use model::github::RepositoryNode;
use model::{CollectorContext, RepositoryRecord};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::CollectError;

/// One page of search results, non-repository nodes already dropped.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Total matches reported by the search, not the page size.
    pub repository_count: u64,
    pub nodes: Vec<RepositoryNode>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn fetch_page(&self, first: u32, after: Option<&str>) -> Result<SearchPage, CollectError>;
}

/// Pages through `source` until `target` distinct repositories are gathered or
/// the results run out. The result is sorted by stars, most starred first.
pub async fn collect_repositories<S>(
    source: &S,
    target: usize,
    page_size: u32,
    page_delay: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<RepositoryRecord>, CollectError>
where
    S: SearchSource + ?Sized,
{
    let page_size = page_size.max(1);
    let mut records: Vec<RepositoryRecord> = Vec::with_capacity(target);
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut has_next_page = true;

    while has_next_page && records.len() < target {
        let remaining = (target - records.len()).min(u32::MAX as usize) as u32;
        let first = page_size.min(remaining);
        let page = source.fetch_page(first, cursor.as_deref()).await?;
        if cursor.is_none() {
            info!("  Search reports {} matching repositories", page.repository_count);
        }

        for node in page.nodes {
            if records.len() >= target {
                break;
            }
            let record = RepositoryRecord::from_node(node, now);
            if !seen.insert(record.full_name.to_lowercase()) {
                warn!(repo = %record.full_name, "duplicate search result skipped");
                continue;
            }
            records.push(record);
        }

        info!("  {} of {} repositories collected", records.len(), target);

        has_next_page = page.has_next_page;
        cursor = page.end_cursor;
        if has_next_page && cursor.is_none() {
            warn!("search reported another page without a cursor, stopping");
            break;
        }
        if has_next_page && records.len() < target && !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }
    }

    records.sort_by(|a, b| b.stars_count.cmp(&a.stars_count));
    records.truncate(target);
    Ok(records)
}

/// Collects per `ctx` and overwrites `repos.csv`.
pub async fn collect_and_store<S>(
    source: &S,
    ctx: &CollectorContext,
    storage: &Context,
) -> Result<Vec<RepositoryRecord>, CollectError>
where
    S: SearchSource + ?Sized,
{
    info!(
        "Searching the {} most popular {} repositories...",
        ctx.settings.target_count, ctx.language
    );
    let records = collect_repositories(
        source,
        ctx.settings.target_count,
        ctx.settings.page_size,
        Duration::from_millis(ctx.settings.page_delay_ms),
        Utc::now(),
    )
    .await?;

    let table = storage.repository_stg();
    table.write_all(&records)?;
    info!(
        "{} repositories saved to {}",
        records.len(),
        table.path().display()
    );
    Ok(records)
}
