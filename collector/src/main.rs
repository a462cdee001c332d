use anyhow::{Context as _, Result};
use clap::Parser;
use collector::{collect_and_store, CollectError, GithubClient};
use database::Context;
use model::PipelineContext;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Collects the most starred repositories of a language into repos.csv.
#[derive(Debug, Parser)]
#[command(name = "collector", version)]
struct Args {
    /// TOML settings file; environment variables override it.
    #[arg(long, default_value = "config/pipeline.toml")]
    config: String,

    /// Number of repositories to collect.
    #[arg(long)]
    count: Option<usize>,

    /// Search page size.
    #[arg(long)]
    page_size: Option<u32>,
}

fn init_logger() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(false),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();
    let args = Args::parse();

    let pipeline = PipelineContext::load_config(&args.config)?;
    let mut ctx = pipeline.collector()?;
    if let Some(count) = args.count {
        ctx.settings.target_count = count;
    }
    if let Some(page_size) = args.page_size {
        ctx.settings.page_size = page_size;
    }

    std::fs::create_dir_all(&ctx.data_dir)
        .with_context(|| format!("Failed to create {}", ctx.data_dir.display()))?;
    let storage = Context::new(&ctx.data_dir);
    let client = GithubClient::new(&ctx)?;

    info!("--- repository collection started ---");
    match collect_and_store(&client, &ctx, &storage).await {
        Ok(records) if records.is_empty() => {
            info!("No repositories matched the search.");
        }
        Ok(_) => {}
        Err(CollectError::RateLimitExceeded { reset_at }) => {
            error!(
                "GitHub API rate limit exceeded, try again after {}",
                reset_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            return Err(CollectError::RateLimitExceeded { reset_at }.into());
        }
        Err(e) => return Err(e).context("Repository collection failed"),
    }
    info!("--- repository collection finished ---");

    Ok(())
}
