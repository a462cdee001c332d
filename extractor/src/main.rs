use anyhow::{Context as _, Result};
use clap::Parser;
use database::Context;
use extractor::{extract_all, CkAnalyzer};
use model::PipelineContext;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Clones every repository in repos.csv, runs CK on it and writes metrics.csv.
#[derive(Debug, Parser)]
#[command(name = "extractor", version)]
struct Args {
    /// TOML settings file; environment variables override it.
    #[arg(long, default_value = "config/pipeline.toml")]
    config: String,

    /// Only process the first N repositories.
    #[arg(long)]
    limit: Option<usize>,
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
    let mut ctx = pipeline.extractor()?;
    if args.limit.is_some() {
        ctx.settings.max_repositories = args.limit;
    }

    for dir in [&ctx.repositories_dir, &ctx.ck_output_dir, &ctx.data_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let storage = Context::new(&ctx.data_dir);
    let analyzer = CkAnalyzer::new(&ctx)?;
    info!(
        "--- metrics extraction started (ck output in {}) ---",
        analyzer.output_dir().display()
    );
    extract_all(&ctx, &analyzer, &storage)
        .await
        .context("Metrics extraction failed")?;
    info!("--- metrics extraction finished ---");

    Ok(())
}
