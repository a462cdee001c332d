use anyhow::{Context as _, Result};
use clap::Parser;
use database::Context;
use model::PipelineContext;
use report::ReportManager;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Joins repos.csv with metrics.csv and writes statistics, charts and report.xlsx.
#[derive(Debug, Parser)]
#[command(name = "report", version)]
struct Args {
    /// TOML settings file; environment variables override it.
    #[arg(long, default_value = "config/pipeline.toml")]
    config: String,

    /// Only write the tables and the spreadsheet.
    #[arg(long)]
    no_charts: bool,
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

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();
    let args = Args::parse();

    let ctx = PipelineContext::load_config(&args.config)?.report();
    let storage = Context::new(&ctx.data_dir);

    let mut manager = ReportManager::new();
    if args.no_charts {
        manager = manager.without_charts();
    }
    manager.add_default_passes();

    info!("--- report generation started ---");
    let outcome = manager
        .run(&ctx, &storage)
        .context("Report generation failed")?;
    info!(
        "--- report generation finished: {} repositories ---",
        outcome.rows.len()
    );

    Ok(())
}
