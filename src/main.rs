use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use review_insight::{
    app::ComponentRegistry, config::Config, dataset::load_reviews, pipeline::report::write_report,
};

/// Batch analysis of theme-park reviews.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the review CSV.
    #[arg(long, env = "REVIEW_DATASET_PATH")]
    dataset: PathBuf,

    /// Directory the report tables are written to.
    #[arg(long, env = "REPORT_OUTPUT_DIR", default_value = "reports")]
    output_dir: PathBuf,

    /// Stop after sentiment annotation.
    #[arg(long)]
    skip_topics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(|s| s.as_str())
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                message,
                "panic occurred"
            );
        } else {
            error!(thread = thread_name, message, "panic occurred");
        }
    }));

    let args = Args::parse();

    // Tracing initialization is handled by Telemetry::new()
    let config = Config::from_env().context("failed to load configuration")?;
    let registry = ComponentRegistry::build(config, args.skip_topics)
        .context("failed to build component registry")?;

    let corpus = load_reviews(&args.dataset)?;
    let outcome = registry.pipeline().run(corpus).await?;
    let metrics = registry.telemetry().metrics();
    let files = write_report(&outcome, &args.output_dir, Some(metrics.as_ref()))?;

    info!(
        run_id = %outcome.context.run_id,
        annotated = outcome.summary.annotated,
        "analysis complete"
    );
    for file in &files.files {
        println!("{}", file.display());
    }

    Ok(())
}
