//! Command-line entry point for running gallery scenarios

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gallery_e2e::{GalleryConfig, GalleryRunner, Scenario};

#[derive(Parser, Debug)]
#[command(name = "gallery-e2e")]
#[command(about = "Exercise a hosted app gallery end to end")]
#[command(version)]
struct Cli {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "clone-and-run")]
    scenario: Scenario,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(flatten)]
    config: GalleryConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    if !cli.config.should_run() {
        info!("TEST_APP_NAME is not set, nothing to run");
        return Ok(());
    }

    let runner = GalleryRunner::new(cli.config);
    let result = runner.run(cli.scenario).await?;
    runner.write_results(&result)?;

    if !result.success {
        anyhow::bail!(
            "{} failed: {}",
            result.app_name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
