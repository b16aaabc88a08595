//! Switchboard CLI Binary
//!
//! Loads configuration, installs logging, and runs one command. The
//! orchestrator is always shut down before the process exits.

use anyhow::Context;
use clap::Parser;
use switchboard::config::ConfigLoader;
use switchboard::logging::init_logging;
use switchboard::tooling::cli::{Cli, CliContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref()).context("loading configuration")?;
    cli.apply_logging_overrides(&mut config.logging);
    init_logging(Some(&config.logging), cli.log_file.clone()).context("initializing logging")?;

    let context = CliContext::new(config)
        .await
        .context("building agents")?;
    let output = context.execute(&cli.command).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
