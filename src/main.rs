// Main entry point for turbotests

use anyhow::Result;
use std::process::ExitCode;
use tracing::info;

use turbotests::cli::Cli;
use turbotests::commands::{self, RunOptions};
use turbotests::config::Config;
use turbotests::logging;
use turbotests::report::FormatterRegistry;

/// Exit status for fatal errors, distinct from "tests failed"
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run() -> Result<ExitCode> {
    // Load configuration from file (if exists)
    let file_config = Config::load();
    let config = file_config.clone().unwrap_or_default();

    let (cli, formatters) = Cli::parse_with_formatters();
    logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting turbotests v{}", env!("CARGO_PKG_VERSION"));
    }

    if let Some(ref shell_type) = cli.completion {
        commands::handle_completion(shell_type)?;
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(ref config_file) = cli.init_config {
        commands::handle_init_config(config_file)?;
        return Ok(ExitCode::SUCCESS);
    }

    let options = RunOptions::from_cli(&cli, formatters, &config);

    if cli.config {
        commands::handle_show_config(&cli, &options, file_config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let registry = FormatterRegistry::with_builtins();
    let report = commands::run_tests(&options, &registry).await?;

    info!(
        "Finished: {} examples, {} failures, {} pending",
        report.summary.total, report.summary.failed, report.summary.pending
    );
    Ok(ExitCode::from(report.exit_code() as u8))
}
