// Commands module - handles CLI command execution

use anyhow::Result;
use std::path::Path;

use crate::cli::Cli;
use crate::config::{self, Config};

pub mod run;

pub use run::{RunOptions, RunReport, run_tests};

/// Handle shell completion
pub fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let shell = match shell_type.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        _ => {
            anyhow::bail!(
                "Unsupported shell: {}. Supported: bash, zsh, fish, elvish, powershell",
                shell_type
            );
        }
    };

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut stdout = std::io::stdout();

    generate(shell, &mut cmd, name, &mut stdout);

    Ok(())
}

/// Print the effective configuration
pub fn handle_show_config(cli: &Cli, options: &RunOptions, file: Option<&Config>) {
    println!("Current configuration:");
    println!("\n  Command-line arguments:");
    println!("    Processes: {}", options.processes);
    println!("    Group by: {:?}", options.group_by);
    for spec in &options.formatters {
        println!("    Formatter: {} -> {}", spec.name, spec.outputs.join(", "));
    }
    if let Some(threshold) = options.fail_fast {
        println!("    Fail fast: after {} failure(s)", threshold);
    }
    if let Some(ref seed) = cli.seed {
        println!("    Seed: {}", seed);
    }

    match file {
        Some(cfg) => {
            println!("\n  Configuration file loaded:");
            println!("    Processes: {}", cfg.general.processes);
            println!("    Default path: {}", cfg.general.default_path);
            println!("    File suffix: {}", cfg.general.file_suffix);
            if let Some(ref log) = cfg.general.runtime_log {
                println!("    Runtime log: {}", log);
            }
            println!("    Worker command: {}", cfg.worker.command.join(" "));
            println!("    Worker env var: {}", cfg.worker.env_var);
        }
        None => {
            println!("\n  No configuration file loaded");
            println!("  Create one with: turbotests --init-config .turbotestsrc");
        }
    }

    println!("\n  Environment variables:");
    match std::env::var(config::ENV_TURBOTESTS_PROCESSES) {
        Ok(value) => println!("    {}: {}", config::ENV_TURBOTESTS_PROCESSES, value),
        Err(_) => println!(
            "    {}: not set (default: {})",
            config::ENV_TURBOTESTS_PROCESSES,
            config::default_processes()
        ),
    }

    print_precedence();
}

/// Write a default configuration file
pub fn handle_init_config(path: &Path) -> Result<()> {
    std::fs::write(path, Config::default().to_toml())?;
    println!("Configuration file created: {}", path.display());
    println!("\nYou can now edit the file to customize your settings.");
    print_precedence();
    Ok(())
}

fn print_precedence() {
    println!("\nConfiguration precedence:");
    println!("  1. Command-line arguments (highest)");
    println!("  2. Environment variables");
    println!("  3. Configuration file");
    println!("  4. Built-in defaults (lowest)");
}
