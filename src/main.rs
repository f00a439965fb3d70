// src/main.rs

use anyhow::Context;
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tagsense::common::StdTimer;
use tagsense::config::{Config, DEFAULT_CONFIG_FILE};
use tagsense::logging::init_logging;
use tagsense::{reader, ShellRunner, TagController};

/// Launch a command for the NFC tag on the reader and run an exit action when it leaves.
#[derive(Debug, Parser)]
#[command(name = "tagsense", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured log level (e.g. debug).
    #[arg(long)]
    log_level: Option<String>,

    /// Validate the configuration, print a summary and exit.
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration problems are fatal before anything else starts.
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    if cli.check {
        print_summary(&cli.config, &config);
        return Ok(());
    }

    init_logging(&config.log).context("failed to initialize logging")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }

    tracing::info!(
        driver = %config.reader.driver,
        port = %config.reader.port,
        remove_timeout = config.reader.remove_timeout,
        tags = config.tag_commands.len(),
        "starting"
    );

    let reader = reader::from_config(&config.reader);
    let runner = ShellRunner::new(config.reader.exit_command.clone());
    let mut controller = TagController::new(
        reader,
        runner,
        StdTimer::new(),
        config.tag_commands,
        config.reader.remove_timeout,
    );
    controller.run(&shutdown);
    Ok(())
}

fn print_summary(path: &std::path::Path, config: &Config) {
    println!("{}: ok", path.display());
    println!(
        "reader: {} on {} @ {} baud",
        config.reader.driver, config.reader.port, config.reader.baud_rate
    );
    println!("remove_timeout: {}s", config.reader.remove_timeout);
    println!("exit_command: {}", config.reader.exit_command);
    let mut entries: Vec<_> = config.tag_commands.iter().collect();
    entries.sort_by_key(|(tag, _)| tag.to_hex());
    for (tag, command) in entries {
        println!("  {tag} -> {command}");
    }
}
