//! Confinode inspector
//!
//! Searches or loads the configuration of an application and prints it as
//! JSON, together with the file each value comes from.

use anyhow::Result;
use clap::Parser;
use confinode::cli::{Cli, Command};
use confinode::description::any_item;
use confinode::logging::level_to_tracing;
use confinode::{Confinode, ConfinodeOptions, Level, Logger};
use serde_json::json;
use std::fs::OpenOptions;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn message_level(cli: &Cli) -> Level {
    if cli.verbose { Level::Trace } else { Level::Warning }
}

/// `RUST_LOG` wins over the verbosity flag.
fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_tracing(level).as_str().to_lowercase()))
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = message_level(cli);
    match cli.log.as_str() {
        "0" | "off" => {}
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(level))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(env_filter(level))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn build_options(cli: &Cli) -> ConfinodeOptions {
    let logger = Logger::new()
        .with_name(cli.name.clone())
        .with_min_level(message_level(cli));
    let mut options = ConfinodeOptions::discover().with_logger(logger);
    if cli.no_cache {
        options = options.with_cache(false);
    }
    if let Some(stop) = &cli.search_stop {
        options = options.with_search_stop(stop.clone());
    }
    for path in &cli.module_paths {
        options = options.with_module_path(path.clone());
    }
    options
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let confinode = Confinode::new(cli.name.clone(), any_item(), build_options(&cli));
    debug!(name = %confinode.name(), sync = cli.sync, "Starting inspection");

    let found = match (&cli.command, cli.sync) {
        (Command::Search { start }, false) => confinode.search(start.as_deref()).await,
        (Command::Search { start }, true) => confinode.search_sync(start.as_deref()),
        (Command::Load { file }, false) => confinode.load(file).await,
        (Command::Load { file }, true) => confinode.load_sync(file),
    };

    let Some(found) = found else {
        eprintln!("No configuration found for {}", cli.name);
        std::process::exit(1);
    };
    let output = json!({
        "configuration": found.configuration(),
        "fileName": found.file_name(),
        "files": found.files(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
