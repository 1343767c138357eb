//! CLI command definitions for the confinode inspector.
//!
//! The inspector searches or loads the configuration of an application
//! without validation and prints it with its provenance.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect hierarchical application configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application name, used to build the searched file names
    pub name: String,

    /// Disable the caches
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Folder where the upward search stops (default: home folder)
    #[arg(long, global = true)]
    pub search_stop: Option<PathBuf>,

    /// Additional path to resolve files and loader modules from
    #[arg(short, long = "module-path", global = true)]
    pub module_paths: Vec<PathBuf>,

    /// Use the blocking file system and synchronous loaders only
    #[arg(long, global = true)]
    pub sync: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the configuration from a folder upward (default: current folder)
    Search {
        start: Option<PathBuf>,
    },

    /// Load a given configuration file
    Load {
        file: String,
    },
}
