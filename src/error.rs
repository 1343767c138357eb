//! Structured errors raised while describing, loading and parsing configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What a configuration entry was expected to be when validation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    Array,
    Boolean,
    /// One of the listed literal values.
    Choice(Vec<String>),
    Number,
    Object,
    String,
}

impl Expected {
    /// Message catalog identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Expected::Array => "expectedArray",
            Expected::Boolean => "expectedBoolean",
            Expected::Choice(_) => "expectedChoice",
            Expected::Number => "expectedNumber",
            Expected::Object => "expectedObject",
            Expected::String => "expectedString",
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Array => write!(f, "an array"),
            Expected::Boolean => write!(f, "a boolean"),
            Expected::Choice(choices) => write!(f, "one of: {}", choices.join(", ")),
            Expected::Number => write!(f, "a number"),
            Expected::Object => write!(f, "an object"),
            Expected::String => write!(f, "a string"),
        }
    }
}

/// Error raised by the configuration engine.
///
/// Schema validation and structural errors abort the current load. At the
/// public `search`/`load` boundary they are logged instead of returned.
#[derive(Debug, Error)]
pub enum ConfinodeError {
    #[error("Configuration error: missing mandatory “{key}” option")]
    MissingMandatory { key: String },

    #[error(
        "Configuration error: “{key}” is expected to be {expected}\n in file “{}”",
        .file.display()
    )]
    Expected {
        key: String,
        file: PathBuf,
        expected: Expected,
    },

    #[error("Extended files parameter is not properly formatted")]
    BadExtends,

    #[error("Recursion in configuration files:\n{}", format_chain(.0))]
    Recursion(Vec<PathBuf>),

    #[error("All loaders failed:\n{}", format_failures(.0))]
    AllLoadersFailed(Vec<(Option<String>, String)>),

    #[error("No appropriate loader found for file {}", .0.display())]
    NoLoaderFound(PathBuf),

    #[error("Configuration file “{0}” not found")]
    FileNotFound(String),

    #[error("Loader “{0}” declares an empty file type")]
    EmptyFileType(String),

    #[error("Error while loading configuration: {0:#}")]
    Loading(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConfinodeError {
    pub fn missing_mandatory(key: &str) -> Self {
        Self::MissingMandatory {
            key: key.to_string(),
        }
    }

    pub fn expected(key: &str, file: &Path, expected: Expected) -> Self {
        Self::Expected {
            key: key.to_string(),
            file: file.to_path_buf(),
            expected,
        }
    }

    /// Message catalog identifier of the error.
    pub fn id(&self) -> &'static str {
        match self {
            Self::MissingMandatory { .. } => "missingMandatory",
            Self::Expected { .. } => "expected",
            Self::BadExtends => "badExtends",
            Self::Recursion(_) => "recursion",
            Self::AllLoadersFailed(_) => "allLoadersFailed",
            Self::NoLoaderFound(_) => "noLoaderFound",
            Self::FileNotFound(_) => "fileNotFound",
            Self::EmptyFileType(_) => "emptyFileType",
            Self::Loading(_) => "loadingError",
            Self::Internal(_) => "internalError",
        }
    }
}

fn format_chain(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|file| file.display().to_string())
        .collect::<Vec<_>>()
        .join("\n  --> ")
}

fn format_failures(failures: &[(Option<String>, String)]) -> String {
    failures
        .iter()
        .map(|(loader, error)| format!(" * {}: {}", loader.as_deref().unwrap_or("(unknown)"), error))
        .collect::<Vec<_>>()
        .join("\n")
}
