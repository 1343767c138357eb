//! Leveled messages emitted while searching and loading configuration.

use crate::error::ConfinodeError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Severity of a message. Ordered from the most verbose to the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Information,
    Warning,
    Error,
}

/// Content of a message, one variant per catalog entry.
#[derive(Debug, Clone)]
pub enum MessageContent {
    /// An error that stopped a search or a load.
    Failure(Arc<ConfinodeError>),
    EmptyConfiguration,
    LoadedFromCache,
    LoadedConfiguration(PathBuf),
    LoadingFile(PathBuf),
    UsingLoader(String),
    /// Base path (without extension) matching several files.
    MultipleFiles(PathBuf),
    SearchInFolder(PathBuf),
}

/// A leveled message sent to the logger.
#[derive(Debug, Clone)]
pub struct Message {
    pub level: Level,
    pub content: MessageContent,
}

impl Message {
    pub fn new(level: Level, content: MessageContent) -> Self {
        Self { level, content }
    }

    pub fn trace(content: MessageContent) -> Self {
        Self::new(Level::Trace, content)
    }

    /// Wrap an error into an error-level message.
    pub fn failure(error: ConfinodeError) -> Self {
        Self::new(Level::Error, MessageContent::Failure(Arc::new(error)))
    }

    /// Catalog identifier, e.g. `missingMandatory` or `loadedFromCache`.
    pub fn id(&self) -> &'static str {
        match &self.content {
            MessageContent::Failure(error) => error.id(),
            MessageContent::EmptyConfiguration => "emptyConfiguration",
            MessageContent::LoadedFromCache => "loadedFromCache",
            MessageContent::LoadedConfiguration(_) => "loadedConfiguration",
            MessageContent::LoadingFile(_) => "loadingFile",
            MessageContent::UsingLoader(_) => "usingLoader",
            MessageContent::MultipleFiles(_) => "multipleFiles",
            MessageContent::SearchInFolder(_) => "searchInFolder",
        }
    }

    /// The error carried by a failure message.
    pub fn error(&self) -> Option<&ConfinodeError> {
        match &self.content {
            MessageContent::Failure(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            MessageContent::Failure(error) => write!(f, "{error}"),
            MessageContent::EmptyConfiguration => write!(f, "Empty configuration"),
            MessageContent::LoadedFromCache => write!(f, "Loaded from cache"),
            MessageContent::LoadedConfiguration(file) => {
                write!(f, "Loaded configuration from file {}", file.display())
            }
            MessageContent::LoadingFile(file) => write!(f, "Loading file {}", file.display()),
            MessageContent::UsingLoader(loader) => write!(f, "Using {loader} loader"),
            MessageContent::MultipleFiles(path) => {
                write!(f, "Multiple configuration files found for “{}.*”", path.display())
            }
            MessageContent::SearchInFolder(folder) => {
                write!(f, "Search for configuration in {}", folder.display())
            }
        }
    }
}
