//! Options of a [`Confinode`](super::Confinode) instance.

use crate::description::parse_boolean;
use crate::files::{FileDescription, FilesFilter, default_files};
use crate::loader::{LoaderEntry, ModuleResolver, PathResolver};
use crate::logging::Logger;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Files searched in each folder.
#[derive(Clone, Default)]
pub enum FilesOption {
    /// The default file list for the application name.
    #[default]
    Default,
    /// An explicit list. An empty list keeps the defaults.
    Explicit(Vec<FileDescription>),
    /// Filters applied in order to the default list.
    Filters(Vec<FilesFilter>),
}

impl FilesOption {
    pub(crate) fn resolve(&self, name: &str) -> Vec<FileDescription> {
        match self {
            FilesOption::Explicit(files) if !files.is_empty() => files.clone(),
            FilesOption::Filters(filters) => filters
                .iter()
                .fold(default_files(name), |files, filter| filter(files)),
            _ => default_files(name),
        }
    }
}

#[derive(Clone)]
pub struct ConfinodeOptions {
    /// Cache folder listings, file contents and results.
    pub cache: bool,
    /// Folder where the upward search stops. Defaults to the home folder.
    pub search_stop: Option<PathBuf>,
    /// Extra paths to resolve file and module names from, after the
    /// current folder.
    pub module_paths: Vec<PathBuf>,
    pub files: FilesOption,
    /// Defaults to a logger named after the application.
    pub logger: Option<Logger>,
    /// Loaders tried before the built-in ones.
    pub custom_loaders: Vec<LoaderEntry>,
    pub resolver: Arc<dyn ModuleResolver>,
    /// Folder relative paths are resolved from. Defaults to the process
    /// working directory.
    pub current_dir: Option<PathBuf>,
}

impl Default for ConfinodeOptions {
    fn default() -> Self {
        Self {
            cache: true,
            search_stop: dirs::home_dir(),
            module_paths: Vec::new(),
            files: FilesOption::Default,
            logger: None,
            custom_loaders: Vec::new(),
            resolver: Arc::new(PathResolver),
            current_dir: None,
        }
    }
}

impl ConfinodeOptions {
    /// Default options overridden from the environment:
    /// - `CONFINODE_SEARCH_STOP`: folder where the search stops
    /// - `CONFINODE_CACHE`: boolean (`yes`, `0`, `false`...)
    /// - `CONFINODE_MODULE_PATHS`: platform path list
    pub fn discover() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConfinodeOptions::discover`], reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(stop) = lookup("CONFINODE_SEARCH_STOP").filter(|stop| !stop.is_empty()) {
            options.search_stop = Some(PathBuf::from(stop));
        }
        if let Some(cache) = lookup("CONFINODE_CACHE").and_then(|value| parse_boolean(&Value::String(value))) {
            options.cache = cache;
        }
        if let Some(paths) = lookup("CONFINODE_MODULE_PATHS") {
            options.module_paths = std::env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        options
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_search_stop(mut self, search_stop: impl Into<PathBuf>) -> Self {
        self.search_stop = Some(search_stop.into());
        self
    }

    /// Search up to the filesystem root.
    pub fn without_search_stop(mut self) -> Self {
        self.search_stop = None;
        self
    }

    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_paths.push(path.into());
        self
    }

    pub fn with_files(mut self, files: Vec<FileDescription>) -> Self {
        self.files = FilesOption::Explicit(files);
        self
    }

    /// Add a filter on the default files. Replaces an explicit list.
    pub fn with_files_filter(mut self, filter: FilesFilter) -> Self {
        match &mut self.files {
            FilesOption::Filters(filters) => filters.push(filter),
            files => *files = FilesOption::Filters(vec![filter]),
        }
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_loader(mut self, entry: LoaderEntry) -> Self {
        self.custom_loaders.push(entry);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_current_dir(mut self, current_dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(current_dir.into());
        self
    }
}
