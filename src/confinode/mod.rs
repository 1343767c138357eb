//! Search and load orchestration.
//!
//! A search walks from a starting folder up to the search stop, trying the
//! configured file descriptions in each folder. A load resolves a file
//! name and reads it. Both follow `extends` chains, detect recursion and
//! share three caches: folder listings, raw contents and results.

mod options;
mod protocol;

pub use options::{ConfinodeOptions, FilesOption};
pub use protocol::{AsyncDriver, Driver, Request, Response, SyncDriver};

use crate::cache::Cache;
use crate::description::{Description, ParserContext};
use crate::error::ConfinodeError;
use crate::files::FileDescription;
use crate::loader::{LoaderRegistry, ModuleResolver, SelectedLoader};
use crate::logging::Logger;
use crate::messages::{Level, Message, MessageContent};
use crate::paths::{absolute_path, parent_folder};
use crate::result::{ConfigurationResult, ResultFile};
use futures::FutureExt;
use futures::future::BoxFuture;
use protocol::{file_exists, folder_content, is_folder, load_file};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const FOLDER_CACHE_AGE: Duration = Duration::from_secs(60);
const FOLDER_CACHE_SIZE: usize = 18;
const CONTENT_CACHE_AGE: Duration = Duration::from_secs(300);
const CONTENT_CACHE_SIZE: usize = 24;
const RESULT_CACHE_AGE: Duration = Duration::from_secs(300);
const RESULT_CACHE_SIZE: usize = 36;

/// Outcome of a search or a load.
pub type Found = Option<Arc<ConfigurationResult>>;

/// A cached outcome, remembering whether it went through the final round.
#[derive(Clone)]
struct CachedResult {
    result: Found,
    is_final: bool,
}

/// How the loader of a file is chosen.
enum LoaderChoice {
    /// The loader of a fixed file description.
    Given(SelectedLoader),
    /// Loaders registered for exactly this file type.
    Extension(String),
    /// Loaders matching the end of the file name.
    Lookup,
}

/// State threaded through a load and its `extends` chain.
#[derive(Clone)]
struct Loading {
    already_loaded: Vec<PathBuf>,
    intermediate: Found,
    disable_cache: bool,
    is_final: bool,
}

impl Default for Loading {
    fn default() -> Self {
        Self {
            already_loaded: Vec::new(),
            intermediate: None,
            disable_cache: false,
            is_final: true,
        }
    }
}

/// Searches, loads, validates and merges the configuration of one
/// application.
pub struct Confinode {
    name: String,
    description: Description,
    cache: bool,
    search_stop: Option<PathBuf>,
    current_dir: PathBuf,
    module_paths: Vec<PathBuf>,
    files: Vec<FileDescription>,
    logger: Logger,
    resolver: Arc<dyn ModuleResolver>,
    registry: LoaderRegistry,
    folder_cache: Cache<Vec<String>>,
    content_cache: Cache<Option<Value>>,
    result_cache: Cache<CachedResult>,
}

impl Confinode {
    pub fn new(name: impl Into<String>, description: Description, options: ConfinodeOptions) -> Self {
        let name = name.into();
        let current_dir = options
            .current_dir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut module_paths = vec![current_dir.clone()];
        module_paths.extend(
            options
                .module_paths
                .iter()
                .map(|path| absolute_path(&current_dir, path)),
        );
        let logger = match options.logger {
            Some(logger) if logger.has_name() => logger,
            Some(logger) => logger.with_name(name.clone()),
            None => Logger::new().with_name(name.clone()),
        };

        Self {
            files: options.files.resolve(&name),
            search_stop: options
                .search_stop
                .map(|stop| absolute_path(&current_dir, &stop)),
            registry: LoaderRegistry::new(options.custom_loaders),
            cache: options.cache,
            resolver: options.resolver,
            name,
            description,
            current_dir,
            module_paths,
            logger,
            folder_cache: Cache::new(FOLDER_CACHE_AGE, FOLDER_CACHE_SIZE),
            content_cache: Cache::new(CONTENT_CACHE_AGE, CONTENT_CACHE_SIZE),
            result_cache: Cache::new(RESULT_CACHE_AGE, RESULT_CACHE_SIZE),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clear_cache(&self) {
        self.folder_cache.clear();
        self.content_cache.clear();
        self.result_cache.clear();
    }

    /// Search the configuration from `start` (the current folder by default)
    /// upward. Errors are logged and yield `None`.
    pub async fn search(&self, start: Option<&Path>) -> Found {
        self.search_config(&AsyncDriver, start).await
    }

    /// Blocking variant of [`Confinode::search`]. Loaders without a
    /// synchronous capability are skipped.
    pub fn search_sync(&self, start: Option<&Path>) -> Found {
        futures::executor::block_on(self.search_config(&SyncDriver, start))
    }

    /// Load the configuration file `name`: an absolute path, a path relative
    /// to the current folder, or a name resolved from the module paths.
    /// Errors are logged and yield `None`.
    pub async fn load(&self, name: &str) -> Found {
        self.load_top(&AsyncDriver, name).await
    }

    /// Blocking variant of [`Confinode::load`].
    pub fn load_sync(&self, name: &str) -> Found {
        futures::executor::block_on(self.load_top(&SyncDriver, name))
    }

    fn log(&self, level: Level, content: MessageContent) {
        self.logger.log(&Message::new(level, content));
    }

    fn fail(&self, error: ConfinodeError) {
        self.logger.log(&Message::failure(error));
    }

    async fn search_config(&self, driver: &dyn Driver, start: Option<&Path>) -> Found {
        let start = match start {
            Some(start) => absolute_path(&self.current_dir, start),
            None => self.current_dir.clone(),
        };
        let folder = match is_folder(driver, &start).await {
            Ok(true) => start,
            Ok(false) => parent_folder(&start).map_or(start.clone(), Path::to_path_buf),
            Err(error) => {
                self.fail(error);
                return None;
            }
        };
        self.search_from(driver, folder).await
    }

    /// Walk up from `folder`. Every folder visited without a cached outcome
    /// caches the final outcome.
    async fn search_from(&self, driver: &dyn Driver, mut folder: PathBuf) -> Found {
        let mut visited = Vec::new();
        let mut ignore_absolute = false;
        let found = loop {
            self.log(Level::Trace, MessageContent::SearchInFolder(folder.clone()));
            if let Some(cached) = self.result_cache.get(&folder) {
                self.log(Level::Trace, MessageContent::LoadedFromCache);
                break cached.result;
            }
            visited.push(folder.clone());

            match self.search_in_folder(driver, &folder, ignore_absolute).await {
                Ok(Some(found)) => break Some(found),
                Ok(None) => {}
                Err(error) => {
                    self.fail(error);
                    break None;
                }
            }
            if self.search_stop.as_deref() == Some(folder.as_path()) {
                break None;
            }
            match parent_folder(&folder) {
                Some(parent) => folder = parent.to_path_buf(),
                None => break None,
            }
            ignore_absolute = true;
        };

        if self.cache {
            for folder in visited {
                let cached = CachedResult {
                    result: found.clone(),
                    is_final: true,
                };
                self.result_cache.set(folder, cached);
            }
        }
        found
    }

    async fn search_in_folder(
        &self,
        driver: &dyn Driver,
        folder: &Path,
        ignore_absolute: bool,
    ) -> Result<Found, ConfinodeError> {
        for description in &self.files {
            let Some((file, choice)) = self
                .find_file(driver, folder, description, ignore_absolute)
                .await?
            else {
                continue;
            };
            let found = self
                .load_config_file(driver, file.clone(), choice, Loading::default())
                .await?;
            if found.is_some() {
                self.log(Level::Information, MessageContent::LoadedConfiguration(file));
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Find the file matching `description` in `folder`, with the way to
    /// pick its loader.
    async fn find_file(
        &self,
        driver: &dyn Driver,
        folder: &Path,
        description: &FileDescription,
        ignore_absolute: bool,
    ) -> Result<Option<(PathBuf, LoaderChoice)>, ConfinodeError> {
        let Some(searched) = build_file_name(folder, description.name(), ignore_absolute) else {
            return Ok(None);
        };
        match description {
            FileDescription::Fixed {
                loader,
                loader_name,
                ..
            } => {
                if !file_exists(driver, &searched).await? {
                    return Ok(None);
                }
                let selected = SelectedLoader {
                    loader: loader.clone(),
                    name: loader_name.clone(),
                };
                Ok(Some((searched, LoaderChoice::Given(selected))))
            }
            FileDescription::Basename(_) => {
                let (Some(parent), Some(base)) = (searched.parent(), searched.file_name()) else {
                    return Ok(None);
                };
                let prefix = format!("{}.", base.to_string_lossy());
                let entries = self.folder_entries(driver, parent).await?;
                let mut matches = entries.into_iter().filter_map(|entry| {
                    let extension = entry.strip_prefix(&prefix)?.to_string();
                    self.registry
                        .candidates(
                            &entry,
                            Some(extension.as_str()),
                            &self.module_paths,
                            self.resolver.as_ref(),
                            driver.is_sync(),
                        )
                        .next()
                        .map(|_| (parent.join(&entry), LoaderChoice::Extension(extension)))
                });
                let first = matches.next();
                if first.is_some() && matches.next().is_some() {
                    self.log(Level::Warning, MessageContent::MultipleFiles(searched.clone()));
                }
                Ok(first)
            }
        }
    }

    async fn folder_entries(&self, driver: &dyn Driver, folder: &Path) -> Result<Vec<String>, ConfinodeError> {
        if let Some(entries) = self.folder_cache.get(folder) {
            return Ok(entries);
        }
        let entries = folder_content(driver, folder).await?;
        if self.cache {
            self.folder_cache.set(folder, entries.clone());
        }
        Ok(entries)
    }

    async fn load_top(&self, driver: &dyn Driver, name: &str) -> Found {
        let folder = self.current_dir.clone();
        match self.load_config(driver, name.to_string(), folder, None).await {
            Ok(found) => found,
            Err(error) => {
                self.fail(error);
                None
            }
        }
    }

    /// Resolve `name` from `folder` and load it. Top-level loads (without
    /// `loading`) resolve from the module paths only.
    fn load_config<'a>(
        &'a self,
        driver: &'a dyn Driver,
        name: String,
        folder: PathBuf,
        loading: Option<Loading>,
    ) -> BoxFuture<'a, Result<Found, ConfinodeError>> {
        async move {
            let paths = match loading {
                Some(_) => std::iter::once(folder)
                    .chain(self.module_paths.iter().cloned())
                    .collect(),
                None => self.module_paths.clone(),
            };
            let Some(file) = self.resolver.resolve(&name, &paths) else {
                return Err(ConfinodeError::FileNotFound(name));
            };
            if !file_exists(driver, &file).await? {
                return Err(ConfinodeError::FileNotFound(name));
            }
            self.load_config_file(driver, file, LoaderChoice::Lookup, loading.unwrap_or_default())
                .await
        }
        .boxed()
    }

    fn load_config_file<'a>(
        &'a self,
        driver: &'a dyn Driver,
        file: PathBuf,
        choice: LoaderChoice,
        loading: Loading,
    ) -> BoxFuture<'a, Result<Found, ConfinodeError>> {
        async move {
            self.log(Level::Trace, MessageContent::LoadingFile(file.clone()));
            if !loading.disable_cache
                && let Some(cached) = self.result_cache.get(&file)
                && cached.is_final == loading.is_final
            {
                self.log(Level::Trace, MessageContent::LoadedFromCache);
                return Ok(cached.result);
            }

            if loading.already_loaded.contains(&file) {
                let mut chain = loading.already_loaded.clone();
                chain.push(file);
                return Err(ConfinodeError::Recursion(chain));
            }

            let content = self.read_content(driver, &file, choice, &loading).await?;
            let found = match content {
                None => {
                    self.log(Level::Trace, MessageContent::EmptyConfiguration);
                    loading.intermediate.clone()
                }
                Some(content) => self.parse_content(driver, &file, &loading, content).await?,
            };

            if self.cache && !loading.disable_cache {
                let cached = CachedResult {
                    result: found.clone(),
                    is_final: loading.is_final,
                };
                self.result_cache.set(file, cached);
            }
            Ok(found)
        }
        .boxed()
    }

    /// Read the raw content of `file`, falling back to the next loader when
    /// one fails.
    async fn read_content(
        &self,
        driver: &dyn Driver,
        file: &Path,
        choice: LoaderChoice,
        loading: &Loading,
    ) -> Result<Option<Value>, ConfinodeError> {
        let mut module_paths = self.module_paths.clone();
        for folder in loading.already_loaded.iter().filter_map(|loaded| loaded.parent()) {
            if !module_paths.iter().any(|path| path == folder) {
                module_paths.push(folder.to_path_buf());
            }
        }
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (given, extension) = match choice {
            LoaderChoice::Given(selected) => (Some(selected), None),
            LoaderChoice::Extension(extension) => (None, Some(Some(extension))),
            LoaderChoice::Lookup => (None, Some(None)),
        };
        let lookup = extension.map(|extension| {
            self.registry.candidates(
                &file_name,
                extension.as_deref(),
                &module_paths,
                self.resolver.as_ref(),
                driver.is_sync(),
            )
        });
        let mut candidates = given.into_iter().chain(lookup.into_iter().flatten());

        let Some(mut current) = candidates.next() else {
            return Err(ConfinodeError::NoLoaderFound(file.to_path_buf()));
        };
        if let Some(name) = &current.name {
            self.log(Level::Trace, MessageContent::UsingLoader(name.clone()));
        }
        if let Some(content) = self.content_cache.get(file) {
            return Ok(content);
        }

        let mut failures: Vec<(Option<String>, ConfinodeError)> = Vec::new();
        let content = loop {
            match load_file(driver, file, current.clone()).await {
                Ok(content) => break content,
                Err(error) => failures.push((current.name.clone(), error)),
            }
            match candidates.next() {
                Some(next) => {
                    if let Some(name) = &next.name {
                        self.log(Level::Trace, MessageContent::UsingLoader(name.clone()));
                    }
                    current = next;
                }
                None => return Err(aggregate_failures(failures)),
            }
        };

        if self.cache {
            self.content_cache.set(file, content.clone());
        }
        Ok(content)
    }

    async fn parse_content(
        &self,
        driver: &dyn Driver,
        file: &Path,
        loading: &Loading,
        mut content: Value,
    ) -> Result<Found, ConfinodeError> {
        let folder = file.parent().unwrap_or(file).to_path_buf();
        let mut already_loaded = loading.already_loaded.clone();
        already_loaded.push(file.to_path_buf());

        if let Value::String(indirection) = &content {
            let indirection = indirection.clone();
            let nested = Loading {
                already_loaded,
                ..loading.clone()
            };
            return self.load_config(driver, indirection, folder, Some(nested)).await;
        }

        let mut found = loading.intermediate.clone();
        let mut files = ResultFile::new(file);
        if let Some(parents) = take_extends(&mut content)? {
            let mut disable_cache = loading.disable_cache;
            for parent in parents {
                let nested = Loading {
                    already_loaded: already_loaded.clone(),
                    intermediate: found,
                    disable_cache,
                    is_final: false,
                };
                found = self
                    .load_config(driver, parent, folder.clone(), Some(nested))
                    .await?;
                if let Some(loaded) = &found {
                    files.push_extends(loaded.files().clone());
                }
                // Siblings depend on the results of the previous ones
                disable_cache = true;
            }
        }

        let context = ParserContext::new(file)
            .with_parent(found.as_ref().map(|loaded| loaded.result().clone()))
            .with_final(loading.is_final);
        let tree = self.description.parse(Some(&content), &context)?;
        Ok(tree.map(|tree| Arc::new(ConfigurationResult::new(tree, files))))
    }
}

/// Join a file description name to the folder. Absolute names are only
/// used in the starting folder.
fn build_file_name(folder: &Path, name: &str, ignore_absolute: bool) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        (!ignore_absolute).then(|| path.to_path_buf())
    } else {
        Some(folder.join(path))
    }
}

/// Remove the `extends` entry of an object content and return the files it
/// names.
fn take_extends(content: &mut Value) -> Result<Option<Vec<String>>, ConfinodeError> {
    let Value::Object(fields) = content else {
        return Ok(None);
    };
    match fields.shift_remove("extends") {
        None => Ok(None),
        Some(Value::String(parent)) => Ok(Some(vec![parent])),
        Some(Value::Array(parents)) => parents
            .into_iter()
            .map(|parent| match parent {
                Value::String(parent) => Ok(parent),
                _ => Err(ConfinodeError::BadExtends),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(ConfinodeError::BadExtends),
    }
}

/// A single failing loader reports its own error; several report together.
fn aggregate_failures(mut failures: Vec<(Option<String>, ConfinodeError)>) -> ConfinodeError {
    if failures.len() == 1
        && let Some((_, error)) = failures.pop()
    {
        return error;
    }
    ConfinodeError::AllLoadersFailed(
        failures
            .into_iter()
            .map(|(loader, error)| {
                let message = match error {
                    ConfinodeError::Loading(source) => format!("{source:#}"),
                    other => other.to_string(),
                };
                (loader, message)
            })
            .collect(),
    )
}
