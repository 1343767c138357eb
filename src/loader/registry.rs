//! Loader registration and lazy, memoized selection by file type.

use super::{Loader, ModuleResolver, builtin_entries};
use crate::error::ConfinodeError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Builds a loader, given the resolved path of its required module.
pub type LoaderConstructor = Arc<dyn Fn(Option<&Path>) -> Arc<dyn Loader> + Send + Sync>;

/// A loader registration: the file types it handles, an optional module it
/// depends on, and how to build it.
#[derive(Clone)]
pub struct LoaderEntry {
    name: String,
    filetypes: Vec<String>,
    module: Option<String>,
    constructor: LoaderConstructor,
}

impl LoaderEntry {
    /// Create an entry. File types are extensions without the leading dot,
    /// possibly compound (`config.json`). An empty file type is rejected.
    pub fn new<I, S>(
        name: impl Into<String>,
        filetypes: I,
        constructor: impl Fn(Option<&Path>) -> Arc<dyn Loader> + Send + Sync + 'static,
    ) -> Result<Self, ConfinodeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let filetypes: Vec<String> = filetypes
            .into_iter()
            .map(|filetype| filetype.into().trim_start_matches('.').to_string())
            .collect();
        if filetypes.is_empty() || filetypes.iter().any(String::is_empty) {
            return Err(ConfinodeError::EmptyFileType(name));
        }
        Ok(Self {
            name,
            filetypes,
            module: None,
            constructor: Arc::new(constructor),
        })
    }

    /// Create an entry sharing an already built loader.
    pub fn with_loader<I, S>(
        name: impl Into<String>,
        filetypes: I,
        loader: Arc<dyn Loader>,
    ) -> Result<Self, ConfinodeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, filetypes, move |_| loader.clone())
    }

    /// Only use this entry if `module` can be resolved from the module paths.
    pub fn requiring(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub(crate) fn builtin(
        name: &str,
        filetypes: &[&str],
        constructor: impl Fn(Option<&Path>) -> Arc<dyn Loader> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            filetypes: filetypes.iter().map(|filetype| filetype.to_string()).collect(),
            module: None,
            constructor: Arc::new(constructor),
        }
    }
}

/// A loader picked for a file, with the name used in messages.
#[derive(Clone)]
pub struct SelectedLoader {
    pub loader: Arc<dyn Loader>,
    pub name: Option<String>,
}

struct Registered {
    entry: LoaderEntry,
    instance: OnceLock<Arc<dyn Loader>>,
}

/// All known loaders: custom entries first, then the built-in ones.
pub struct LoaderRegistry {
    loaders: Vec<Registered>,
    /// File types, longest first, each with its loaders in registration order.
    types: Vec<(String, Vec<usize>)>,
}

impl LoaderRegistry {
    pub fn new(custom: impl IntoIterator<Item = LoaderEntry>) -> Self {
        let loaders: Vec<Registered> = custom
            .into_iter()
            .chain(builtin_entries())
            .map(|entry| Registered {
                entry,
                instance: OnceLock::new(),
            })
            .collect();

        let mut types: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, registered) in loaders.iter().enumerate() {
            for filetype in &registered.entry.filetypes {
                match types.iter_mut().find(|(known, _)| known == filetype) {
                    Some((_, indices)) => indices.push(index),
                    None => types.push((filetype.clone(), vec![index])),
                }
            }
        }
        types.sort_by(|(left, _), (right, _)| right.len().cmp(&left.len()));

        Self { loaders, types }
    }

    /// Loaders able to read `file_name`, most specific first.
    ///
    /// With an `extension`, only loaders registered for exactly that type
    /// are considered. Loaders are built when the iterator reaches them.
    pub fn candidates<'a>(
        &'a self,
        file_name: &str,
        extension: Option<&str>,
        module_paths: &'a [PathBuf],
        resolver: &'a dyn ModuleResolver,
        sync_only: bool,
    ) -> LoaderCandidates<'a> {
        let mut pending: Vec<usize> = Vec::new();
        let matching = self.types.iter().filter(|(filetype, _)| match extension {
            Some(extension) => filetype == extension,
            None => file_name
                .strip_suffix(filetype.as_str())
                .is_some_and(|stem| stem.ends_with('.')),
        });
        for (_, indices) in matching {
            for index in indices {
                if !pending.contains(index) {
                    pending.push(*index);
                }
            }
        }
        LoaderCandidates {
            registry: self,
            pending: pending.into_iter(),
            module_paths,
            resolver,
            sync_only,
        }
    }

    /// Build the loader of an entry once, unless its module is missing.
    fn instantiate(
        &self,
        registered: &Registered,
        module_paths: &[PathBuf],
        resolver: &dyn ModuleResolver,
    ) -> Option<Arc<dyn Loader>> {
        if let Some(loader) = registered.instance.get() {
            return Some(loader.clone());
        }
        let module_path = match &registered.entry.module {
            Some(module) => Some(resolver.resolve(module, module_paths)?),
            None => None,
        };
        let loader = registered
            .instance
            .get_or_init(|| (registered.entry.constructor)(module_path.as_deref()));
        Some(loader.clone())
    }
}

/// Lazy sequence of usable loaders for one file.
pub struct LoaderCandidates<'a> {
    registry: &'a LoaderRegistry,
    pending: std::vec::IntoIter<usize>,
    module_paths: &'a [PathBuf],
    resolver: &'a dyn ModuleResolver,
    sync_only: bool,
}

impl Iterator for LoaderCandidates<'_> {
    type Item = SelectedLoader;

    fn next(&mut self) -> Option<SelectedLoader> {
        for index in self.pending.by_ref() {
            let registered = &self.registry.loaders[index];
            let Some(loader) =
                self.registry
                    .instantiate(registered, self.module_paths, self.resolver)
            else {
                continue;
            };
            if self.sync_only && loader.as_sync().is_none() {
                continue;
            }
            return Some(SelectedLoader {
                loader,
                name: Some(registered.entry.name.clone()),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::PathResolver;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct AsyncOnly;

    #[async_trait]
    impl Loader for AsyncOnly {
        async fn load(&self, _path: &Path) -> anyhow::Result<Option<Value>> {
            Ok(None)
        }
    }

    fn names(candidates: LoaderCandidates<'_>) -> Vec<String> {
        candidates.filter_map(|selected| selected.name).collect()
    }

    #[test]
    fn test_builtin_selection() {
        let registry = LoaderRegistry::new(Vec::new());
        let paths = vec![PathBuf::from(".")];
        let found = names(registry.candidates("app.yml", None, &paths, &PathResolver, false));
        assert_eq!(found, vec!["yaml"]);
        let found = names(registry.candidates("app.xml", None, &paths, &PathResolver, false));
        assert!(found.is_empty());
        let found = names(registry.candidates(".apprc.json", Some("json"), &paths, &PathResolver, true));
        assert_eq!(found, vec!["json"]);
    }

    #[test]
    fn test_longest_type_first_and_custom_first() {
        let custom = vec![
            LoaderEntry::with_loader("plain", ["json"], Arc::new(AsyncOnly)).unwrap(),
            LoaderEntry::with_loader("compound", ["config.json"], Arc::new(AsyncOnly)).unwrap(),
        ];
        let registry = LoaderRegistry::new(custom);

        let paths = vec![PathBuf::from(".")];
        let found = names(registry.candidates("app.config.json", None, &paths, &PathResolver, false));
        assert_eq!(found, vec!["compound", "plain", "json"]);
        // A compound type does not match a mere suffix
        let found = names(registry.candidates("appconfig.json", None, &paths, &PathResolver, false));
        assert_eq!(found, vec!["plain", "json"]);
    }

    #[test]
    fn test_sync_mode_skips_async_only_loaders() {
        let custom = vec![LoaderEntry::with_loader("async", ["json"], Arc::new(AsyncOnly)).unwrap()];
        let registry = LoaderRegistry::new(custom);
        let paths = vec![PathBuf::from(".")];
        let found = names(registry.candidates("a.json", None, &paths, &PathResolver, true));
        assert_eq!(found, vec!["json"]);
    }

    #[test]
    fn test_entry_with_missing_module_is_skipped() {
        let dir = TempDir::new().unwrap();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let entry = LoaderEntry::new("needs-module", ["json"], move |module| -> Arc<dyn Loader> {
            assert!(module.is_some());
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(AsyncOnly)
        })
        .unwrap()
        .requiring("json5-parser");
        let registry = LoaderRegistry::new([entry]);
        let paths = vec![dir.path().to_path_buf()];

        let found = names(registry.candidates("a.json", None, &paths, &PathResolver, false));
        assert_eq!(found, vec!["json"]);
        assert_eq!(built.load(Ordering::SeqCst), 0);

        std::fs::create_dir(dir.path().join("json5-parser")).unwrap();
        for _ in 0..3 {
            let found = names(registry.candidates("a.json", None, &paths, &PathResolver, false));
            assert_eq!(found, vec!["needs-module", "json"]);
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_candidates_are_lazy() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let entry = LoaderEntry::new("second", ["yaml"], move |_| -> Arc<dyn Loader> {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(AsyncOnly)
        })
        .unwrap();
        let first = LoaderEntry::with_loader("first", ["yaml"], Arc::new(AsyncOnly)).unwrap();
        let registry = LoaderRegistry::new([first, entry]);
        let paths = vec![PathBuf::from(".")];

        let mut candidates = registry.candidates("a.yaml", None, &paths, &PathResolver, false);
        assert_eq!(candidates.next().and_then(|s| s.name).as_deref(), Some("first"));
        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert_eq!(candidates.next().and_then(|s| s.name).as_deref(), Some("second"));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_file_type_is_rejected() {
        let err = LoaderEntry::with_loader("broken", ["json", "."], Arc::new(AsyncOnly))
            .err()
            .unwrap();
        assert!(matches!(err, ConfinodeError::EmptyFileType(ref name) if name == "broken"));
        let none: [&str; 0] = [];
        assert!(LoaderEntry::with_loader("none", none, Arc::new(AsyncOnly)).is_err());
    }
}
