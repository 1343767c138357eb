//! Loaders turning configuration files into raw JSON values, and the
//! registry selecting them by file type.

mod builtin;
mod registry;
mod resolve;

pub use builtin::{FormatLoader, PackageEntryLoader, builtin_entries};
pub use registry::{LoaderCandidates, LoaderConstructor, LoaderEntry, LoaderRegistry, SelectedLoader};
pub use resolve::{ModuleResolver, PathResolver};

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Loads the content of a configuration file.
///
/// `Ok(None)` means the file is present but holds no configuration.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, path: &Path) -> anyhow::Result<Option<Value>>;

    /// Blocking counterpart, if the loader supports synchronous loading.
    fn as_sync(&self) -> Option<&dyn SyncLoader> {
        None
    }
}

/// Synchronous loading capability.
pub trait SyncLoader: Send + Sync {
    fn load_sync(&self, path: &Path) -> anyhow::Result<Option<Value>>;
}
