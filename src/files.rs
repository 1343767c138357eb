//! Descriptions of the files searched in each folder.

use crate::loader::{FormatLoader, Loader, PackageEntryLoader};
use std::fmt;
use std::sync::Arc;

/// A configuration file searched in a folder.
#[derive(Clone)]
pub enum FileDescription {
    /// A name without extension, matched with every registered file type
    /// (`.myapprc` matches `.myapprc.json`, `.myapprc.yaml`...).
    Basename(String),
    /// A full file name read with a dedicated loader.
    Fixed {
        name: String,
        loader: Arc<dyn Loader>,
        loader_name: Option<String>,
    },
}

impl FileDescription {
    pub fn basename(name: impl Into<String>) -> Self {
        Self::Basename(name.into())
    }

    pub fn fixed(name: impl Into<String>, loader: Arc<dyn Loader>) -> Self {
        Self::Fixed {
            name: name.into(),
            loader,
            loader_name: None,
        }
    }

    /// Name used in messages for the loader of a fixed file.
    pub fn with_loader_name(self, loader_name: impl Into<String>) -> Self {
        match self {
            Self::Fixed { name, loader, .. } => Self::Fixed {
                name,
                loader,
                loader_name: Some(loader_name.into()),
            },
            basename => basename,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Basename(name) => name,
            Self::Fixed { name, .. } => name,
        }
    }

    pub fn is_basename(&self) -> bool {
        matches!(self, Self::Basename(_))
    }
}

impl fmt::Debug for FileDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basename(name) => f.debug_tuple("Basename").field(name).finish(),
            Self::Fixed {
                name, loader_name, ..
            } => f
                .debug_struct("Fixed")
                .field("name", name)
                .field("loader_name", loader_name)
                .finish(),
        }
    }
}

/// Transformation applied to the default file list.
pub type FilesFilter = Arc<dyn Fn(Vec<FileDescription>) -> Vec<FileDescription> + Send + Sync>;

/// Files searched by default for application `name`, in order:
/// the `name` entry of `package.json`, `.{name}rc` as YAML, then
/// `.{name}rc.*`, `{name}.config.*` and `.{name}/{name}.config.*`.
pub fn default_files(name: &str) -> Vec<FileDescription> {
    vec![
        FileDescription::fixed("package.json", Arc::new(PackageEntryLoader::new(name)))
            .with_loader_name("package.json"),
        FileDescription::fixed(format!(".{name}rc"), Arc::new(FormatLoader::yaml()))
            .with_loader_name("yaml"),
        FileDescription::basename(format!(".{name}rc")),
        FileDescription::basename(format!("{name}.config")),
        FileDescription::basename(format!(".{name}/{name}.config")),
    ]
}

/// Filter removing `package.json` from the searched files.
pub fn no_package_json() -> FilesFilter {
    Arc::new(|files: Vec<FileDescription>| -> Vec<FileDescription> {
        files
            .into_iter()
            .filter(|file| file.is_basename() || file.name() != "package.json")
            .collect()
    })
}
