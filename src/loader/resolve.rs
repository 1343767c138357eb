//! Resolution of file and module names to absolute paths.

use crate::paths::{absolute_path, normalize_path};
use std::path::{Path, PathBuf};

/// Resolves a request (file path or module name) against search paths.
pub trait ModuleResolver: Send + Sync {
    fn resolve(&self, request: &str, paths: &[PathBuf]) -> Option<PathBuf>;
}

/// Filesystem resolution:
/// - absolute requests are normalized as is;
/// - `./` and `../` requests are relative to the first search path;
/// - other requests are looked up in each search path, in order, and the
///   first existing match wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl ModuleResolver for PathResolver {
    fn resolve(&self, request: &str, paths: &[PathBuf]) -> Option<PathBuf> {
        let path = Path::new(request);
        if path.is_absolute() {
            return Some(normalize_path(path));
        }
        if is_explicitly_relative(request) {
            return paths.first().map(|base| absolute_path(base, path));
        }
        paths
            .iter()
            .map(|base| absolute_path(base, path))
            .find(|candidate| candidate.exists())
    }
}

fn is_explicitly_relative(request: &str) -> bool {
    request == "."
        || request == ".."
        || ["./", "../", ".\\", "..\\"]
            .iter()
            .any(|prefix| request.starts_with(prefix))
}
