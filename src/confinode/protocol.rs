//! Requests the search and load algorithm suspends on, and the two drivers
//! answering them.
//!
//! The algorithm is written once as async code issuing [`Request`]s. The
//! [`AsyncDriver`] answers them with tokio filesystem calls and async
//! loaders. The [`SyncDriver`] answers them with blocking calls and never
//! pends, so the whole algorithm can be run to completion by a simple
//! executor on the calling thread.

use crate::error::ConfinodeError;
use crate::loader::SelectedLoader;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// An operation only the runtime boundary can perform.
pub enum Request {
    IsFolder(PathBuf),
    /// Whether the path is an existing regular file.
    FileExists(PathBuf),
    /// Entry names of a folder, sorted. Unreadable folders are empty.
    FolderContent(PathBuf),
    LoadConfigFile {
        path: PathBuf,
        loader: SelectedLoader,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Flag(bool),
    Entries(Vec<String>),
    Content(Option<Value>),
}

/// Resolves requests for one `search` or `load` call.
#[async_trait]
pub trait Driver: Send + Sync {
    /// True if requests are answered with blocking calls.
    fn is_sync(&self) -> bool;

    async fn resolve(&self, request: Request) -> Result<Response, ConfinodeError>;
}

pub struct AsyncDriver;

#[async_trait]
impl Driver for AsyncDriver {
    fn is_sync(&self) -> bool {
        false
    }

    async fn resolve(&self, request: Request) -> Result<Response, ConfinodeError> {
        Ok(match request {
            Request::IsFolder(path) => Response::Flag(
                tokio::fs::metadata(&path)
                    .await
                    .is_ok_and(|metadata| metadata.is_dir()),
            ),
            Request::FileExists(path) => Response::Flag(
                tokio::fs::metadata(&path)
                    .await
                    .is_ok_and(|metadata| metadata.is_file()),
            ),
            Request::FolderContent(path) => {
                let mut names = Vec::new();
                if let Ok(mut entries) = tokio::fs::read_dir(&path).await {
                    while let Ok(Some(entry)) = entries.next_entry().await {
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                names.sort();
                Response::Entries(names)
            }
            Request::LoadConfigFile { path, loader } => {
                Response::Content(loader.loader.load(&path).await?)
            }
        })
    }
}

pub struct SyncDriver;

#[async_trait]
impl Driver for SyncDriver {
    fn is_sync(&self) -> bool {
        true
    }

    async fn resolve(&self, request: Request) -> Result<Response, ConfinodeError> {
        Ok(match request {
            Request::IsFolder(path) => Response::Flag(path.is_dir()),
            Request::FileExists(path) => Response::Flag(path.is_file()),
            Request::FolderContent(path) => {
                let mut names: Vec<String> = std::fs::read_dir(&path)
                    .map(|entries| {
                        entries
                            .filter_map(Result::ok)
                            .map(|entry| entry.file_name().to_string_lossy().into_owned())
                            .collect()
                    })
                    .unwrap_or_default();
                names.sort();
                Response::Entries(names)
            }
            Request::LoadConfigFile { path, loader } => match loader.loader.as_sync() {
                Some(sync) => Response::Content(sync.load_sync(&path)?),
                None => return Err(ConfinodeError::NoLoaderFound(path)),
            },
        })
    }
}

fn unexpected(response: Response) -> ConfinodeError {
    ConfinodeError::Internal(format!("unexpected driver response {response:?}"))
}

pub(crate) async fn is_folder(driver: &dyn Driver, path: &Path) -> Result<bool, ConfinodeError> {
    match driver.resolve(Request::IsFolder(path.to_path_buf())).await? {
        Response::Flag(flag) => Ok(flag),
        other => Err(unexpected(other)),
    }
}

pub(crate) async fn file_exists(driver: &dyn Driver, path: &Path) -> Result<bool, ConfinodeError> {
    match driver.resolve(Request::FileExists(path.to_path_buf())).await? {
        Response::Flag(flag) => Ok(flag),
        other => Err(unexpected(other)),
    }
}

pub(crate) async fn folder_content(
    driver: &dyn Driver,
    path: &Path,
) -> Result<Vec<String>, ConfinodeError> {
    match driver.resolve(Request::FolderContent(path.to_path_buf())).await? {
        Response::Entries(entries) => Ok(entries),
        other => Err(unexpected(other)),
    }
}

pub(crate) async fn load_file(
    driver: &dyn Driver,
    path: &Path,
    loader: SelectedLoader,
) -> Result<Option<Value>, ConfinodeError> {
    let request = Request::LoadConfigFile {
        path: path.to_path_buf(),
        loader,
    };
    match driver.resolve(request).await? {
        Response::Content(content) => Ok(content),
        other => Err(unexpected(other)),
    }
}
