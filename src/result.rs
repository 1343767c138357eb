//! Provenance-carrying parse results.
//!
//! A [`ConfigResult`] is either a concrete value with the file it came from,
//! or a composite whose children are themselves results. Composite
//! accessors recurse through the children on demand, so merging a parent
//! into a child shares the parent's nodes instead of copying them.

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Children of a composite result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultChildren {
    Array(Vec<Arc<ConfigResult>>),
    Object(IndexMap<String, Arc<ConfigResult>>),
}

/// Outcome of parsing one schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A concrete value. No file name means the value is a default.
    Direct {
        value: Value,
        file_name: Option<PathBuf>,
    },
    Parent(ResultChildren),
}

/// Origin of every value, shaped like the configuration itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Provenance {
    File(Option<PathBuf>),
    Array(Vec<Provenance>),
    Object(IndexMap<String, Provenance>),
}

impl Provenance {
    /// File name of a leaf provenance.
    pub fn file(&self) -> Option<&Path> {
        match self {
            Provenance::File(file) => file.as_deref(),
            _ => None,
        }
    }
}

impl ConfigResult {
    pub fn direct(value: Value, file_name: Option<&Path>) -> Self {
        Self::Direct {
            value,
            file_name: file_name.map(Path::to_path_buf),
        }
    }

    pub fn array(children: Vec<Arc<ConfigResult>>) -> Self {
        Self::Parent(ResultChildren::Array(children))
    }

    pub fn object(children: IndexMap<String, Arc<ConfigResult>>) -> Self {
        Self::Parent(ResultChildren::Object(children))
    }

    /// The configuration value, assembled recursively from the children.
    pub fn configuration(&self) -> Value {
        match self {
            ConfigResult::Direct { value, .. } => value.clone(),
            ConfigResult::Parent(ResultChildren::Array(children)) => {
                Value::Array(children.iter().map(|child| child.configuration()).collect())
            }
            ConfigResult::Parent(ResultChildren::Object(children)) => Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.configuration()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    /// The provenance of the configuration, with the same branching shape.
    pub fn file_name(&self) -> Provenance {
        match self {
            ConfigResult::Direct { file_name, .. } => Provenance::File(file_name.clone()),
            ConfigResult::Parent(ResultChildren::Array(children)) => {
                Provenance::Array(children.iter().map(|child| child.file_name()).collect())
            }
            ConfigResult::Parent(ResultChildren::Object(children)) => Provenance::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.file_name()))
                    .collect(),
            ),
        }
    }

    /// Elements of an array result.
    ///
    /// A direct array value is split into one direct result per element,
    /// each keeping the file name of the whole value.
    pub fn elements(&self) -> Option<Vec<Arc<ConfigResult>>> {
        match self {
            ConfigResult::Parent(ResultChildren::Array(children)) => Some(children.clone()),
            ConfigResult::Direct {
                value: Value::Array(items),
                file_name,
            } => Some(
                items
                    .iter()
                    .map(|item| Arc::new(ConfigResult::direct(item.clone(), file_name.as_deref())))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Entries of an object result. Direct object values are split like
    /// [`ConfigResult::elements`] does for arrays.
    pub fn entries(&self) -> Option<IndexMap<String, Arc<ConfigResult>>> {
        match self {
            ConfigResult::Parent(ResultChildren::Object(children)) => Some(children.clone()),
            ConfigResult::Direct {
                value: Value::Object(fields),
                file_name,
            } => Some(
                fields
                    .iter()
                    .map(|(key, value)| {
                        (
                            key.clone(),
                            Arc::new(ConfigResult::direct(value.clone(), file_name.as_deref())),
                        )
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Project through one object level.
    pub fn get(&self, key: &str) -> Option<Arc<ConfigResult>> {
        match self {
            ConfigResult::Parent(ResultChildren::Object(children)) => children.get(key).cloned(),
            ConfigResult::Direct {
                value: Value::Object(fields),
                file_name,
            } => fields
                .get(key)
                .map(|value| Arc::new(ConfigResult::direct(value.clone(), file_name.as_deref()))),
            _ => None,
        }
    }

    /// Project through one array level.
    pub fn index(&self, index: usize) -> Option<Arc<ConfigResult>> {
        match self {
            ConfigResult::Parent(ResultChildren::Array(children)) => children.get(index).cloned(),
            ConfigResult::Direct {
                value: Value::Array(items),
                file_name,
            } => items
                .get(index)
                .map(|value| Arc::new(ConfigResult::direct(value.clone(), file_name.as_deref()))),
            _ => None,
        }
    }
}

/// Files a configuration was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultFile {
    pub name: PathBuf,
    pub extends: Vec<ResultFile>,
}

impl ResultFile {
    pub fn new(name: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            extends: Vec::new(),
        }
    }

    /// Record an extended file unless a record with the same name exists.
    pub fn push_extends(&mut self, file: ResultFile) {
        if !self.extends.iter().any(|existing| existing.name == file.name) {
            self.extends.push(file);
        }
    }
}

/// The result of a search or a load: the merged tree and its file record.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationResult {
    result: Arc<ConfigResult>,
    files: ResultFile,
}

impl ConfigurationResult {
    pub fn new(result: Arc<ConfigResult>, files: ResultFile) -> Self {
        Self { result, files }
    }

    pub fn result(&self) -> &Arc<ConfigResult> {
        &self.result
    }

    pub fn files(&self) -> &ResultFile {
        &self.files
    }

    pub fn configuration(&self) -> Value {
        self.result.configuration()
    }

    pub fn file_name(&self) -> Provenance {
        self.result.file_name()
    }

    /// Deserialize the configuration into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.configuration())
    }
}
