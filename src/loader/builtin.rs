//! Built-in JSON, JSON5, YAML, TOML and INI loaders.

use super::{Loader, LoaderEntry, SyncLoader};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

type ParseFn = fn(&str) -> anyhow::Result<Value>;

/// Loader for a text format parsed into a JSON value. Blank files and
/// files holding only `null` are empty.
pub struct FormatLoader {
    parse: ParseFn,
}

impl FormatLoader {
    pub fn json() -> Self {
        Self {
            parse: |text| serde_json::from_str(text).context("invalid JSON"),
        }
    }

    pub fn yaml() -> Self {
        Self {
            parse: |text| serde_yaml::from_str(text).context("invalid YAML"),
        }
    }

    pub fn toml() -> Self {
        Self {
            parse: |text| toml::from_str(text).context("invalid TOML"),
        }
    }

    pub fn json5() -> Self {
        Self {
            parse: |text| json5::from_str(text).context("invalid JSON5"),
        }
    }

    /// INI files. Dotted section names nest (`[a.b]` is `{"a": {"b": ...}}`),
    /// `true`, `false` and `null` values are converted, and `key[]` entries
    /// accumulate into an array.
    pub fn ini() -> Self {
        Self { parse: parse_ini }
    }

    fn parse_text(&self, text: &str, path: &Path) -> anyhow::Result<Option<Value>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let value = (self.parse)(text).with_context(|| format!("in {}", path.display()))?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[async_trait]
impl Loader for FormatLoader {
    async fn load(&self, path: &Path) -> anyhow::Result<Option<Value>> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        self.parse_text(&text, path)
    }

    fn as_sync(&self) -> Option<&dyn SyncLoader> {
        Some(self)
    }
}

impl SyncLoader for FormatLoader {
    fn load_sync(&self, path: &Path) -> anyhow::Result<Option<Value>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        self.parse_text(&text, path)
    }
}

fn parse_ini(text: &str) -> anyhow::Result<Value> {
    let ini = ini::Ini::load_from_str(text).context("invalid INI")?;
    let mut root = Map::new();
    for (section, properties) in ini.iter() {
        let mut target = &mut root;
        for part in section.into_iter().flat_map(|name| name.split('.')) {
            let entry = target
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(nested) = entry else {
                anyhow::bail!("section [{}] conflicts with key {part}", section.unwrap_or_default());
            };
            target = nested;
        }
        for (key, value) in properties.iter() {
            let value = ini_value(value);
            match key.strip_suffix("[]") {
                Some(key) => match target
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()))
                {
                    Value::Array(items) => items.push(value),
                    other => *other = Value::Array(vec![value]),
                },
                None => {
                    target.insert(key.to_string(), value);
                }
            }
        }
    }
    Ok(Value::Object(root))
}

fn ini_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => Value::String(raw.to_string()),
    }
}

/// Reads one top-level entry of a JSON file, such as the application's
/// section of a `package.json`.
pub struct PackageEntryLoader {
    entry: String,
    json: FormatLoader,
}

impl PackageEntryLoader {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            json: FormatLoader::json(),
        }
    }

    fn extract(&self, content: Option<Value>) -> Option<Value> {
        match content {
            Some(Value::Object(mut fields)) => fields.remove(&self.entry),
            _ => None,
        }
    }
}

#[async_trait]
impl Loader for PackageEntryLoader {
    async fn load(&self, path: &Path) -> anyhow::Result<Option<Value>> {
        Ok(self.extract(self.json.load(path).await?))
    }

    fn as_sync(&self) -> Option<&dyn SyncLoader> {
        Some(self)
    }
}

impl SyncLoader for PackageEntryLoader {
    fn load_sync(&self, path: &Path) -> anyhow::Result<Option<Value>> {
        Ok(self.extract(self.json.load_sync(path)?))
    }
}

/// Entries for the formats supported out of the box.
pub fn builtin_entries() -> Vec<LoaderEntry> {
    let formats: [(&str, &[&str], fn() -> FormatLoader); 5] = [
        ("json", &["json"], FormatLoader::json),
        ("json5", &["json5"], FormatLoader::json5),
        ("yaml", &["yml", "yaml"], FormatLoader::yaml),
        ("toml", &["toml"], FormatLoader::toml),
        ("ini", &["ini"], FormatLoader::ini),
    ];
    formats
        .into_iter()
        .map(|(name, filetypes, build)| {
            LoaderEntry::builtin(name, filetypes, move |_| -> Arc<dyn Loader> {
                Arc::new(build())
            })
        })
        .collect()
}
