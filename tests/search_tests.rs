//! Integration tests for the upward configuration search.
//!
//! Each test builds a small folder tree in a temporary directory, used as
//! both the current folder and the search stop, so nothing outside of it
//! is ever read.

use async_trait::async_trait;
use confinode::description::{array, boolean_item, default_value, literal, number_item, string_item};
use confinode::files::{FileDescription, no_package_json};
use confinode::loader::{FormatLoader, Loader, LoaderEntry};
use confinode::{
    Confinode, ConfinodeOptions, Description, Logger, Message, MessageContent, ResultFile,
};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a fresh temporary directory for each test.
fn setup_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create folder");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

fn app_description() -> Description {
    literal([
        ("name", string_item(Some("anonymous"))),
        ("port", number_item(Some(8080.0))),
        ("debug", boolean_item(false)),
        ("plugins", default_value(array(string_item(None)), json!([]))),
    ])
}

/// Logger keeping every message for later inspection.
fn collecting_logger() -> (Logger, Arc<Mutex<Vec<Message>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    let logger = Logger::new().with_sink(move |message: &Message| {
        sink.lock().expect("poisoned").push(message.clone());
    });
    (logger, messages)
}

fn ids(messages: &Arc<Mutex<Vec<Message>>>) -> Vec<&'static str> {
    messages.lock().expect("poisoned").iter().map(Message::id).collect()
}

fn options(dir: &Path, logger: Logger) -> ConfinodeOptions {
    ConfinodeOptions::default()
        .with_current_dir(dir)
        .with_search_stop(dir)
        .with_logger(logger)
}

/// Loader counting its invocations.
struct CountingLoader {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Loader for CountingLoader {
    async fn load(&self, _path: &Path) -> anyhow::Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(json!({"name": "counted"})))
    }
}

/// Loader reading JSON and recording every file it reads.
struct RecordingLoader {
    read: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl Loader for RecordingLoader {
    async fn load(&self, path: &Path) -> anyhow::Result<Option<Value>> {
        self.read.lock().expect("poisoned").push(path.to_path_buf());
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}

/// Loader always failing.
struct BrokenLoader;

#[async_trait]
impl Loader for BrokenLoader {
    async fn load(&self, _path: &Path) -> anyhow::Result<Option<Value>> {
        anyhow::bail!("broken on purpose")
    }
}

// ---------------------------------------------------------------------------
// Search walk
// ---------------------------------------------------------------------------

mod walk_tests {
    use super::*;

    #[tokio::test]
    async fn finds_configuration_in_ancestor_folder() {
        let dir = setup_dir();
        let root = dir.path();
        let file = write(root, ".myapprc.json", r#"{"name": "root", "port": 3000}"#);
        let start = root.join("sub/deeper");
        fs::create_dir_all(&start).unwrap();
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), options(root, logger));
        let found = confinode
            .search(Some(start.as_path()))
            .await
            .expect("configuration should be found");

        assert_eq!(
            found.configuration(),
            json!({"name": "root", "port": 3000, "debug": false, "plugins": []})
        );
        let name = found.result().get("name").unwrap();
        assert_eq!(name.file_name().file(), Some(file.as_path()));
        // Defaults have no file
        let debug = found.result().get("debug").unwrap();
        assert_eq!(debug.file_name().file(), None);
        assert_eq!(found.files(), &ResultFile::new(&file));

        let ids = ids(&messages);
        assert_eq!(ids.iter().filter(|id| **id == "searchInFolder").count(), 3);
        assert!(ids.contains(&"loadedConfiguration"));
    }

    #[tokio::test]
    async fn starting_from_a_file_searches_its_folder() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, "myapp.config.yaml", "name: yaml");
        let start = write(root, "src/main.txt", "");

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(Some(start.as_path())).await.expect("found");
        assert_eq!(found.configuration()["name"], "yaml");
    }

    #[tokio::test]
    async fn search_stops_at_the_stop_folder() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"name": "above"}"#);
        let stop = root.join("project");
        let start = stop.join("src");
        fs::create_dir_all(&start).unwrap();

        let options = ConfinodeOptions::default()
            .with_current_dir(root)
            .with_search_stop(&stop);
        let confinode = Confinode::new("myapp", app_description(), options);
        assert!(confinode.search(Some(start.as_path())).await.is_none());
    }

    #[tokio::test]
    async fn empty_file_lets_the_search_continue() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"name": "root"}"#);
        write(root, "sub/.myapprc.yaml", "  \n");
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), options(root, logger));
        let found = confinode.search(Some(root.join("sub").as_path())).await.expect("found");

        assert_eq!(found.configuration()["name"], "root");
        assert!(ids(&messages).contains(&"emptyConfiguration"));
    }

    #[tokio::test]
    async fn several_matching_files_warn_and_use_the_first() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"name": "json"}"#);
        write(root, ".myapprc.yaml", "name: yaml");
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), options(root, logger));
        let found = confinode.search(None).await.expect("found");

        assert_eq!(found.configuration()["name"], "json");
        assert!(ids(&messages).contains(&"multipleFiles"));
    }

    #[tokio::test]
    async fn extensionless_rc_file_is_yaml() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc", "port: 4000\nplugins: [lint]");

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["port"], 4000);
        assert_eq!(found.configuration()["plugins"], json!(["lint"]));
    }

    #[tokio::test]
    async fn ini_rc_file_is_loaded() {
        let dir = setup_dir();
        let root = dir.path();
        let file = write(
            root,
            ".myapprc.ini",
            "name = ini\nport = 4000\ndebug = true\nplugins[] = lint\nplugins[] = format\n",
        );

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");

        assert_eq!(
            found.configuration(),
            json!({"name": "ini", "port": 4000, "debug": true, "plugins": ["lint", "format"]})
        );
        let port = found.result().get("port").unwrap();
        assert_eq!(port.file_name().file(), Some(file.as_path()));
    }

    #[tokio::test]
    async fn json5_rc_file_is_loaded() {
        let dir = setup_dir();
        let root = dir.path();
        write(
            root,
            ".myapprc.json5",
            "// comments are allowed\n{name: 'five', port: 5005, plugins: ['a',],}\n",
        );

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");

        assert_eq!(
            found.configuration(),
            json!({"name": "five", "port": 5005, "debug": false, "plugins": ["a"]})
        );
    }

    #[tokio::test]
    async fn package_json_entry_comes_first() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, "package.json", r#"{"name": "pkg", "myapp": {"name": "from-package"}}"#);
        write(root, ".myapprc.json", r#"{"name": "rc"}"#);

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "from-package");

        let filtered = options(root, Logger::new()).with_files_filter(no_package_json());
        let confinode = Confinode::new("myapp", app_description(), filtered);
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "rc");
    }

    #[tokio::test]
    async fn package_json_without_entry_is_skipped() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, "package.json", r#"{"name": "pkg"}"#);
        write(root, "myapp.config.toml", "name = \"toml\"");

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "toml");
    }

    #[tokio::test]
    async fn explicit_files_replace_the_defaults() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"name": "rc"}"#);
        write(root, "settings.conf", "name: custom");

        let files = vec![
            FileDescription::fixed("settings.conf", Arc::new(FormatLoader::yaml()))
                .with_loader_name("yaml"),
        ];
        let confinode = Confinode::new(
            "myapp",
            app_description(),
            options(root, Logger::new()).with_files(files),
        );
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "custom");
    }
}

// ---------------------------------------------------------------------------
// Extends chains
// ---------------------------------------------------------------------------

mod extends_tests {
    use super::*;

    #[tokio::test]
    async fn merges_extended_files_in_order() {
        let dir = setup_dir();
        let root = dir.path();
        let a = write(
            root,
            ".myapprc.json",
            r#"{"extends": ["b.yaml", "c.toml"], "plugins": ["a"]}"#,
        );
        let b = write(root, "b.yaml", "name: bee\nplugins: [b]");
        let c = write(root, "c.toml", "extends = \"d.json\"\ndebug = true");
        let d = write(root, "d.json", r#"{"port": 9000, "plugins": ["d"]}"#);

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");

        assert_eq!(
            found.configuration(),
            json!({"name": "bee", "port": 9000, "debug": true, "plugins": ["b", "d", "a"]})
        );

        let result = found.result();
        assert_eq!(result.get("name").unwrap().file_name().file(), Some(b.as_path()));
        assert_eq!(result.get("port").unwrap().file_name().file(), Some(d.as_path()));
        assert_eq!(result.get("debug").unwrap().file_name().file(), Some(c.as_path()));
        let plugins = result.get("plugins").unwrap();
        assert_eq!(plugins.index(0).unwrap().file_name().file(), Some(b.as_path()));
        assert_eq!(plugins.index(1).unwrap().file_name().file(), Some(d.as_path()));
        assert_eq!(plugins.index(2).unwrap().file_name().file(), Some(a.as_path()));

        let mut expected_c = ResultFile::new(&c);
        expected_c.push_extends(ResultFile::new(&d));
        let mut expected = ResultFile::new(&a);
        expected.push_extends(ResultFile::new(&b));
        expected.push_extends(expected_c);
        assert_eq!(found.files(), &expected);
    }

    #[tokio::test]
    async fn shared_ancestor_is_merged_once_per_branch() {
        let dir = setup_dir();
        let root = dir.path();
        let a = write(root, ".myapprc.json", r#"{"extends": ["b.json", "c.json"], "plugins": ["a"]}"#);
        let b = write(root, "b.json", r#"{"extends": "d.json", "name": "bee", "plugins": ["b"]}"#);
        let c = write(root, "c.json", r#"{"extends": "d.json", "debug": true, "plugins": ["c"]}"#);
        let d = write(root, "d.json", r#"{"port": 9000, "plugins": ["d"]}"#);

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");

        assert_eq!(
            found.configuration(),
            json!({"name": "bee", "port": 9000, "debug": true, "plugins": ["d", "b", "d", "c", "a"]})
        );
        let result = found.result();
        assert_eq!(result.get("port").unwrap().file_name().file(), Some(d.as_path()));
        assert_eq!(result.get("name").unwrap().file_name().file(), Some(b.as_path()));
        assert_eq!(result.get("debug").unwrap().file_name().file(), Some(c.as_path()));

        let mut expected_b = ResultFile::new(&b);
        expected_b.push_extends(ResultFile::new(&d));
        let mut expected_c = ResultFile::new(&c);
        expected_c.push_extends(ResultFile::new(&d));
        let mut expected = ResultFile::new(&a);
        expected.push_extends(expected_b);
        expected.push_extends(expected_c);
        assert_eq!(found.files(), &expected);

        let again = confinode.search(None).await.expect("found");
        assert!(Arc::ptr_eq(&found, &again));
        assert_eq!(again.configuration(), found.configuration());
    }

    #[tokio::test]
    async fn empty_extended_file_is_transparent() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"extends": ["base.json", "empty.yaml"], "port": 1}"#);
        write(root, "base.json", r#"{"name": "base"}"#);
        write(root, "empty.yaml", "");

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "base");
        assert_eq!(found.configuration()["port"], 1);
    }

    #[tokio::test]
    async fn string_content_redirects_to_another_file() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#""real/app.yaml""#);
        let real = write(root, "real/app.yaml", "name: redirected");

        let confinode = Confinode::new("myapp", app_description(), options(root, Logger::new()));
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "redirected");
        assert_eq!(
            found.result().get("name").unwrap().file_name().file(),
            Some(real.as_path())
        );
    }

    #[tokio::test]
    async fn malformed_extends_fails_the_search() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"extends": 12}"#);
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), options(root, logger));
        assert!(confinode.search(None).await.is_none());
        assert!(ids(&messages).contains(&"badExtends"));
    }

    #[tokio::test]
    async fn missing_extended_file_fails_the_search() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"extends": "nowhere.json"}"#);
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), options(root, logger));
        assert!(confinode.search(None).await.is_none());
        assert!(ids(&messages).contains(&"fileNotFound"));
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

mod cache_tests {
    use super::*;

    fn counting_options(root: &Path, calls: &Arc<AtomicUsize>, logger: Logger) -> ConfinodeOptions {
        let loader = Arc::new(CountingLoader {
            calls: calls.clone(),
        });
        let entry = LoaderEntry::with_loader("counting", ["count"], loader).expect("valid entry");
        options(root, logger).with_loader(entry)
    }

    #[tokio::test]
    async fn second_search_is_served_from_cache() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.count", "");
        let calls = Arc::new(AtomicUsize::new(0));
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), counting_options(root, &calls, logger));
        let first = confinode.search(None).await.expect("found");
        let second = confinode.search(None).await.expect("found");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ids(&messages).contains(&"loadedFromCache"));

        confinode.clear_cache();
        let third = confinode.search(None).await.expect("found");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn only_the_first_sibling_result_is_reused() {
        let dir = setup_dir();
        let root = dir.path();
        let b = write(root, "shared/b.count", r#"{"name": "bee", "plugins": ["b"]}"#);
        let c = write(root, "shared/c.count", r#"{"port": 7000, "plugins": ["c"]}"#);
        let parents = r#"{"extends": ["../shared/b.count", "../shared/c.count"]}"#;
        write(root, "x/.myapprc.json", parents);
        write(root, "y/.myapprc.json", parents);

        let read = Arc::new(Mutex::new(Vec::new()));
        let loader = Arc::new(RecordingLoader { read: read.clone() });
        let entry = LoaderEntry::with_loader("recording", ["count"], loader).expect("valid entry");
        let (logger, messages) = collecting_logger();
        let confinode = Confinode::new(
            "myapp",
            app_description(),
            options(root, logger).with_loader(entry),
        );

        let first = confinode.search(Some(root.join("x").as_path())).await.expect("found");
        messages.lock().unwrap().clear();
        let second = confinode.search(Some(root.join("y").as_path())).await.expect("found");

        assert_eq!(first.configuration(), second.configuration());
        assert_eq!(second.configuration()["plugins"], json!(["b", "c"]));

        // Each file went through the loader once, the content cache served the rest
        assert_eq!(*read.lock().unwrap(), vec![b.clone(), c.clone()]);

        let messages = messages.lock().unwrap();
        let following = |file: &Path| {
            let position = messages
                .iter()
                .position(|message| {
                    matches!(&message.content, MessageContent::LoadingFile(loaded) if loaded == file)
                })
                .expect("file should be loaded");
            messages[position + 1].id()
        };
        assert_eq!(following(&b), "loadedFromCache");
        assert_eq!(following(&c), "usingLoader");
    }

    #[tokio::test]
    async fn disabled_cache_reloads_every_time() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.count", "");
        let calls = Arc::new(AtomicUsize::new(0));

        let options = counting_options(root, &calls, Logger::new()).with_cache(false);
        let confinode = Confinode::new("myapp", app_description(), options);
        confinode.search(None).await.expect("found");
        confinode.search(None).await.expect("found");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn synchronous_search_skips_asynchronous_loaders() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.count", "");
        write(root, "myapp.config.json", r#"{"name": "sync"}"#);
        let calls = Arc::new(AtomicUsize::new(0));

        let options = counting_options(root, &calls, Logger::new());
        let confinode = Confinode::new("myapp", app_description(), options);
        let found = confinode.search_sync(None).expect("found");

        assert_eq!(found.configuration()["name"], "sync");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

// ---------------------------------------------------------------------------
// Loader fallback
// ---------------------------------------------------------------------------

mod fallback_tests {
    use super::*;

    fn broken_options(root: &Path, logger: Logger) -> ConfinodeOptions {
        let entry = LoaderEntry::with_loader("broken", ["json"], Arc::new(BrokenLoader))
            .expect("valid entry");
        options(root, logger).with_loader(entry)
    }

    #[tokio::test]
    async fn failing_loader_falls_back_to_the_next_one() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", r#"{"name": "fallback"}"#);
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), broken_options(root, logger));
        let found = confinode.search(None).await.expect("found");
        assert_eq!(found.configuration()["name"], "fallback");

        let loaders: Vec<String> = messages
            .lock()
            .unwrap()
            .iter()
            .filter(|message| message.id() == "usingLoader")
            .map(ToString::to_string)
            .collect();
        assert_eq!(loaders, vec!["Using broken loader", "Using json loader"]);
    }

    #[tokio::test]
    async fn all_failing_loaders_are_reported() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.json", "{ not json");
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), broken_options(root, logger));
        assert!(confinode.search(None).await.is_none());

        let messages = messages.lock().unwrap();
        let failure = messages
            .iter()
            .find(|message| message.id() == "allLoadersFailed")
            .expect("failure should be logged");
        let text = failure.to_string();
        assert!(text.contains(" * broken: broken on purpose"), "{text}");
        assert!(text.contains(" * json: in "), "{text}");
        assert!(text.contains("invalid JSON"), "{text}");
    }

    #[tokio::test]
    async fn single_failing_loader_reports_its_error() {
        let dir = setup_dir();
        let root = dir.path();
        write(root, ".myapprc.yaml", "name: [unclosed");
        let (logger, messages) = collecting_logger();

        let confinode = Confinode::new("myapp", app_description(), options(root, logger));
        assert!(confinode.search(None).await.is_none());
        assert!(ids(&messages).contains(&"loadingError"));
    }
}
