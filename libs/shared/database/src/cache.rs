use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{Result, anyhow};

/// Local key-value cache of JSON-serialized page state. Values are scoped
/// per user; keys are fixed strings per page.
pub trait LocalCache: Send + Sync {
    fn get(&self, scope: &str, key: &str) -> Option<String>;
    fn set(&self, scope: &str, key: &str, value: &str) -> Result<()>;
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// One `<root>/<scope>/<key>.json` file per entry.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, scope: &str, key: &str) -> PathBuf {
        self.root
            .join(sanitize_component(scope))
            .join(format!("{}.json", sanitize_component(key)))
    }
}

impl LocalCache for FileCache {
    fn get(&self, scope: &str, key: &str) -> Option<String> {
        let path = self.entry_path(scope, key);
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(scope, key);
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("Cache entry {} has no parent directory", path.display()))?;
        fs::create_dir_all(dir)?;

        // Entries are replaced atomically; each write stages its own file.
        let tmp = path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, value)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, scope: &str, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(&(scope.to_string(), key.to_string())).cloned()
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries
            .lock()
            .map_err(|_| anyhow!("Memory cache lock poisoned"))?;
        entries.insert((scope.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

/// Keeps path components inside the cache root.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_cache_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        assert!(cache.get("demoUser", "medications_state").is_none());

        cache.set("demoUser", "medications_state", r#"{"medications":[]}"#).unwrap();
        assert_eq!(
            cache.get("demoUser", "medications_state").as_deref(),
            Some(r#"{"medications":[]}"#)
        );
    }

    #[test]
    fn test_file_cache_overwrites_entry() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        cache.set("u", "k", "1").unwrap();
        cache.set("u", "k", "2").unwrap();
        assert_eq!(cache.get("u", "k").as_deref(), Some("2"));
    }

    #[test]
    fn test_file_cache_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let cache = std::sync::Arc::new(FileCache::new(dir.path()));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        cache.set("u", "k", &format!("{{\"writer\":{},\"round\":{}}}", i, j)).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let raw = cache.get("u", "k").unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["round"], 24);

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("u"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("k.json")]);
    }

    #[test]
    fn test_file_cache_scopes_do_not_escape_root() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        cache.set("../../etc", "passwd", "x").unwrap();

        let path = cache.entry_path("../../etc", "passwd");
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("demoUser"), "demoUser");
        assert_eq!(sanitize_component("a/b.c"), "a_b_c");
        assert_eq!(sanitize_component(""), "_");
    }

    #[test]
    fn test_memory_cache_scopes_are_isolated() {
        let cache = MemoryCache::new();
        cache.set("a", "k", "1").unwrap();

        assert_eq!(cache.get("a", "k").as_deref(), Some("1"));
        assert!(cache.get("b", "k").is_none());
    }
}
