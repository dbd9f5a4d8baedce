use dashmap::DashMap;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] io::Error),

    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One cache namespace, held in memory and mirrored to
/// `<base_path>/<namespace>.json`.
#[derive(Debug)]
pub struct CacheStore {
    namespace: String,
    path: PathBuf,
    entries: DashMap<String, Value>,
    // Serializa escrituras del archivo
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Opens the namespace file, creating the base directory if needed. A
    /// missing file yields an empty store.
    pub async fn open(base_path: impl AsRef<Path>, namespace: &str) -> Result<Self, CacheError> {
        let base_path = base_path.as_ref();
        fs::create_dir_all(base_path).await?;

        let path = namespace_file(base_path, namespace);
        let entries = match fs::read_to_string(&path).await {
            Ok(content) => {
                let stored: HashMap<String, Value> = serde_json::from_str(&content)?;
                stored.into_iter().collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => DashMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "🗄️ Caché '{}' abierto en {} ({} entradas)",
            namespace,
            path.display(),
            entries.len()
        );

        Ok(Self {
            namespace: namespace.to_string(),
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    /// Empty store bound to the namespace file without reading it.
    pub fn empty(base_path: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            path: namespace_file(base_path.as_ref(), namespace),
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores `value` and rewrites the namespace file. Write failures are
    /// logged; the in-memory entry is kept either way.
    pub async fn set(&self, key: String, value: Value) {
        debug!("Caché '{}': guardando {}", self.namespace, key);
        self.entries.insert(key, value);

        if let Err(e) = self.persist().await {
            warn!(
                "⚠️ No se pudo escribir el caché '{}' en {}: {}",
                self.namespace,
                self.path.display(),
                e
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn persist(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;

        let snapshot: BTreeMap<String, Value> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let content = serde_json::to_string_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn namespace_file(base_path: &Path, namespace: &str) -> PathBuf {
    base_path.join(format!("{}.json", namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_missing_namespace_is_empty() {
        let tmp = TempDir::new().unwrap();

        let store = CacheStore::open(tmp.path().join("nested"), "lookups").await.unwrap();

        assert!(store.is_empty());
        assert_eq!(store.namespace(), "lookups");
        assert!(store.path().ends_with("nested/lookups.json"));
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let tmp = TempDir::new().unwrap();

        let store = CacheStore::open(tmp.path(), "lookups").await.unwrap();
        store.set("search:\"lofi\"".into(), json!(["a", "b"])).await;
        drop(store);

        let reopened = CacheStore::open(tmp.path(), "lookups").await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("search:\"lofi\""), Some(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn namespaces_do_not_share_entries() {
        let tmp = TempDir::new().unwrap();

        let first = CacheStore::open(tmp.path(), "first").await.unwrap();
        first.set("k".into(), json!(1)).await;
        let second = CacheStore::open(tmp.path(), "second").await.unwrap();

        assert_eq!(second.get("k"), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lookups.json"), "not json").unwrap();

        let result = CacheStore::open(tmp.path(), "lookups").await;

        assert!(matches!(result, Err(CacheError::Json(_))));
    }

    #[tokio::test]
    async fn set_keeps_entry_when_file_cannot_be_written() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::empty(tmp.path().join("missing-dir"), "lookups");

        store.set("k".into(), json!("v")).await;

        assert_eq!(store.get("k"), Some(json!("v")));
    }
}
