//! Persisted collider vertices.
//!
//! A JSON object mapping a composite cache key to the polygon's vertices
//! as `[[x, y], ...]`. Because the key embeds the config fingerprint, a
//! retuned config simply misses instead of returning stale vertices.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use hitshape_pipeline::Point;

/// Errors reading or writing a vertex store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file could not be read or written.
    #[error("vertex store {path}: {source}")]
    Io {
        /// Store location.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not a valid vertex store.
    #[error("vertex store {path} is malformed: {source}")]
    Parse {
        /// Store location.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The entries could not be serialized.
    #[error("failed to serialize vertex store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Key → vertices map backed by a JSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStore {
    path: PathBuf,
    entries: BTreeMap<String, Vec<[f64; 2]>>,
}

impl VertexStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for unreadable files and
    /// [`StoreError::Parse`] for malformed ones.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened vertex store");
        Ok(Self { path, entries })
    }

    /// Write every entry back to the file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file cannot be written.
    pub async fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&self.entries)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Stored vertices for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<Point>> {
        self.entries
            .get(key)
            .map(|pts| pts.iter().map(|&[x, y]| Point::new(x, y)).collect())
    }

    /// Store vertices under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, vertices: &[Point]) {
        self.entries
            .insert(key.into(), vertices.iter().map(|p| [p.x, p.y]).collect());
    }

    /// Remove the entry for `key`.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = VertexStore::open(dir.path().join("colliders.json")).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn entries_survive_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colliders.json");

        let mut store = VertexStore::open(&path).await.unwrap();
        let tri = [Point::new(-1.0, -1.0), Point::new(2.0, -1.0), Point::new(0.5, 3.25)];
        store.insert("ship.png|-|00ff", &tri);
        store.save().await.unwrap();

        let reopened = VertexStore::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get("ship.png|-|00ff").unwrap(), tri.to_vec());
        assert!(reopened.get("ship.png|-|0100").is_none());

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["ship.png|-|00ff"][2], serde_json::json!([0.5, 3.25]));
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colliders.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(VertexStore::open(&path).await, Err(StoreError::Parse { .. })));
    }

    #[test]
    fn remove_reports_presence() {
        let mut store = VertexStore {
            path: PathBuf::from("unused.json"),
            entries: BTreeMap::new(),
        };
        store.insert("a", &[Point::ZERO]);
        assert!(store.remove("a"));
        assert!(!store.remove("a"));
    }
}
