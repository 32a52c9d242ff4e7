//! Asset sources: where texture and mask bytes come from.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use hitshape_pipeline::FailureReason;

/// Why an asset could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No asset with this identity.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The asset exists but its bytes may not be read.
    #[error("reading asset denied: {0}")]
    Denied(String),

    /// The load did not finish within the timeout.
    #[error("loading {id} timed out after {after:?}")]
    Timeout {
        /// Asset identity.
        id: String,
        /// Timeout that elapsed.
        after: Duration,
    },

    /// Any other I/O failure.
    #[error("failed to read {id}: {source}")]
    Io {
        /// Asset identity.
        id: String,
        /// Underlying error.
        source: io::Error,
    },
}

impl LoadError {
    /// The extraction failure this load error is reported as.
    #[must_use]
    pub const fn reason(&self) -> FailureReason {
        match self {
            Self::Denied(_) => FailureReason::PixelReadDenied,
            Self::NotFound(_) | Self::Timeout { .. } | Self::Io { .. } => {
                FailureReason::ImageLoadFailed
            }
        }
    }

    fn from_io(id: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(id.to_owned()),
            io::ErrorKind::PermissionDenied => Self::Denied(id.to_owned()),
            _ => Self::Io {
                id: id.to_owned(),
                source: err,
            },
        }
    }
}

/// Something that can produce the encoded bytes of an asset by identity.
pub trait AssetSource: Send + Sync {
    /// Load the encoded bytes for `id`.
    fn load(&self, id: &str) -> impl Future<Output = Result<Vec<u8>, LoadError>> + Send;
}

/// Loads assets from files under a root directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Resolve asset identities relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path an identity resolves to.
    #[must_use]
    pub fn path(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }
}

impl AssetSource for FsSource {
    async fn load(&self, id: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.path(id);
        tracing::debug!(path = %path.display(), "reading asset");
        tokio::fs::read(&path).await.map_err(|err| LoadError::from_io(id, err))
    }
}

/// In-memory assets, for embedded sprites and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
    denied: HashSet<String>,
}

impl MemorySource {
    /// An empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset.
    pub fn insert(&mut self, id: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(id.into(), bytes);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(id, bytes);
        self
    }

    /// Refuse reads of `id`, as a host does for cross-origin pixels.
    pub fn deny(&mut self, id: impl Into<String>) {
        self.denied.insert(id.into());
    }
}

impl AssetSource for MemorySource {
    async fn load(&self, id: &str) -> Result<Vec<u8>, LoadError> {
        if self.denied.contains(id) {
            return Err(LoadError::Denied(id.to_owned()));
        }
        self.assets
            .get(id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(id.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_map_to_failure_reasons() {
        assert_eq!(LoadError::Denied("a".into()).reason(), FailureReason::PixelReadDenied);
        assert_eq!(LoadError::NotFound("a".into()).reason(), FailureReason::ImageLoadFailed);
        let timeout = LoadError::Timeout {
            id: "a".into(),
            after: Duration::from_secs(8),
        };
        assert_eq!(timeout.reason(), FailureReason::ImageLoadFailed);
    }

    #[test]
    fn io_kinds_are_classified() {
        let denied = LoadError::from_io("x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, LoadError::Denied(_)));
        let missing = LoadError::from_io("x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(missing, LoadError::NotFound(_)));
        let other = LoadError::from_io("x", io::Error::other("disk on fire"));
        assert!(matches!(other, LoadError::Io { .. }));
    }

    #[tokio::test]
    async fn memory_source_serves_and_denies() {
        let mut source = MemorySource::new().with("ship.png", vec![1, 2, 3]);
        source.deny("secret.png");
        assert_eq!(source.load("ship.png").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(source.load("secret.png").await, Err(LoadError::Denied(_))));
        assert!(matches!(source.load("nope.png").await, Err(LoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn fs_source_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rock.png"), b"bytes").unwrap();
        let source = FsSource::new(dir.path());
        assert_eq!(source.load("rock.png").await.unwrap(), b"bytes");
        assert!(matches!(source.load("missing.png").await, Err(LoadError::NotFound(_))));
    }
}
