//! Cached, deduplicating extraction over an [`AssetSource`].
//!
//! Results are cached per [`cache_key`]: the texture and mask identities
//! plus the config fingerprint. The cell for a key is inserted before any
//! work starts, so concurrent callers asking for the same key await one
//! computation instead of racing to load and trace the same sprite.
//!
//! Load failures (missing, denied, timed out, undecodable) are handed to
//! every caller that was waiting on them but are not kept; the next call
//! retries. Geometric failures are cached like successes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hitshape_pipeline::{
    ExtractionConfig, ExtractionResult, FailureReason, PartialMeta, PipelineError, cache_key,
};
use tokio::sync::{Mutex, OnceCell};

use crate::source::{AssetSource, LoadError};

/// Default bound on loading one asset.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(8);

type Slot = Arc<OnceCell<Arc<ExtractionResult>>>;

/// Loads sprites from a source and extracts their colliders, once.
pub struct Extractor<S> {
    source: S,
    config: ExtractionConfig,
    load_timeout: Duration,
    cache: Mutex<HashMap<String, Slot>>,
}

impl<S: AssetSource> Extractor<S> {
    /// Create an extractor with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(source: S, config: ExtractionConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the per-asset load timeout.
    #[must_use]
    pub const fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// The configuration every extraction uses.
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// The underlying asset source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Extract the collider for `texture` (and optional `mask`), using
    /// the cache. Never fails: problems become a fallback result.
    pub async fn extract(&self, texture: &str, mask: Option<&str>) -> Arc<ExtractionResult> {
        let key = cache_key(texture, mask, &self.config);
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(key.clone()).or_default())
        };

        let init_key = key.clone();
        let result = cell
            .get_or_init(|| async move {
                tracing::info!(key = %init_key, "extracting collider");
                Arc::new(self.extract_uncached(texture, mask).await)
            })
            .await;
        let result = Arc::clone(result);

        if matches!(
            result.reason(),
            Some(FailureReason::ImageLoadFailed | FailureReason::PixelReadDenied)
        ) {
            let mut cache = self.cache.lock().await;
            if cache.get(&key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                tracing::info!(%key, "dropping failed load from cache");
                cache.remove(&key);
            }
        }
        result
    }

    /// Load and extract without touching the cache.
    ///
    /// Texture and mask are loaded concurrently, each bounded by the load
    /// timeout. Extraction runs on the blocking thread pool.
    pub async fn extract_uncached(&self, texture: &str, mask: Option<&str>) -> ExtractionResult {
        let mask_load = async {
            match mask {
                Some(id) => self.load(id).await.map(Some),
                None => Ok(None),
            }
        };
        let (texture_bytes, mask_bytes) = match tokio::join!(self.load(texture), mask_load) {
            (Ok(t), Ok(m)) => (t, m),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(%err, texture, "asset load failed");
                return ExtractionResult::failed(err.reason(), PartialMeta::default(), &self.config);
            }
        };

        let config = self.config.clone();
        let job = tokio::task::spawn_blocking(move || {
            hitshape_pipeline::extract_or_fallback(&texture_bytes, mask_bytes.as_deref(), &config)
        });
        match job.await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(%err, texture, "extraction task failed");
                ExtractionResult::failed(
                    FailureReason::ImageLoadFailed,
                    PartialMeta::default(),
                    &self.config,
                )
            }
        }
    }

    /// Number of cached (or in-flight) keys.
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Forget every cached result.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    async fn load(&self, id: &str) -> Result<Vec<u8>, LoadError> {
        tokio::time::timeout(self.load_timeout, self.source.load(id))
            .await
            .map_err(|_| LoadError::Timeout {
                id: id.to_owned(),
                after: self.load_timeout,
            })?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn invalid_config_is_rejected() {
        let config = ExtractionConfig {
            hit_inset: 0.0,
            ..ExtractionConfig::default()
        };
        assert!(Extractor::new(MemorySource::new(), config).is_err());
    }

    #[tokio::test]
    async fn missing_texture_is_a_load_failure_and_not_cached() {
        let extractor = Extractor::new(MemorySource::new(), ExtractionConfig::default()).unwrap();
        let result = extractor.extract("ghost.png", None).await;
        assert_eq!(result.reason(), Some(FailureReason::ImageLoadFailed));
        assert_eq!(extractor.cached_len().await, 0);
    }

    #[tokio::test]
    async fn denied_mask_is_reported_as_denied() {
        let mut source = MemorySource::new().with("ship.png", vec![0; 4]);
        source.deny("ship-mask.png");
        let extractor = Extractor::new(source, ExtractionConfig::default()).unwrap();
        let result = extractor.extract("ship.png", Some("ship-mask.png")).await;
        assert_eq!(result.reason(), Some(FailureReason::PixelReadDenied));
    }
}
