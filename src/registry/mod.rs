//! Model source registration and engine lifetime management.
//!
//! The [`ModelRegistry`] maps model names to [`OrtInfer`] engines. Sources
//! are registered up front (idempotently); engines load on first use and are
//! shared behind `Arc`s. A capacity bound evicts the least-recently-used
//! engine; in-flight calls keep their engine alive through the `Arc`.

use crate::core::config::OrtSessionConfig;
use crate::core::constants::{DEFAULT_REGISTRY_CAPACITY, DEFAULT_SESSION_POOL_SIZE};
use crate::core::errors::{VisionError, VisionResult};
use crate::core::inference::OrtInfer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a model's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// A model file on local disk.
    File {
        /// Path to the ONNX model file.
        path: PathBuf,
    },
    /// A remotely-hosted model descriptor.
    ///
    /// Transport is out of scope for this library: the descriptor only
    /// becomes loadable once an external downloader fills `cache_path`.
    Cloud {
        /// Source URI of the hosted model.
        uri: String,
        /// Optional revision/version pin.
        revision: Option<String>,
        /// Local path the model has been downloaded to, if any.
        cache_path: Option<PathBuf>,
    },
}

impl ModelSource {
    /// Creates a file source.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ModelSource::File { path: path.into() }
    }

    /// Creates a cloud source with no cached bytes yet.
    pub fn cloud(uri: impl Into<String>) -> Self {
        ModelSource::Cloud {
            uri: uri.into(),
            revision: None,
            cache_path: None,
        }
    }

    /// Pins the cloud source to a revision.
    pub fn with_revision(self, revision: impl Into<String>) -> Self {
        match self {
            ModelSource::Cloud {
                uri, cache_path, ..
            } => ModelSource::Cloud {
                uri,
                revision: Some(revision.into()),
                cache_path,
            },
            other => other,
        }
    }

    /// Sets the local cache path of a cloud source.
    pub fn with_cache_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            ModelSource::Cloud { uri, revision, .. } => ModelSource::Cloud {
                uri,
                revision,
                cache_path: Some(path.into()),
            },
            other => other,
        }
    }

    /// Returns the path this source can currently be loaded from, if any.
    fn loadable_path(&self) -> Option<&Path> {
        match self {
            ModelSource::File { path } => Some(path),
            ModelSource::Cloud { cache_path, .. } => cache_path.as_deref(),
        }
    }
}

/// A loaded model engine with its registration name.
#[derive(Debug)]
pub struct LoadedModel {
    /// Name the model was registered under.
    pub name: String,
    /// Inference engine for the model.
    pub engine: OrtInfer,
    /// When the engine was loaded.
    pub loaded_at: Instant,
}

#[derive(Debug, Default)]
struct RegistryInner {
    sources: HashMap<String, ModelSource>,
    loaded: HashMap<String, Arc<LoadedModel>>,
    /// Monotonic access stamps for LRU eviction.
    last_used: HashMap<String, u64>,
    clock: u64,
}

/// Maps model names to loaded inference engines.
#[derive(Debug)]
pub struct ModelRegistry {
    capacity: usize,
    session_pool_size: usize,
    ort_config: Option<OrtSessionConfig>,
    inner: Mutex<RegistryInner>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_REGISTRY_CAPACITY)
    }
}

impl ModelRegistry {
    /// Creates a registry keeping at most `capacity` loaded engines.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            session_pool_size: DEFAULT_SESSION_POOL_SIZE,
            ort_config: None,
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Sets the ONNX session pool size used for newly loaded engines.
    pub fn with_session_pool_size(mut self, pool_size: usize) -> Self {
        self.session_pool_size = pool_size.max(1);
        self
    }

    /// Sets the ONNX session configuration used for newly loaded engines.
    pub fn with_ort_config(mut self, config: OrtSessionConfig) -> Self {
        self.ort_config = Some(config);
        self
    }

    /// Registers a model source under `name`.
    ///
    /// Idempotent: re-registering an identical source is a no-op. Registering
    /// a different source under the same name replaces it and invalidates any
    /// loaded engine for that name.
    pub fn register_source(&self, name: &str, source: ModelSource) -> VisionResult<()> {
        if name.is_empty() {
            return Err(VisionError::config_error("model name must not be empty"));
        }
        let mut inner = self.lock()?;
        match inner.sources.get(name) {
            Some(existing) if *existing == source => {
                debug!(model = name, "source already registered, no-op");
                Ok(())
            }
            Some(_) => {
                info!(model = name, "replacing registered source");
                inner.sources.insert(name.to_string(), source);
                if inner.loaded.remove(name).is_some() {
                    inner.last_used.remove(name);
                    debug!(model = name, "invalidated loaded engine after replace");
                }
                Ok(())
            }
            None => {
                debug!(model = name, "registered source");
                inner.sources.insert(name.to_string(), source);
                Ok(())
            }
        }
    }

    /// Returns the engine for `name`, loading it on first use.
    ///
    /// Callers racing on an unloaded model serialize on the registry lock and
    /// share the single resulting engine. Above capacity, the
    /// least-recently-used engine is dropped from the registry; `Arc`s held
    /// by in-flight calls remain valid.
    pub fn get_or_load(&self, name: &str) -> VisionResult<Arc<LoadedModel>> {
        let mut inner = self.lock()?;
        inner.clock += 1;
        let stamp = inner.clock;

        if let Some(model) = inner.loaded.get(name).cloned() {
            inner.last_used.insert(name.to_string(), stamp);
            return Ok(model);
        }

        let source = inner
            .sources
            .get(name)
            .ok_or_else(|| VisionError::model_unavailable(name, "no source registered"))?;
        let path = source
            .loadable_path()
            .ok_or_else(|| {
                VisionError::model_unavailable(
                    name,
                    "cloud source has not been downloaded to a local cache path",
                )
            })?
            .to_path_buf();

        let start = Instant::now();
        let engine = OrtInfer::with_pool(
            &path,
            None,
            self.session_pool_size,
            self.ort_config.as_ref(),
        )?;
        info!(
            model = name,
            path = %path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded model engine"
        );

        let model = Arc::new(LoadedModel {
            name: name.to_string(),
            engine,
            loaded_at: Instant::now(),
        });
        inner.loaded.insert(name.to_string(), model.clone());
        inner.last_used.insert(name.to_string(), stamp);

        if inner.loaded.len() > self.capacity {
            Self::evict_lru(&mut inner);
        }
        Ok(model)
    }

    /// Drops the loaded engine for `name`, if any. The source registration
    /// is kept; the next `get_or_load` reloads.
    pub fn evict(&self, name: &str) -> VisionResult<bool> {
        let mut inner = self.lock()?;
        inner.last_used.remove(name);
        let removed = inner.loaded.remove(name).is_some();
        if removed {
            info!(model = name, "evicted model engine");
        }
        Ok(removed)
    }

    /// Returns the number of currently loaded engines.
    pub fn loaded_count(&self) -> usize {
        self.lock().map(|inner| inner.loaded.len()).unwrap_or(0)
    }

    /// Returns true if a source is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lock()
            .map(|inner| inner.sources.contains_key(name))
            .unwrap_or(false)
    }

    fn evict_lru(inner: &mut RegistryInner) {
        let victim = inner
            .last_used
            .iter()
            .min_by_key(|&(_, &stamp)| stamp)
            .map(|(name, _)| name.clone());
        if let Some(name) = victim {
            inner.loaded.remove(&name);
            inner.last_used.remove(&name);
            warn!(model = %name, "capacity reached, evicted least-recently-used engine");
        }
    }

    fn lock(&self) -> VisionResult<std::sync::MutexGuard<'_, RegistryInner>> {
        self.inner
            .lock()
            .map_err(|_| VisionError::invalid_input("model registry lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_identical_source_is_noop() {
        let registry = ModelRegistry::default();
        let source = ModelSource::cloud("https://models.example/scrfd")
            .with_revision("1.2.0");
        registry.register_source("face", source.clone()).unwrap();
        registry.register_source("face", source).unwrap();
        assert!(registry.contains("face"));
    }

    #[test]
    fn test_register_empty_name_rejected() {
        let registry = ModelRegistry::default();
        assert!(
            registry
                .register_source("", ModelSource::file("/tmp/m.onnx"))
                .is_err()
        );
    }

    #[test]
    fn test_get_or_load_unregistered_is_unavailable() {
        let registry = ModelRegistry::default();
        let err = registry.get_or_load("missing").unwrap_err();
        assert!(matches!(err, VisionError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_uncached_cloud_source_is_unavailable() {
        let registry = ModelRegistry::default();
        registry
            .register_source("cloud-label", ModelSource::cloud("https://models.example/l"))
            .unwrap();
        let err = registry.get_or_load("cloud-label").unwrap_err();
        assert!(matches!(err, VisionError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("cache path"));
    }

    #[test]
    fn test_replacing_source_invalidates_nothing_when_unloaded() {
        let registry = ModelRegistry::default();
        registry
            .register_source("m", ModelSource::file("/a.onnx"))
            .unwrap();
        registry
            .register_source("m", ModelSource::file("/b.onnx"))
            .unwrap();
        assert!(registry.contains("m"));
        assert_eq!(registry.loaded_count(), 0);
    }

    #[test]
    fn test_evict_unloaded_returns_false() {
        let registry = ModelRegistry::default();
        assert!(!registry.evict("anything").unwrap());
    }
}
