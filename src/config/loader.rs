//! Configuration loader with pattern resolution and caching.
//!
//! Loading a file parses it, resolves its pattern references, and merges
//! the resulting layers (patterns first, the file itself last). Results are
//! cached per loader, keyed by normalized absolute path.

use super::merge::{ConfigLayer, merge_layers};
use super::parse::{parse_mapping, parse_yaml_str};
use super::reference::ResolutionChain;
use super::resolver::PatternResolver;
use super::source::{FsReader, SourceReader};
use crate::error::{ConfigError, ConfigResult};
use crate::paths::{normalize_path_async, path_to_forward_slashes};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Environment variable holding an explicit list of search directories.
pub const SEARCH_PATH_ENV: &str = "CONFIG_PATTERNS_PATH";

/// A composed configuration, shared between the cache and callers.
pub type MergedConfig = Arc<Value>;

/// One shared load; `generation` is the cache generation it started in.
struct LoadSlot {
    generation: u64,
    result: OnceCell<ConfigResult<MergedConfig>>,
}

/// Construction options for [`ConfigLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Directories searched for pattern files, in order.
    pub search_paths: Vec<PathBuf>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::discover()
    }
}

impl LoaderOptions {
    /// Discover search directories from the environment and defaults.
    ///
    /// `CONFIG_PATTERNS_PATH` (a platform path list) wins when set; otherwise
    /// `./patterns` then `~/.config-patterns/patterns`.
    pub fn discover() -> Self {
        if let Some(list) = std::env::var_os(SEARCH_PATH_ENV)
            && !list.is_empty()
        {
            return Self {
                search_paths: std::env::split_paths(&list).collect(),
            };
        }

        let mut search_paths = vec![PathBuf::from("patterns")];
        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".config-patterns").join("patterns"));
        }
        Self { search_paths }
    }

    /// Create options with explicit search directories.
    pub fn with_search_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Composes configuration files with the patterns they reference.
///
/// Each loader owns its cache; separate loaders never share results.
/// Concurrent loads of the same path share one underlying execution.
pub struct ConfigLoader {
    resolver: PatternResolver,
    reader: Arc<dyn SourceReader>,
    cache: Mutex<HashMap<PathBuf, MergedConfig>>,
    in_flight: Mutex<HashMap<PathBuf, Arc<LoadSlot>>>,
    /// Bumped by `clear_cache` so loads started earlier do not repopulate it.
    generation: AtomicU64,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("search_paths", &self.resolver.search_paths())
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(LoaderOptions::discover())
    }
}

impl ConfigLoader {
    /// Create a loader reading from the local file system.
    pub fn new(options: LoaderOptions) -> Self {
        Self::with_reader(options, Arc::new(FsReader))
    }

    /// Create a loader reading through `reader`.
    pub fn with_reader(options: LoaderOptions, reader: Arc<dyn SourceReader>) -> Self {
        Self {
            resolver: PatternResolver::new(options.search_paths, Arc::clone(&reader)),
            reader,
            cache: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Search directories, normalized, in lookup order.
    pub fn search_paths(&self) -> &[PathBuf] {
        self.resolver.search_paths()
    }

    /// Names of the available patterns of one type.
    pub async fn list_available(&self, pattern_type: &str) -> Vec<String> {
        self.resolver.list_available(pattern_type).await
    }

    /// Parse a file without resolving references or touching the cache.
    pub async fn parse_yaml(&self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = path.as_ref();
        let content = self
            .reader
            .read(path)
            .await
            .map_err(|err| ConfigError::io(path, err))?;
        parse_yaml_str(&content, path)
    }

    /// Load and compose `path`, replacing any cached result on success.
    ///
    /// A failed load leaves the existing cache entry untouched.
    pub async fn load(&self, path: impl AsRef<Path>) -> ConfigResult<MergedConfig> {
        let key = self.cache_key(path.as_ref()).await?;
        self.load_key(key, false).await
    }

    /// Return the cached result for `path`, loading it on a miss.
    ///
    /// Repeated calls return the same `Arc` until [`clear_cache`](Self::clear_cache).
    pub async fn get(&self, path: impl AsRef<Path>) -> ConfigResult<MergedConfig> {
        let key = self.cache_key(path.as_ref()).await?;
        self.load_key(key, true).await
    }

    /// Drop all cached results; later calls recompute from disk.
    pub fn clear_cache(&self) {
        {
            let mut cache = lock(&self.cache);
            self.generation.fetch_add(1, Ordering::SeqCst);
            debug!(entries = cache.len(), "Clearing configuration cache");
            cache.clear();
        }
        lock(&self.in_flight).clear();
    }

    /// Whether a result for `path` is cached.
    pub async fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        match self.cache_key(path.as_ref()).await {
            Ok(key) => lock(&self.cache).contains_key(&key),
            Err(_) => false,
        }
    }

    /// Number of cached results.
    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    async fn cache_key(&self, path: &Path) -> ConfigResult<PathBuf> {
        normalize_path_async(path)
            .await
            .map_err(|err| ConfigError::io(path, err))
    }

    /// Run, or join, the load for an already-normalized path.
    ///
    /// With `use_cache`, a cached result is returned instead. The cache is
    /// checked under the in-flight lock: a finishing load caches its result
    /// before releasing its slot, so a caller never misses both.
    async fn load_key(&self, key: PathBuf, use_cache: bool) -> ConfigResult<MergedConfig> {
        let slot = {
            let mut in_flight = lock(&self.in_flight);
            if use_cache {
                let cached = lock(&self.cache).get(&key).cloned();
                if let Some(config) = cached {
                    debug!(path = %key.display(), "Configuration cache hit");
                    return Ok(config);
                }
            }
            match in_flight.get(&key) {
                Some(slot) => {
                    debug!(path = %key.display(), "Joining in-flight load");
                    Arc::clone(slot)
                }
                None => {
                    let slot = Arc::new(LoadSlot {
                        generation: self.generation.load(Ordering::SeqCst),
                        result: OnceCell::new(),
                    });
                    in_flight.insert(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        let result = slot
            .result
            .get_or_init(|| async {
                let result = self.compose(&key).await.map(Arc::new);
                if let Ok(ref config) = result {
                    // `clear_cache` bumps the generation under this same lock
                    let mut cache = lock(&self.cache);
                    if self.generation.load(Ordering::SeqCst) == slot.generation {
                        cache.insert(key.clone(), Arc::clone(config));
                    }
                }
                result
            })
            .await
            .clone();

        let mut in_flight = lock(&self.in_flight);
        if in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &slot))
        {
            in_flight.remove(&key);
        }

        result
    }

    /// Parse, resolve, and merge one file.
    async fn compose(&self, path: &Path) -> ConfigResult<Value> {
        let content = self
            .reader
            .read(path)
            .await
            .map_err(|err| ConfigError::io(path, err))?;
        let map = parse_mapping(&content, path)?;

        // A file inside a search directory is seeded as the pattern it would be
        // referenced as, so it cannot pull itself back in.
        let identity = match self.resolver.identify(path) {
            Some(reference) => reference.id(),
            None => path_to_forward_slashes(path),
        };
        let chain = ResolutionChain::seeded(identity.clone());

        let mut layers = self.resolver.resolve_references(&map, &chain).await?;
        layers.push(ConfigLayer::new(identity, Value::Object(map)));

        let merged = merge_layers(&layers);
        info!(path = %path.display(), layers = layers.len(), "Loaded configuration");
        Ok(merged)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
