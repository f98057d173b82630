//! Pattern lookup and recursive reference resolution.
//!
//! A reference `{type, name}` is looked up as `<searchDir>/<type>/<name>.yaml`
//! (falling back to `.yml`) in each search directory in order; the first hit
//! wins. Pattern files may reference further patterns, which are resolved
//! ahead of the referencing pattern so base-most layers come first.

use super::merge::ConfigLayer;
use super::parse::parse_mapping;
use super::reference::{PatternReference, ResolutionChain, extract_references};
use super::source::SourceReader;
use crate::error::{ConfigError, ConfigResult, PatternNotFoundError};
use crate::paths::normalize_path;
use serde_json::{Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recognized pattern file extensions, in lookup order.
const PATTERN_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Layers produced by resolving one reference.
#[derive(Debug, Clone)]
pub struct ResolvedPattern {
    /// Nested pattern layers first, the pattern's own content last.
    pub layers: Vec<ConfigLayer>,
    /// The chain this pattern's own references were resolved under.
    pub chain: ResolutionChain,
}

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = ConfigResult<ResolvedPattern>> + Send + 'a>>;

/// Locates pattern files and expands their references.
#[derive(Clone)]
pub struct PatternResolver {
    search_paths: Vec<PathBuf>,
    reader: Arc<dyn SourceReader>,
}

impl std::fmt::Debug for PatternResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternResolver")
            .field("search_paths", &self.search_paths)
            .finish_non_exhaustive()
    }
}

impl PatternResolver {
    pub fn new(search_paths: Vec<PathBuf>, reader: Arc<dyn SourceReader>) -> Self {
        let search_paths = search_paths
            .into_iter()
            .map(|dir| {
                if !dir.is_dir() {
                    warn!(dir = %dir.display(), "Pattern search directory does not exist");
                }
                normalize_path(&dir).unwrap_or(dir)
            })
            .collect();

        Self {
            search_paths,
            reader,
        }
    }

    /// Search directories, normalized, in lookup order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the file backing `reference`, if any.
    pub async fn locate(&self, reference: &PatternReference) -> Option<PathBuf> {
        for dir in &self.search_paths {
            let type_dir = dir.join(&reference.pattern_type);
            for ext in PATTERN_EXTENSIONS {
                let candidate = type_dir.join(format!("{}.{}", reference.name, ext));
                if self.reader.is_file(&candidate).await {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Names of every pattern of `pattern_type` across all search directories,
    /// sorted and de-duplicated.
    pub async fn list_available(&self, pattern_type: &str) -> Vec<String> {
        let pattern_type = PatternReference::new(pattern_type, "").pattern_type;
        let mut names = Vec::new();

        for dir in &self.search_paths {
            let type_dir = dir.join(&pattern_type);
            if !self.reader.is_dir(&type_dir).await {
                continue;
            }
            let entries = match self.reader.list_dir(&type_dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        dir = %type_dir.display(),
                        error = %err,
                        "Failed to scan pattern directory"
                    );
                    continue;
                }
            };
            names.extend(entries.iter().filter_map(|path| pattern_name(path)));
        }

        names.sort();
        names.dedup();
        names
    }

    /// The pattern a file would be referenced as, if it lies inside a search directory.
    pub fn identify(&self, path: &Path) -> Option<PatternReference> {
        self.search_paths.iter().find_map(|dir| {
            let relative = path.strip_prefix(dir).ok()?;
            let mut components = relative.components();
            let type_dir = components.next()?.as_os_str().to_str()?;
            let file = components.next()?;
            if components.next().is_some() {
                return None;
            }
            let name = pattern_name(Path::new(file.as_os_str()))?;
            Some(PatternReference::new(type_dir, name))
        })
    }

    /// Resolve one reference under `chain`.
    ///
    /// Fails with a circular dependency error if the reference already
    /// appears in `chain`, and with a not-found error (listing available
    /// names) if no search directory holds it.
    pub fn resolve<'a>(
        &'a self,
        reference: &'a PatternReference,
        chain: &'a ResolutionChain,
    ) -> ResolveFuture<'a> {
        // Boxed so pattern files can recurse through `resolve_references`
        Box::pin(self.resolve_pattern(reference, chain))
    }

    async fn resolve_pattern(
        &self,
        reference: &PatternReference,
        chain: &ResolutionChain,
    ) -> ConfigResult<ResolvedPattern> {
        let id = reference.id();
        chain.check(&id)?;

        let Some(path) = self.locate(reference).await else {
            let available = self.list_available(&reference.pattern_type).await;
            return Err(PatternNotFoundError::new(
                reference.name.clone(),
                reference.pattern_type.clone(),
                available,
            )
            .into());
        };

        let content = self
            .reader
            .read(&path)
            .await
            .map_err(|err| ConfigError::io(&path, err))?;
        let map = parse_mapping(&content, &path)?;

        let chain = chain.extend(id.clone());
        let mut layers = self.resolve_references(&map, &chain).await?;
        debug!(
            pattern = %id,
            path = %path.display(),
            depth = chain.len(),
            nested = layers.len(),
            "Resolved pattern"
        );
        layers.push(ConfigLayer::new(id, Value::Object(map)));

        Ok(ResolvedPattern { layers, chain })
    }

    /// Resolve every reference declared by `map`, in declaration order.
    pub async fn resolve_references(
        &self,
        map: &Map<String, Value>,
        chain: &ResolutionChain,
    ) -> ConfigResult<Vec<ConfigLayer>> {
        let mut layers = Vec::new();
        for reference in extract_references(map)? {
            let resolved = self.resolve(&reference, chain).await?;
            layers.extend(resolved.layers);
        }
        Ok(layers)
    }
}

/// File stem of a pattern file, or None for anything else.
fn pattern_name(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !PATTERN_EXTENSIONS.contains(&ext) {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}
