//! Path normalization for cache keys and pattern identities.
//!
//! Cache entries are keyed by the normalized absolute path of the top-level
//! file, so `./config.yaml`, `config.yaml` and `sub/../config.yaml` all share
//! one entry.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Normalize a path into an absolute, `.`/`..`-free form.
///
/// Relative paths are joined onto the current directory. If the result
/// exists on disk it is canonicalized so symlinked aliases collapse too.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let normalized = absolute_path(path)?;
    match normalized.canonicalize() {
        Ok(canonical) => Ok(canonical),
        Err(_) => Ok(normalized),
    }
}

/// [`normalize_path`] for async callers; canonicalization runs on the
/// blocking pool.
pub async fn normalize_path_async(path: &Path) -> io::Result<PathBuf> {
    let normalized = absolute_path(path)?;
    match tokio::fs::canonicalize(&normalized).await {
        Ok(canonical) => Ok(canonical),
        Err(_) => Ok(normalized),
    }
}

fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize_path_components(&absolute))
}

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => {
                // Windows drive prefix (e.g., C:)
                components.push(Component::Prefix(p));
            }
            Component::RootDir => {
                components.push(Component::RootDir);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else {
                    // Keep `..` that cannot be folded (e.g. `/../foo` or a leading `..`)
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => {
                components.push(Component::Normal(name));
            }
        }
    }

    components.iter().collect()
}

/// Convert path to string using forward slashes.
pub fn path_to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
