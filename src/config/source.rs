//! File access used by the loader and resolver.
//!
//! Reads go through [`SourceReader`] so the composition logic never touches
//! the file system directly. [`FsReader`] is the default, backed by `tokio::fs`.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Read a whole file as UTF-8 text.
    async fn read(&self, path: &Path) -> io::Result<String>;

    /// Whether `path` is an existing regular file.
    async fn is_file(&self, path: &Path) -> bool;

    /// Whether `path` is an existing directory.
    async fn is_dir(&self, path: &Path) -> bool;

    /// Entries of a directory (full paths, unordered).
    async fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Reads from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

#[async_trait]
impl SourceReader for FsReader {
    async fn read(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn is_dir(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    async fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        Ok(paths)
    }
}
