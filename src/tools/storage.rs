//! Local-disk storage backing the file tools.

use super::traits::Storage;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reduce a model-supplied file name to its final path segment.
///
/// `../../etc/passwd` becomes `passwd`; names with no usable final segment
/// (`..`, `/`, empty) yield `None`.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let name = Path::new(filename.trim()).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Files stored directly under one root directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        // Callers sanitize; re-applying keeps a direct caller inside the root.
        let name = sanitize_filename(name).unwrap_or_default();
        self.root.join(name)
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn ensure_root(&self) -> io::Result<()> {
        // create_dir_all succeeds when the directory already exists, including
        // when another request created it concurrently.
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn read(&self, name: &str) -> io::Result<String> {
        let path = self.path_for(name);
        debug!("Reading {}", path.display());
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, name: &str, content: &str) -> io::Result<()> {
        let path = self.path_for(name);
        debug!("Writing {} bytes to {}", content.len(), path.display());
        tokio::fs::write(path, content).await
    }
}
