//! Tool descriptors and the storage seam the file tools run against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;

/// Definition of a tool exposed to the inference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Flat key-value file store under a single root.
///
/// Names handed to a `Storage` are already reduced to a bare file name.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create the root if it does not exist. Idempotent.
    async fn ensure_root(&self) -> io::Result<()>;

    /// Read `name` as UTF-8 text.
    async fn read(&self, name: &str) -> io::Result<String>;

    /// Replace `name` with `content`.
    async fn write(&self, name: &str, content: &str) -> io::Result<()>;
}
