//! Raw module content loading

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Supplies the raw bytes of a module scheduled for crawling.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Default source: the filesystem.
pub struct FsContentSource;

#[async_trait]
impl ContentSource for FsContentSource {
    async fn load(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}
