//! Node-style resolution of dependency specifiers to module paths

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::ResolverOptions;

/// A specifier that could not be mapped to a module path.
#[derive(Debug, Clone, Error)]
#[error("cannot resolve `{specifier}` from {base_dir}")]
pub struct ResolveError {
    pub specifier: String,
    pub base_dir: String,
}

impl ResolveError {
    fn new(specifier: &str, base_dir: &Path) -> Self {
        ResolveError {
            specifier: specifier.to_string(),
            base_dir: base_dir.display().to_string(),
        }
    }
}

/// Maps a raw dependency specifier plus the requesting module's directory
/// to a canonical absolute module path.
#[async_trait]
pub trait IdentifierResolver: Send + Sync {
    async fn resolve(&self, specifier: &str, base_dir: &Path) -> Result<PathBuf, ResolveError>;
}

/// Default resolver following the CommonJS lookup rules: relative and
/// absolute specifiers are tried as files (with the configured extension
/// search order) and then as directories (`package.json` `main`, falling
/// back to `index` + extension); bare specifiers walk up through
/// `node_modules` directories.
pub struct NodeResolver {
    options: ResolverOptions,
}

impl NodeResolver {
    pub fn new(options: ResolverOptions) -> Self {
        NodeResolver { options }
    }

    fn resolve_path(&self, candidate: &Path) -> Option<PathBuf> {
        self.load_as_file(candidate)
            .or_else(|| self.load_as_directory(candidate))
    }

    fn load_as_file(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return canonical(candidate);
        }
        for ext in &self.options.extensions {
            let with_ext = PathBuf::from(format!("{}{}", candidate.display(), ext));
            if with_ext.is_file() {
                return canonical(&with_ext);
            }
        }
        None
    }

    fn load_as_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }

        if let Some(main) = self.package_main(dir) {
            let target = dir.join(&main);
            if let Some(resolved) = self.load_as_file(&target) {
                return Some(resolved);
            }
            if let Some(resolved) = self.index_of(&target) {
                return Some(resolved);
            }
        }

        self.index_of(dir)
    }

    fn index_of(&self, dir: &Path) -> Option<PathBuf> {
        self.load_as_file(&dir.join("index"))
    }

    /// The `main` field of `dir/package.json`, after the caller's package
    /// filter has had its say.
    fn package_main(&self, dir: &Path) -> Option<String> {
        let manifest_path = dir.join("package.json");
        let raw = std::fs::read_to_string(&manifest_path).ok()?;
        let manifest: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                debug!("Skipping malformed {}: {}", manifest_path.display(), err);
                return None;
            }
        };

        let manifest = match &self.options.package_filter {
            Some(filter) => filter(manifest),
            None => manifest,
        };

        manifest
            .get("main")
            .and_then(|main| main.as_str())
            .map(str::to_string)
    }

    fn resolve_package(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        for ancestor in base_dir.ancestors() {
            let candidate = ancestor.join("node_modules").join(specifier);
            if let Some(resolved) = self.resolve_path(&candidate) {
                return Some(resolved);
            }
        }
        None
    }
}

#[async_trait]
impl IdentifierResolver for NodeResolver {
    async fn resolve(&self, specifier: &str, base_dir: &Path) -> Result<PathBuf, ResolveError> {
        let resolved = if specifier.starts_with("./") || specifier.starts_with("../") {
            self.resolve_path(&base_dir.join(specifier))
        } else if Path::new(specifier).is_absolute() {
            self.resolve_path(Path::new(specifier))
        } else {
            self.resolve_package(specifier, base_dir)
        };

        resolved.ok_or_else(|| ResolveError::new(specifier, base_dir))
    }
}

fn canonical(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}
