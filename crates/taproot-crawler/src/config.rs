//! Crawl configuration surface

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use taproot_core::CrawlError;

use crate::pipeline::StageRef;

/// Filter on raw dependency specifiers, applied before resolution.
pub type IdentifierFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Filter on resolved module paths, applied after resolution.
pub type PathFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Rewrite of a resolved module path, applied last.
pub type PathMapper = Arc<dyn Fn(PathBuf) -> PathBuf + Send + Sync>;

/// Transform of a parsed `package.json` manifest before its `main` field
/// is consulted.
pub type PackageFilter = Arc<dyn Fn(serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Options recognized by the crawl.
#[derive(Clone)]
pub struct CrawlOptions {
    /// Glob selecting the entry files, relative to the crawl root.
    pub lineup: String,
    /// Exclude resolved paths housed under `vendor_dir` and never crawl
    /// into them through such an edge.
    pub ignore_vendored: bool,
    /// Directory name that marks a vendored dependency.
    pub vendor_dir: String,
    pub pre_filter: Option<IdentifierFilter>,
    pub post_filter: Option<PathFilter>,
    pub identifier_mapper: Option<PathMapper>,
    pub resolver: ResolverOptions,
    /// Caller-supplied transform stages, applied in order.
    pub transform_stages: Vec<StageRef>,
    /// Prepend the built-in module-syntax lowering as stage zero.
    pub compile_module_syntax: bool,
    /// Surface dropped specifiers in the failure report instead of
    /// discarding them silently.
    pub strict_resolution: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        CrawlOptions {
            lineup: "**/*.js".to_string(),
            ignore_vendored: true,
            vendor_dir: "node_modules".to_string(),
            pre_filter: None,
            post_filter: None,
            identifier_mapper: None,
            resolver: ResolverOptions::default(),
            transform_stages: Vec::new(),
            compile_module_syntax: true,
            strict_resolution: false,
        }
    }
}

impl CrawlOptions {
    /// Reject malformed configuration before any work starts.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.resolver.extensions.is_empty() {
            return Err(CrawlError::Configuration(
                "resolver extension list must not be empty".to_string(),
            ));
        }
        if let Some(ext) = self
            .resolver
            .extensions
            .iter()
            .find(|ext| !ext.starts_with('.'))
        {
            return Err(CrawlError::Configuration(format!(
                "resolver extension `{ext}` must start with a dot"
            )));
        }
        if self.ignore_vendored && self.vendor_dir.is_empty() {
            return Err(CrawlError::Configuration(
                "vendor_dir must not be empty while ignore_vendored is set".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for CrawlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlOptions")
            .field("lineup", &self.lineup)
            .field("ignore_vendored", &self.ignore_vendored)
            .field("vendor_dir", &self.vendor_dir)
            .field("pre_filter", &self.pre_filter.is_some())
            .field("post_filter", &self.post_filter.is_some())
            .field("identifier_mapper", &self.identifier_mapper.is_some())
            .field("resolver", &self.resolver)
            .field("transform_stages", &self.transform_stages)
            .field("compile_module_syntax", &self.compile_module_syntax)
            .field("strict_resolution", &self.strict_resolution)
            .finish()
    }
}

/// Options forwarded to the identifier resolver.
#[derive(Clone)]
pub struct ResolverOptions {
    /// Extension search order for extensionless specifiers.
    pub extensions: Vec<String>,
    pub package_filter: Option<PackageFilter>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            extensions: vec![".js".to_string(), ".jsx".to_string()],
            package_filter: None,
        }
    }
}

impl fmt::Debug for ResolverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverOptions")
            .field("extensions", &self.extensions)
            .field("package_filter", &self.package_filter.is_some())
            .finish()
    }
}
