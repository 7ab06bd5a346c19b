//! Error taxonomy for the crawl

use thiserror::Error;

use crate::model::ModuleId;

/// Fatal errors: these fail the whole crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Malformed pipeline/resolver configuration. Raised before any work
    /// starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Every supplied entry module failed to crawl.
    #[error("no entry module could be crawled")]
    NoEntrySucceeded,
}

/// Per-module errors. These abandon (or, for resolution, trim) a single
/// branch of the crawl; the rest of the traversal continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BranchError {
    /// Raw content for a scheduled module could not be obtained.
    #[error("content could not be loaded: {0}")]
    ContentLoad(String),

    /// A pipeline stage failed on this module.
    #[error("transform stage `{stage}` failed: {message}")]
    Transform { stage: String, message: String },

    /// The extractor could not process the transformed text.
    #[error("identifier extraction failed: {0}")]
    Extraction(String),

    /// A single dependency specifier could not be resolved. The specifier
    /// is dropped from the subject's dependency list; reported only when
    /// strict resolution is enabled.
    #[error("cannot resolve `{specifier}`: {reason}")]
    Resolution { specifier: String, reason: String },
}

/// One abandoned or trimmed branch, attached to the overall crawl result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub module: ModuleId,
    pub error: BranchError,
}

impl BranchFailure {
    pub fn new(module: ModuleId, error: BranchError) -> Self {
        BranchFailure { module, error }
    }
}
