//! Crawl engine — transform, extract, resolve, and memoize module dependencies

pub mod config;
pub mod crawler;
pub mod extract;
pub mod guard;
pub mod lineup;
pub mod parser_pool;
pub mod pipeline;
pub mod resolve;
pub mod source;
pub mod stages;

#[cfg(test)]
pub mod tests;

pub use config::{CrawlOptions, ResolverOptions};
pub use crawler::{CrawlReport, Crawler};
pub use extract::{IdentifierExtractor, RequireExtractor};
pub use guard::DuplicateGuard;
pub use lineup::{EntryFile, GlobLineup};
pub use pipeline::{StageError, StageRef, TransformPipeline, TransformStage};
pub use resolve::{IdentifierResolver, NodeResolver, ResolveError};
pub use source::{ContentSource, FsContentSource};
