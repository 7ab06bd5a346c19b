//! Taproot Core — dependency graph model, edge cache, and tree assembly

pub mod edge_cache;
pub mod errors;
pub mod model;
pub mod tree;


pub use edge_cache::EdgeCache;
pub use errors::{BranchError, BranchFailure, CrawlError};
pub use model::{EdgeRecord, ModuleId};
pub use tree::{DepTree, assemble};
