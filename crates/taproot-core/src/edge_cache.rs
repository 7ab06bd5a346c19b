//! Flat adjacency store built incrementally from edge records

use dashmap::DashMap;

use crate::model::{EdgeRecord, ModuleId};

/// Mapping from module identity to its ordered, duplicate-free list of
/// direct dependencies. Thread-safe for the crawler's concurrent fan-out.
///
/// Invariant: every module that appears as a dependency anywhere also
/// appears as a key (possibly with an empty list), so tree assembly never
/// faces a missing node. Dependency order within a list is source order
/// and is preserved across repeated `record` calls for the same subject.
#[derive(Debug, Default, Clone)]
pub struct EdgeCache {
    adjacency: DashMap<ModuleId, Vec<ModuleId>>,
}

impl EdgeCache {
    pub fn new() -> Self {
        EdgeCache {
            adjacency: DashMap::new(),
        }
    }

    /// Fold one edge record into the cache. Each dependency is registered
    /// as a key of its own, which is also how leaf modules end up present.
    pub fn record(&self, edge: &EdgeRecord) {
        for dep in &edge.dependencies {
            self.vivify(dep);
        }

        let mut deps = self
            .adjacency
            .entry(edge.subject.clone())
            .or_insert_with(Vec::new);
        for dep in &edge.dependencies {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
    }

    /// Look up the dependency list for `id`, registering an empty one if
    /// the module has not been seen yet.
    pub fn get(&self, id: &ModuleId) -> Vec<ModuleId> {
        self.adjacency
            .entry(id.clone())
            .or_insert_with(Vec::new)
            .clone()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Number of known modules.
    pub fn module_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Total number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|entry| entry.value().len()).sum()
    }

    fn vivify(&self, id: &ModuleId) {
        self.adjacency.entry(id.clone()).or_insert_with(Vec::new);
    }
}
