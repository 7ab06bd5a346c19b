//! Nested dependency tree and its assembly from the flat edge cache

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::edge_cache::EdgeCache;
use crate::model::ModuleId;

/// The nested-mapping form of the dependency graph: each node maps module
/// identities to their own subtrees, terminal nodes being empty mappings.
///
/// Entries keep the order they were added in, which mirrors source order
/// from the edge cache. Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepTree {
    children: Vec<(ModuleId, DepTree)>,
}

impl DepTree {
    pub fn new() -> Self {
        DepTree::default()
    }

    pub fn insert(&mut self, id: ModuleId, subtree: DepTree) {
        self.children.push((id, subtree));
    }

    pub fn child(&self, id: &ModuleId) -> Option<&DepTree> {
        self.children
            .iter()
            .find(|(child_id, _)| child_id == id)
            .map(|(_, subtree)| subtree)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Direct children in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &DepTree)> {
        self.children.iter().map(|(id, subtree)| (id, subtree))
    }

    /// Total number of nodes below this one, counting repeats.
    pub fn node_count(&self) -> usize {
        self.children
            .iter()
            .map(|(_, subtree)| 1 + subtree.node_count())
            .sum()
    }
}

impl Serialize for DepTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (id, subtree) in &self.children {
            map.serialize_entry(id, subtree)?;
        }
        map.end()
    }
}

/// Materialize the nested tree for the given roots from the flat adjacency
/// in `cache`: one independently expanded subtree per root, children in
/// cache (source) order.
///
/// Two roots sharing a dependency each get their own structurally equal
/// copy of its subtree; the result is a plain nested mapping, never a graph
/// with shared references. A cyclic adjacency (mutual imports survive the
/// crawl as a cycle in the cache) is cut at the back-edge: a module already
/// on the current expansion path is emitted as an empty subtree.
pub fn assemble(cache: &EdgeCache, roots: &[ModuleId]) -> DepTree {
    let mut tree = DepTree::new();
    for root in roots {
        let mut path = Vec::new();
        tree.insert(root.clone(), build(cache, root, &mut path));
    }
    tree
}

fn build(cache: &EdgeCache, id: &ModuleId, path: &mut Vec<ModuleId>) -> DepTree {
    let mut node = DepTree::new();
    path.push(id.clone());
    for dep in cache.get(id) {
        if path.contains(&dep) {
            // Back-edge: cut the cycle here.
            node.insert(dep, DepTree::new());
            continue;
        }
        let subtree = build(cache, &dep, path);
        node.insert(dep, subtree);
    }
    path.pop();
    node
}
