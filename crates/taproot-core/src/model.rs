//! Core data structures for the dependency graph

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identity of one module: its canonical absolute path.
///
/// Two records referring to the same path denote the same module; identity
/// is purely path-based, no content hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(PathBuf);

impl ModuleId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ModuleId(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// The directory resolution for this module's dependency specifiers
    /// starts from.
    pub fn base_dir(&self) -> &Path {
        self.0.parent().unwrap_or(Path::new("/"))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for ModuleId {
    fn from(path: PathBuf) -> Self {
        ModuleId(path)
    }
}

impl From<&Path> for ModuleId {
    fn from(path: &Path) -> Self {
        ModuleId(path.to_path_buf())
    }
}

impl AsRef<Path> for ModuleId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// One crawl step's findings for a single module: which modules it directly
/// depends on, and which module (if any) led the crawl to it.
///
/// Immutable once emitted. `parent` is `None` only for entry modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub subject: ModuleId,
    /// Direct dependencies in source order, duplicate-free.
    pub dependencies: Vec<ModuleId>,
    pub parent: Option<ModuleId>,
}

impl EdgeRecord {
    pub fn new(
        subject: ModuleId,
        dependencies: Vec<ModuleId>,
        parent: Option<ModuleId>,
    ) -> Self {
        EdgeRecord {
            subject,
            dependencies,
            parent,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
