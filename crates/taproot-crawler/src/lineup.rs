//! Entry-file enumeration by glob

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use taproot_core::{CrawlError, ModuleId};
use tracing::warn;

/// One entry module: its canonical path and raw content.
#[derive(Debug, Clone)]
pub struct EntryFile {
    pub path: ModuleId,
    pub contents: Vec<u8>,
}

impl EntryFile {
    pub fn new(path: impl Into<ModuleId>, contents: Vec<u8>) -> Self {
        EntryFile {
            path: path.into(),
            contents,
        }
    }
}

/// Enumerates entry files under a root directory by glob pattern,
/// honoring ignore files the way the rest of the filesystem tooling does.
/// Results are path-sorted so the root order of a crawl is reproducible.
pub struct GlobLineup {
    root: PathBuf,
}

impl GlobLineup {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GlobLineup { root: root.into() }
    }

    pub fn list(&self, pattern: &str) -> Result<Vec<EntryFile>, CrawlError> {
        let matcher = Glob::new(pattern)
            .map_err(|err| CrawlError::Configuration(format!("invalid lineup glob: {err}")))?
            .compile_matcher();

        let mut paths = Vec::new();
        for entry in WalkBuilder::new(&self.root).build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Cannot read entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if self.matches(&matcher, entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        let mut entries = Vec::new();
        for path in paths {
            let canonical = match std::fs::canonicalize(&path) {
                Ok(canonical) => canonical,
                Err(err) => {
                    warn!("Cannot canonicalize {}: {}", path.display(), err);
                    continue;
                }
            };
            match std::fs::read(&canonical) {
                Ok(contents) => entries.push(EntryFile::new(canonical, contents)),
                Err(err) => warn!("Cannot read {}: {}", canonical.display(), err),
            }
        }
        Ok(entries)
    }

    /// Match the pattern against the path relative to the lineup root.
    fn matches(&self, matcher: &GlobMatcher, path: &Path) -> bool {
        path.strip_prefix(&self.root)
            .map(|rel| matcher.is_match(rel))
            .unwrap_or(false)
    }
}
