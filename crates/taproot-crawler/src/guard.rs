//! Secondary dedup of identical (subject, dependency-set) batches

use std::collections::HashSet;
use std::sync::Mutex;

use taproot_core::ModuleId;

/// Remembers which (subject, dependency set) pairs have already been
/// filed, so an identical batch re-offered from another call path is not
/// emitted twice. The crawl memo already guarantees at-most-once
/// processing; this is a separate, narrower invariant check in front of
/// edge emission.
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    cabinet: Mutex<HashSet<(ModuleId, String)>>,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        DuplicateGuard::default()
    }

    /// True if this exact batch has been filed before.
    pub fn seen(&self, subject: &ModuleId, dependencies: &[ModuleId]) -> bool {
        let key = (subject.clone(), Self::key(dependencies));
        self.cabinet.lock().unwrap().contains(&key)
    }

    /// File the batch.
    pub fn remember(&self, subject: &ModuleId, dependencies: &[ModuleId]) {
        let key = (subject.clone(), Self::key(dependencies));
        self.cabinet.lock().unwrap().insert(key);
    }

    fn key(dependencies: &[ModuleId]) -> String {
        dependencies
            .iter()
            .map(|dep| dep.to_string())
            .collect::<Vec<_>>()
            .join(":")
    }
}
