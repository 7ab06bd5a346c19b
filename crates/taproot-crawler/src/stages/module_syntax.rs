//! Lowers ES module syntax to `require()` calls

use std::sync::LazyLock;

use regex::{Captures, Regex};
use taproot_core::ModuleId;

use crate::pipeline::{StageError, TransformStage};

/// `import defaultExport from "mod"` / `import { a, b } from "mod"` /
/// `import * as ns from "mod"`.
static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(.+?)\s+from\s+(['"])([^'"]+)['"]\s*;?"#)
        .expect("import-from pattern")
});

/// Side-effect import: `import "mod"`.
static IMPORT_SIDE_EFFECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(['"])([^'"]+)['"]\s*;?"#).expect("side-effect import pattern")
});

/// Re-export: `export { a } from "mod"` / `export * from "mod"`.
static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+(['"])([^'"]+)['"]\s*;?"#)
        .expect("export-from pattern")
});

/// Rewrites ES module `import`/`export … from` statements into the
/// `require()` form the extractor's CommonJS path understands. The rewrite
/// is line-oriented and leaves everything else untouched; it is not a full
/// module transpiler.
pub struct ModuleSyntaxStage;

impl ModuleSyntaxStage {
    pub fn new() -> Self {
        ModuleSyntaxStage
    }
}

impl Default for ModuleSyntaxStage {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStage for ModuleSyntaxStage {
    fn name(&self) -> &str {
        "module-syntax"
    }

    fn apply(&self, text: &str, _module: &ModuleId) -> Result<String, StageError> {
        let text = IMPORT_FROM.replace_all(text, |caps: &Captures<'_>| {
            let binding = caps[1].trim();
            let binding = binding.strip_prefix("* as ").unwrap_or(binding);
            format!("const {} = require(\"{}\");", binding, &caps[3])
        });
        let text = IMPORT_SIDE_EFFECT
            .replace_all(&text, |caps: &Captures<'_>| {
                format!("require(\"{}\");", &caps[2])
            });
        let text = EXPORT_FROM.replace_all(&text, |caps: &Captures<'_>| {
            format!("require(\"{}\");", &caps[2])
        });
        Ok(text.into_owned())
    }
}
