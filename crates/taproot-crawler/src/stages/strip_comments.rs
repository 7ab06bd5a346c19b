//! Removes comments so commented-out dependencies are not extracted

use std::sync::LazyLock;

use regex::Regex;
use taproot_core::ModuleId;

use crate::pipeline::{StageError, TransformStage};

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//[^\n]*").expect("line comment pattern"));

/// Strips `//` and `/* … */` comments. Comment markers inside string
/// literals are not special-cased.
pub struct StripCommentsStage;

impl TransformStage for StripCommentsStage {
    fn name(&self) -> &str {
        "strip-comments"
    }

    fn apply(&self, text: &str, _module: &ModuleId) -> Result<String, StageError> {
        let text = BLOCK_COMMENT.replace_all(text, "");
        let text = LINE_COMMENT.replace_all(&text, "");
        Ok(text.into_owned())
    }
}
