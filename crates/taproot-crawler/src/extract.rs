//! Dependency identifier extraction from transformed module text

use anyhow::Result;
use async_trait::async_trait;
use tree_sitter::Node;

use crate::parser_pool::{ParserPool, create_parser_pool};

/// Extracts raw dependency specifiers from module text, in source order.
/// The crawler treats this as a black box; implementations decide what a
/// dependency statement looks like.
#[async_trait]
pub trait IdentifierExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<String>>;
}

/// Default extractor: parses the text as JavaScript and collects the
/// string argument of every `require(…)` call plus the source of every
/// `import`/`export … from` statement.
pub struct RequireExtractor {
    pool: ParserPool,
}

impl RequireExtractor {
    pub fn new() -> Self {
        RequireExtractor {
            pool: create_parser_pool(),
        }
    }
}

impl Default for RequireExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentifierExtractor for RequireExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<String>> {
        let tree = self.pool.parse(text.to_string()).await?;

        let mut specifiers = Vec::new();
        collect(tree.root_node(), text.as_bytes(), &mut specifiers);
        Ok(specifiers)
    }
}

/// Pre-order walk so specifiers come out in source order.
fn collect(node: Node<'_>, source: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "call_expression" => {
            if let Some(specifier) = require_argument(node, source) {
                out.push(specifier);
            }
        }
        "import_statement" | "export_statement" => {
            if let Some(src) = node.child_by_field_name("source") {
                if let Some(specifier) = string_literal(src, source) {
                    out.push(specifier);
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect(child, source, out);
    }
}

/// The string argument of a `require("…")` call, if this is one.
fn require_argument(node: Node<'_>, source: &[u8]) -> Option<String> {
    let function = node.child_by_field_name("function")?;
    if function.kind() != "identifier" || function.utf8_text(source).ok()? != "require" {
        return None;
    }

    let arguments = node.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    string_literal(first, source)
}

fn string_literal(node: Node<'_>, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let text = node.utf8_text(source).ok()?;
    Some(text.trim_matches(|c| c == '"' || c == '\'').to_string())
}
