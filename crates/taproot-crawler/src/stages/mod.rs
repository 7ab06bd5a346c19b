//! Built-in transform stages

pub mod module_syntax;
pub mod strip_comments;

pub use module_syntax::ModuleSyntaxStage;
pub use strip_comments::StripCommentsStage;
