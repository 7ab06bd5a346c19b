//! Ordered text-transform pipeline applied before identifier extraction

use std::fmt;
use std::sync::Arc;

use taproot_core::{BranchError, CrawlError, ModuleId};
use thiserror::Error;

use crate::stages::{ModuleSyntaxStage, StripCommentsStage};

/// Failure of a single pipeline stage.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StageError {
    message: String,
}

impl StageError {
    pub fn new(message: impl Into<String>) -> Self {
        StageError {
            message: message.into(),
        }
    }
}

/// One opaque text-to-text transform. Stages are instantiated once per
/// crawler lifetime and reused for every module, so stateful stages must
/// tolerate repeated sequential use.
pub trait TransformStage: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, text: &str, module: &ModuleId) -> Result<String, StageError>;
}

/// Reference to a stage in configuration: either the name of a built-in,
/// or a caller-constructed transform handle.
#[derive(Clone)]
pub enum StageRef {
    Named(String),
    Inline(Arc<dyn TransformStage>),
}

impl fmt::Debug for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            StageRef::Inline(stage) => f.debug_tuple("Inline").field(&stage.name()).finish(),
        }
    }
}

/// Applies the configured stages in registration order, each consuming the
/// previous stage's output. With no stages the input passes through
/// unchanged.
pub struct TransformPipeline {
    stages: Vec<Arc<dyn TransformStage>>,
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl TransformPipeline {
    /// Resolve stage references against the built-in registry and
    /// instantiate the pipeline. Unknown names are a configuration error.
    pub fn build(
        compile_module_syntax: bool,
        refs: &[StageRef],
    ) -> Result<Self, CrawlError> {
        let mut stages: Vec<Arc<dyn TransformStage>> = Vec::new();
        if compile_module_syntax {
            stages.push(Arc::new(ModuleSyntaxStage::new()));
        }
        for stage_ref in refs {
            match stage_ref {
                StageRef::Named(name) => {
                    let stage = builtin_stage(name).ok_or_else(|| {
                        CrawlError::Configuration(format!("unknown transform stage `{name}`"))
                    })?;
                    stages.push(stage);
                }
                StageRef::Inline(stage) => stages.push(Arc::clone(stage)),
            }
        }
        Ok(TransformPipeline { stages })
    }

    /// Run every stage over `text`. A failing stage aborts this module's
    /// branch with the stage's identity attached.
    pub fn run(&self, text: &str, module: &ModuleId) -> Result<String, BranchError> {
        let mut current = text.to_string();
        for stage in &self.stages {
            current = stage
                .apply(&current, module)
                .map_err(|err| BranchError::Transform {
                    stage: stage.name().to_string(),
                    message: err.to_string(),
                })?;
        }
        Ok(current)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Built-in stages addressable by name from configuration.
fn builtin_stage(name: &str) -> Option<Arc<dyn TransformStage>> {
    match name {
        "module-syntax" => Some(Arc::new(ModuleSyntaxStage::new())),
        "strip-comments" => Some(Arc::new(StripCommentsStage)),
        _ => None,
    }
}
