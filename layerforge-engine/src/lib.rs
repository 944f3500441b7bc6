//! # layerforge-engine
//!
//! The layer orchestration engine: a content-addressed cache, AST-vs-textual
//! layer execution with per-layer deadlines, three independent validators,
//! issue-driven layer selection, an append-only pipeline with rollback, and
//! categorised error recovery.
//!
//! The engine never reads a file, opens a socket, or shells out — every
//! concrete rewrite rule is injected by the caller as a `Transformer`/
//! `StructuralTransformer` value (spec.md §1 "the per-layer rewrite rules
//! themselves" are an external collaborator).

pub mod cache;
pub mod classify;
pub mod detect;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod runner;
pub mod select;
pub mod transform;
pub mod validate;

pub use cache::ResultCache;
pub use classify::ErrorClassifier;
pub use detect::{Issue, IssueDetector, Severity as IssueSeverity};
pub use orchestrator::{
    ExecuteOptions, LayerOutcome, Metrics, Orchestrator, OrchestrationResult, Summary,
};
pub use parser::{Parser, TreeOrError, TreeSitterParser};
pub use pipeline::{Outcome, Pipeline, PipelineState};
pub use runner::{LayerRunner, LayerTransformers, PathTaken, RunError, RunOutcome};
pub use select::{LayerSelector, Recommendation};
pub use transform::{StructuralTransformer, TransformError, Transformer};
pub use validate::{CorruptionDetector, IntegrityChecker, SyntaxValidator, Verdict};
