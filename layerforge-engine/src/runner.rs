//! `LayerRunner` (spec.md §4.2): invokes one layer's transformer with its
//! preferred strategy and deadline. Grounded on the teacher's async
//! deadline handling (the workspace depends on `tokio`'s `time` feature
//! throughout `drift-analysis` for exactly this "run a bounded task,
//! classify the outcome" shape), adapted from process-wide analysis tasks
//! to a single layer invocation with structural-then-textual fallback.

use std::sync::Arc;
use std::time::Duration;

use layerforge_core::{EngineError, LayerId, Strategy};
use tokio_util::sync::CancellationToken;

use crate::parser::{Parser, TreeOrError};
use crate::transform::{StructuralTransformer, TransformError, Transformer};

/// What `LayerRunner::run` produced for a `StructuralPreferred` layer,
/// beyond the text itself (spec.md §4.2 "a fallback is a recoverable
/// event, not an error; it MUST be recorded as metadata").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PathTaken {
    Structural,
    TextualDirect,
    TextualFallback,
}

pub struct RunOutcome {
    pub text: String,
    pub path: PathTaken,
}

/// Why a layer invocation failed: either the engine itself timed out or
/// cancelled it, or the caller-supplied transformer reported a failure.
/// Kept distinct so the orchestrator can classify a transformer's own
/// `TransformError` — category and all — instead of collapsing every
/// failure into `EngineError::Internal` (spec.md §7: `Internal` is
/// reserved for an invariant violation inside the engine itself, not an
/// ordinary transformer-reported failure).
#[derive(Debug)]
pub enum RunError {
    Engine(EngineError),
    Transform(TransformError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "{e}"),
            Self::Transform(e) => write!(f, "{e}"),
        }
    }
}

impl From<EngineError> for RunError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}

/// A textual transformer plus, for `StructuralPreferred` layers, a
/// structural one. Both are required for `StructuralPreferred` (spec.md §9
/// open question 1).
pub struct LayerTransformers {
    pub textual: Arc<dyn Transformer>,
    pub structural: Option<Arc<dyn StructuralTransformer>>,
}

pub struct LayerRunner<'p> {
    parser: &'p dyn Parser,
}

impl<'p> LayerRunner<'p> {
    pub fn new(parser: &'p dyn Parser) -> Self {
        Self { parser }
    }

    /// Run `layer`'s transformer(s) against `code`, honouring `deadline`
    /// and `cancellation` (spec.md §4.2, §5 checkpoints: entry, between
    /// structural/textual fallback, before emitting).
    pub async fn run(
        &self,
        layer: LayerId,
        code: &str,
        transformers: &LayerTransformers,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        if cancellation.is_cancelled() {
            return Err(RunError::Engine(EngineError::Cancelled));
        }

        let outcome = tokio::time::timeout(deadline, self.run_inner(layer, code, transformers, cancellation))
            .await
            .map_err(|_| {
                RunError::Engine(EngineError::Timeout {
                    layer,
                    deadline_ms: deadline.as_millis() as u64,
                })
            })??;

        if cancellation.is_cancelled() {
            return Err(RunError::Engine(EngineError::Cancelled));
        }
        Ok(outcome)
    }

    async fn run_inner(
        &self,
        layer: LayerId,
        code: &str,
        transformers: &LayerTransformers,
        cancellation: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        match layer.strategy() {
            Strategy::Textual => {
                let text = transformers.textual.transform(code).map_err(RunError::Transform)?;
                Ok(RunOutcome { text, path: PathTaken::TextualDirect })
            }
            Strategy::StructuralPreferred => {
                let structural = transformers
                    .structural
                    .as_ref()
                    .expect("StructuralPreferred layers require a structural transformer");

                if let Some(text) = self.try_structural(code, structural.as_ref()) {
                    return Ok(RunOutcome { text, path: PathTaken::Structural });
                }

                if cancellation.is_cancelled() {
                    return Err(RunError::Engine(EngineError::Cancelled));
                }

                let text = transformers.textual.transform(code).map_err(RunError::Transform)?;
                Ok(RunOutcome { text, path: PathTaken::TextualFallback })
            }
        }
    }

    /// Attempt the structural path: parse, transform, re-parse the result
    /// with the same grammar. Any failure along the way is a fallback, not
    /// an error (spec.md §4.2).
    fn try_structural(&self, code: &str, structural: &dyn StructuralTransformer) -> Option<String> {
        let tree = match self.parser.parse(code) {
            TreeOrError::Ok(tree) => tree,
            TreeOrError::Err(_) => return None,
        };
        let candidate = structural.transform_tree(code, &tree).ok()?;
        match self.parser.parse(&candidate) {
            TreeOrError::Ok(_) => Some(candidate),
            TreeOrError::Err(_) => None,
        }
    }
}
