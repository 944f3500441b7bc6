//! The transformer interface consumed by `LayerRunner` (spec.md §6).
//! Transformers are injected; the engine never implements a rewrite rule
//! itself (spec.md §1 non-goal).

use layerforge_core::ErrorCategory;

/// An error a transformer may raise. Deliberately narrow: a transformer
/// is a value-to-value function and is not expected to know about the
/// engine's error taxonomy, only to say what went wrong and, optionally,
/// which of the closed categories (spec.md §4.8) it belongs to. When
/// `category` is absent, `ErrorClassifier` falls back to a per-layer
/// default (spec.md §7 "transformer exceptions are classified... they
/// never escape `execute`").
#[derive(Debug, Clone)]
pub struct TransformError {
    pub message: String,
    pub category: Option<ErrorCategory>,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: None,
        }
    }

    pub fn with_category(message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            message: message.into(),
            category: Some(category),
        }
    }
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransformError {}

/// `transform(code) -> text` (spec.md §6): synchronous, deterministic,
/// total over syntactically valid inputs. Used directly by `Textual`
/// layers and as the fallback for `StructuralPreferred` layers.
pub trait Transformer: Send + Sync {
    fn transform(&self, code: &str) -> Result<String, TransformError>;
}

/// The structural counterpart for `StructuralPreferred` layers (spec.md
/// §9 open question 1: structural and textual are genuinely distinct
/// transformers, both required). Operates on the already-parsed tree plus
/// the original source and emits the rewritten text.
pub trait StructuralTransformer: Send + Sync {
    fn transform_tree(&self, code: &str, tree: &tree_sitter::Tree) -> Result<String, TransformError>;
}

/// Adapts any plain function into a `Transformer`, for tests and for
/// simple layers that don't need a stateful struct.
impl<F> Transformer for F
where
    F: Fn(&str) -> Result<String, TransformError> + Send + Sync,
{
    fn transform(&self, code: &str) -> Result<String, TransformError> {
        self(code)
    }
}

impl<F> StructuralTransformer for F
where
    F: Fn(&str, &tree_sitter::Tree) -> Result<String, TransformError> + Send + Sync,
{
    fn transform_tree(&self, code: &str, tree: &tree_sitter::Tree) -> Result<String, TransformError> {
        self(code, tree)
    }
}
