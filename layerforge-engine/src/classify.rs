//! `ErrorClassifier` (spec.md §4.8): maps a layer-runner failure to one of
//! the closed `ErrorCategory` variants. Grounded on the teacher's
//! `errors::context_error::ContextError` classification boundary — the
//! place where a raw failure crosses from "whatever the lower layer threw"
//! into "a caller-facing, remediation-bearing taxonomy".

use layerforge_core::{EngineError, ErrorCategory};

use crate::transform::TransformError;

/// Classifies failures at the `Orchestrator`/`LayerRunner` boundary. A
/// `TransformError` that already names a category is trusted as-is; one
/// that doesn't falls back to a per-layer default so every failure still
/// gets a category, a remediation hint, and recovery options (spec.md
/// §4.8, §7 "the engine never silently drops a layer").
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a transformer-reported failure for `layer`.
    pub fn classify_transform_error(&self, error: &TransformError, layer: layerforge_core::LayerId) -> ErrorCategory {
        error.category.unwrap_or_else(|| default_category_for(layer))
    }

    /// Classify an `EngineError` raised internally by the orchestration
    /// loop itself (timeouts, structural-parse failures, validator-driven
    /// reverts routed through the error path rather than `Verdict`).
    pub fn classify_engine_error(&self, error: &EngineError) -> ErrorCategory {
        match error {
            EngineError::Timeout { .. } => ErrorCategory::Timeout,
            EngineError::Syntax(_) => ErrorCategory::Syntax,
            EngineError::Parsing(_) => ErrorCategory::Parsing,
            EngineError::TransformCorruption { .. } => ErrorCategory::PatternReplace,
            EngineError::IntegrityLoss { .. } => ErrorCategory::MarkupTransform,
            EngineError::InvalidRequestUnknownLayer(_)
            | EngineError::InvalidRequestConflictingOptions(_)
            | EngineError::Cancelled
            | EngineError::Internal(_) => ErrorCategory::Unknown,
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// The category a layer falls back to when its transformer raised a bare
/// message with no category attached (spec.md §4.8).
fn default_category_for(layer: layerforge_core::LayerId) -> ErrorCategory {
    use layerforge_core::LayerId::*;
    match layer {
        Configuration => ErrorCategory::ConfigFormat,
        Patterns => ErrorCategory::PatternReplace,
        Components => ErrorCategory::MarkupTransform,
        Hydration => ErrorCategory::BrowserApiGuard,
        FrameworkSpecific => ErrorCategory::FrameworkSpecific,
        TestingQuality => ErrorCategory::Testing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerforge_core::LayerId;

    #[test]
    fn uncategorised_transform_error_falls_back_per_layer() {
        let classifier = ErrorClassifier::new();
        let error = TransformError::new("boom");
        assert_eq!(
            classifier.classify_transform_error(&error, LayerId::Hydration),
            ErrorCategory::BrowserApiGuard
        );
    }

    #[test]
    fn categorised_transform_error_is_trusted() {
        let classifier = ErrorClassifier::new();
        let error = TransformError::with_category("bad pattern", ErrorCategory::PatternReplace);
        assert_eq!(
            classifier.classify_transform_error(&error, LayerId::Configuration),
            ErrorCategory::PatternReplace
        );
    }

    #[test]
    fn engine_timeout_classifies_as_timeout() {
        let classifier = ErrorClassifier::new();
        let error = EngineError::Timeout { layer: LayerId::Components, deadline_ms: 2000 };
        assert_eq!(classifier.classify_engine_error(&error), ErrorCategory::Timeout);
    }
}
