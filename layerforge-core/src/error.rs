//! The closed error taxonomy (spec.md §7) plus a stable error-code trait
//! in the shape of the teacher's `DriftErrorCode` (`ContextError`'s
//! `error_code()` method): every variant gets a SCREAMING_SNAKE_CASE code
//! a caller-side dashboard can key off without matching on the enum.

use crate::layer::LayerId;

/// The closed taxonomy from spec.md §7. `Internal` is the only variant
/// permitted to propagate out of `Orchestrator::execute`; every other
/// variant is classified and recorded per-layer by `ErrorClassifier`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: unknown layer id {0}")]
    InvalidRequestUnknownLayer(u8),

    #[error("invalid request: {0}")]
    InvalidRequestConflictingOptions(String),

    #[error("layer {layer:?} exceeded its deadline of {deadline_ms}ms")]
    Timeout { layer: LayerId, deadline_ms: u64 },

    #[error("source is not syntactically valid: {0}")]
    Syntax(String),

    #[error("structural parse failed, falling back to textual: {0}")]
    Parsing(String),

    #[error("transform introduced a known-bad shape: {pattern_name}")]
    TransformCorruption { pattern_name: String },

    #[error("transform dropped critical import(s): {}", lost_identifiers.join(", "))]
    IntegrityLoss { lost_identifiers: Vec<String> },

    #[error("orchestration was cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// A stable, machine-readable code per error variant.
pub trait EngineErrorCode {
    fn error_code(&self) -> &'static str;
}

impl EngineErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequestUnknownLayer(_) => "INVALID_REQUEST_UNKNOWN_LAYER",
            Self::InvalidRequestConflictingOptions(_) => "INVALID_REQUEST_CONFLICTING_OPTIONS",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Syntax(_) => "SYNTAX",
            Self::Parsing(_) => "PARSING",
            Self::TransformCorruption { .. } => "TRANSFORM_CORRUPTION",
            Self::IntegrityLoss { .. } => "INTEGRITY_LOSS",
            Self::Cancelled => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// One of the closed categories an `EngineError` is classified into by
/// `ErrorClassifier` (spec.md §4.8). Distinct from `EngineError` itself:
/// `ErrorCategory` is the caller-facing taxonomy attached to a
/// `LayerOutcome::Failed`, carrying remediation metadata rather than the
/// error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    Syntax,
    Parsing,
    Filesystem,
    Timeout,
    Memory,
    Network,
    ConfigFormat,
    PatternReplace,
    MarkupTransform,
    BrowserApiGuard,
    FrameworkSpecific,
    Testing,
    Unknown,
}

/// A single-shot recovery strategy a category may offer (spec.md §4.8).
/// The orchestrator may invoke one recovery attempt per layer; it must not
/// recurse into recovery on a second failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RecoveryStrategy {
    FallbackToTextual,
    RetryWithLongerDeadline,
    RetryAfterDelay,
    ReduceScope,
    SkipProblematicPatterns,
}

impl ErrorCategory {
    pub fn severity(self) -> Severity {
        use ErrorCategory::*;
        match self {
            Timeout | Memory | Network | Syntax | Parsing | ConfigFormat => Severity::High,
            PatternReplace | MarkupTransform | BrowserApiGuard | FrameworkSpecific | Testing => {
                Severity::Medium
            }
            Filesystem | Unknown => Severity::Low,
        }
    }

    pub fn recoverable(self) -> bool {
        self.recovery().is_some()
    }

    pub fn recovery(self) -> Option<RecoveryStrategy> {
        use ErrorCategory::*;
        match self {
            Parsing => Some(RecoveryStrategy::FallbackToTextual),
            Timeout => Some(RecoveryStrategy::RetryWithLongerDeadline),
            Network => Some(RecoveryStrategy::RetryAfterDelay),
            Memory => Some(RecoveryStrategy::ReduceScope),
            PatternReplace | MarkupTransform | BrowserApiGuard | FrameworkSpecific | Testing => {
                Some(RecoveryStrategy::SkipProblematicPatterns)
            }
            Syntax | Filesystem | ConfigFormat | Unknown => None,
        }
    }

    /// One-line human remediation hint (spec.md §4.8 "remediation hint").
    pub fn remediation_hint(self) -> &'static str {
        use ErrorCategory::*;
        match self {
            Syntax => "fix the pre-existing syntax error before retrying",
            Parsing => "the structural parser could not handle this input; the textual path will be used instead",
            Filesystem => "no filesystem access is available to the engine; this indicates a misconfigured transformer",
            Timeout => "increase the per-layer deadline or reduce the input size",
            Memory => "reduce input size or scope to fewer layers",
            Network => "retry after a short delay; the engine performs no network access itself",
            ConfigFormat => "check the configuration-layer fingerprints this source matched",
            PatternReplace => "a textual pattern fix failed; review the offending substring",
            MarkupTransform => "a component-layer markup rewrite failed; review the JSX shape",
            BrowserApiGuard => "a hydration guard rewrite failed; review the browser API call site",
            FrameworkSpecific => "a framework-specific rewrite failed; the layer was skipped",
            Testing => "a quality/testing rewrite failed; the layer was skipped",
            Unknown => "no further information is available for this failure",
        }
    }

    /// Ordered recovery-option labels (spec.md §4.8 "small ordered list of
    /// recovery options").
    pub fn recovery_options(self) -> Vec<&'static str> {
        let mut options = Vec::new();
        if let Some(strategy) = self.recovery() {
            options.push(match strategy {
                RecoveryStrategy::FallbackToTextual => "retry with the textual transformer",
                RecoveryStrategy::RetryWithLongerDeadline => "retry with a longer deadline",
                RecoveryStrategy::RetryAfterDelay => "retry after a short delay",
                RecoveryStrategy::ReduceScope => "reduce the requested layer scope",
                RecoveryStrategy::SkipProblematicPatterns => "skip this layer and continue",
            });
        }
        options.push("skip this layer and continue");
        options.dedup();
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}
