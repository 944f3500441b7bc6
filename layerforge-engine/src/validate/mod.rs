//! The three independent validators the orchestrator runs on every
//! candidate transform (spec.md §4.1 step 4c, §4.3–§4.5).

pub mod corruption;
pub mod integrity;
pub mod syntax;

pub use corruption::CorruptionDetector;
pub use integrity::IntegrityChecker;
pub use syntax::SyntaxValidator;

/// The shared verdict shape all three validators reduce to when the
/// orchestrator decides whether to keep `next` or revert to `current`
/// (spec.md §4.1 step 4c: "If any reports `must_revert`...").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub must_revert: bool,
    pub reason: Option<String>,
}

impl Verdict {
    pub fn ok() -> Self {
        Self {
            must_revert: false,
            reason: None,
        }
    }

    pub fn revert(reason: impl Into<String>) -> Self {
        Self {
            must_revert: true,
            reason: Some(reason.into()),
        }
    }
}
