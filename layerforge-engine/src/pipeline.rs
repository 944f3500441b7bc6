//! `Pipeline` (spec.md §3 `PipelineState`/`Pipeline`, §4.7): an append-only
//! history of states for one orchestration call, with rollback and diff.
//! Grounded on the teacher's `engine::pipeline::AnalysisPipeline` for the
//! "owns one mutable run, exposes append + summarise" shape, adapted from a
//! 4-phase analysis pass into a per-layer state log.

use std::time::Duration;

use layerforge_core::{hash_code, CodeHash, LayerId};

/// What happened at one step of the pipeline (spec.md §3 `PipelineState.outcome`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Outcome {
    Initial,
    Accepted { change_count: usize },
    Reverted { reason: String },
    Failed { error: String },
    Skipped { reason: String },
    Rolledback { target_step: usize },
}

/// One entry in the pipeline's append-only log (spec.md §3 `PipelineState`).
/// `code` is `None` once a large-source state has been compacted (spec.md
/// §4.7): the hash and line count survive, the text does not.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineState {
    pub step: usize,
    pub layer: Option<LayerId>,
    pub code: Option<String>,
    pub line_count: usize,
    pub code_hash: CodeHash,
    pub outcome: Outcome,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl PipelineState {
    fn new(step: usize, layer: Option<LayerId>, code: String, outcome: Outcome, duration: Duration) -> Self {
        let code_hash = hash_code(&code);
        let line_count = code.lines().count();
        Self {
            step,
            layer,
            code: Some(code),
            line_count,
            code_hash,
            outcome,
            duration,
        }
    }
}

mod duration_millis {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// One line-level record in a `diff` result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LineDiff {
    Added { line: usize, text: String },
    Removed { line: usize, text: String },
    Modified { line: usize, before: String, after: String },
}

/// `export()`'s shape (spec.md §4.7 "structured, without raw code, for
/// observability"): hashes and line-count deltas only, never the full text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedState {
    pub step: usize,
    pub layer: Option<LayerId>,
    pub code_hash: String,
    pub line_count: usize,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Aggregate counts over one pipeline's states (spec.md §6 `summary`).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PipelineSummary {
    pub total_layers: usize,
    pub successful: usize,
    pub failed: usize,
    pub reverted: usize,
    pub skipped: usize,
    pub total_changes: usize,
}

/// An append-only log of `PipelineState`s for one `execute` call (spec.md
/// §3 `Pipeline`). Owned by a single orchestration; the only legal way to
/// move `current_code()` backwards is the explicit `rollback_to`, which
/// still only ever appends (spec.md §3 invariant).
pub struct Pipeline {
    states: Vec<PipelineState>,
    large_source_threshold: usize,
}

impl Pipeline {
    /// Start a pipeline with `source` as step 0's `Initial` state (spec.md
    /// §3 invariant `state[0].outcome = Initial`).
    pub fn new(source: &str, large_source_threshold: usize) -> Self {
        let mut pipeline = Self {
            states: Vec::new(),
            large_source_threshold,
        };
        pipeline.push_retaining(None, source.to_string(), Outcome::Initial, Duration::ZERO);
        pipeline
    }

    fn push_retaining(&mut self, layer: Option<LayerId>, code: String, outcome: Outcome, duration: Duration) {
        let over_threshold = code.len() > self.large_source_threshold;
        let step = self.states.len();
        self.states.push(PipelineState::new(step, layer, code, outcome, duration));
        if over_threshold {
            // Large-source mode (spec.md §4.7): compact every state this
            // one superseded down to its hash and line count. The new
            // state keeps its text so `current_code`/`rollback_to` still
            // work off the latest step; only history behind it is dropped.
            for state in &mut self.states[..step] {
                state.code = None;
            }
        }
    }

    /// Append a new state. `step` is assigned as the next index (spec.md §3
    /// "every state references the prior step").
    pub fn append(&mut self, layer: Option<LayerId>, code: String, outcome: Outcome, duration: Duration) {
        self.push_retaining(layer, code, outcome, duration);
    }

    /// The pipeline's current code: always the latest
    /// `Accepted`/`Initial`/`Rolledback` state's code, never a `Reverted`/
    /// `Failed` candidate (spec.md §3 invariant, §8 invariant 1).
    pub fn current_code(&self) -> &str {
        self.states
            .iter()
            .rev()
            .find(|state| {
                matches!(
                    state.outcome,
                    Outcome::Initial | Outcome::Accepted { .. } | Outcome::Rolledback { .. }
                )
            })
            .and_then(|state| state.code.as_deref())
            .unwrap_or("")
    }

    pub fn states(&self) -> &[PipelineState] {
        &self.states
    }

    pub fn latest_step(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    /// Jump current code back to an earlier accepted/initial state by
    /// appending a new `Rolledback` entry (spec.md §4.7 `rollback_to`).
    /// Returns the restored code.
    pub fn rollback_to(&mut self, step: usize) -> Option<String> {
        let target = self.states.get(step)?;
        if !matches!(
            target.outcome,
            Outcome::Initial | Outcome::Accepted { .. } | Outcome::Rolledback { .. }
        ) {
            return None;
        }
        let code = target.code.clone()?;
        self.append(None, code.clone(), Outcome::Rolledback { target_step: step }, Duration::ZERO);
        Some(code)
    }

    /// Line-level diff between two steps (spec.md §4.7 `diff`). `None` if
    /// either step's text has been compacted out of a large-source history.
    pub fn diff(&self, step_a: usize, step_b: usize) -> Option<Vec<LineDiff>> {
        let a = self.states.get(step_a)?;
        let b = self.states.get(step_b)?;
        Some(diff_lines(a.code.as_deref()?, b.code.as_deref()?))
    }

    pub fn summary(&self) -> PipelineSummary {
        let mut summary = PipelineSummary::default();
        for state in &self.states {
            match &state.outcome {
                Outcome::Initial | Outcome::Rolledback { .. } => {}
                Outcome::Accepted { change_count } => {
                    summary.total_layers += 1;
                    summary.successful += 1;
                    summary.total_changes += change_count;
                }
                Outcome::Reverted { .. } => {
                    summary.total_layers += 1;
                    summary.reverted += 1;
                }
                Outcome::Failed { .. } => {
                    summary.total_layers += 1;
                    summary.failed += 1;
                }
                Outcome::Skipped { .. } => {
                    summary.total_layers += 1;
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    /// A structured export omitting raw code (spec.md §4.7 `export`, §6
    /// logging principle).
    pub fn export(&self) -> Vec<ExportedState> {
        self.states
            .iter()
            .map(|state| ExportedState {
                step: state.step,
                layer: state.layer,
                code_hash: state.code_hash.to_base36(),
                line_count: state.line_count,
                outcome: state.outcome.clone(),
                duration_ms: state.duration.as_millis() as u64,
            })
            .collect()
    }
}

fn diff_lines(before: &str, after: &str) -> Vec<LineDiff> {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();
    let max_len = before_lines.len().max(after_lines.len());
    let mut diffs = Vec::new();
    for i in 0..max_len {
        match (before_lines.get(i), after_lines.get(i)) {
            (Some(b), Some(a)) if b != a => diffs.push(LineDiff::Modified {
                line: i,
                before: b.to_string(),
                after: a.to_string(),
            }),
            (Some(_), Some(_)) => {}
            (None, Some(a)) => diffs.push(LineDiff::Added { line: i, text: a.to_string() }),
            (Some(b), None) => diffs.push(LineDiff::Removed { line: i, text: b.to_string() }),
            (None, None) => {}
        }
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_step_zero() {
        let pipeline = Pipeline::new("const x = 1;", 1_048_576);
        assert_eq!(pipeline.states()[0].outcome, Outcome::Initial);
        assert_eq!(pipeline.current_code(), "const x = 1;");
    }

    #[test]
    fn reverted_candidate_never_becomes_current() {
        let mut pipeline = Pipeline::new("const x = 1;", 1_048_576);
        pipeline.append(
            Some(LayerId::Patterns),
            "const x = 1; /* corrupted */".to_string(),
            Outcome::Reverted { reason: "corruption".to_string() },
            Duration::ZERO,
        );
        assert_eq!(pipeline.current_code(), "const x = 1;");
    }

    #[test]
    fn rollback_appends_rather_than_truncates() {
        let mut pipeline = Pipeline::new("const x = 1;", 1_048_576);
        pipeline.append(
            Some(LayerId::Patterns),
            "const x = 2;".to_string(),
            Outcome::Accepted { change_count: 1 },
            Duration::ZERO,
        );
        let restored = pipeline.rollback_to(0).expect("step 0 is initial");
        assert_eq!(restored, "const x = 1;");
        assert_eq!(pipeline.current_code(), "const x = 1;");
        assert_eq!(pipeline.states().len(), 3);
    }

    #[test]
    fn summary_counts_each_outcome_kind() {
        let mut pipeline = Pipeline::new("a", 1_048_576);
        pipeline.append(Some(LayerId::Configuration), "a".to_string(), Outcome::Skipped { reason: "no fingerprint".to_string() }, Duration::ZERO);
        pipeline.append(Some(LayerId::Patterns), "b".to_string(), Outcome::Accepted { change_count: 1 }, Duration::ZERO);
        pipeline.append(Some(LayerId::Components), "b".to_string(), Outcome::Reverted { reason: "corruption".to_string() }, Duration::ZERO);
        let summary = pipeline.summary();
        assert_eq!(summary.total_layers, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.reverted, 1);
    }

    #[test]
    fn export_omits_raw_code() {
        let pipeline = Pipeline::new("const x = 1;", 1_048_576);
        let exported = pipeline.export();
        assert_eq!(exported[0].line_count, 1);
        assert!(!exported[0].code_hash.is_empty());
    }
}
