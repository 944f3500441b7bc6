//! `Orchestrator` (spec.md §4.1): drives the per-layer loop — pre-check
//! skip, run, validate, accept-or-revert, record state, classify errors.
//! Grounded on the teacher's `engine::pipeline::AnalysisPipeline` for the
//! "owns the collaborators, drives one pass end to end" shape, generalised
//! from a fixed 4-phase analysis into a variable-length, revertible layer
//! loop over caller-supplied transformers.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use layerforge_core::{
    dependency_closure, hash_code, EngineConfig, EngineError, ErrorCategory, LayerId,
};
use smallvec::{smallvec, SmallVec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::cache::{make_key, CacheEntry, CacheMetadata, ResultCache};
use crate::classify::ErrorClassifier;
use crate::detect::IssueDetector;
use crate::parser::Parser;
use crate::pipeline::{Outcome, Pipeline, PipelineSummary};
use crate::runner::{LayerRunner, LayerTransformers, PathTaken, RunError};
use crate::select::{LayerSelector, Recommendation};
use crate::validate::{CorruptionDetector, IntegrityChecker, SyntaxValidator};

/// `{use_cache, skip_unnecessary, smart_selection, deadline_per_layer_override}`
/// (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub use_cache: bool,
    pub skip_unnecessary: bool,
    pub smart_selection: bool,
    pub deadline_per_layer_override: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            skip_unnecessary: true,
            smart_selection: false,
            deadline_per_layer_override: None,
            cancellation: CancellationToken::new(),
        }
    }
}

/// One `per_layer` entry of the result envelope (spec.md §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LayerOutcome {
    pub layer_id: LayerId,
    pub outcome: String,
    pub duration_ms: u64,
    pub change_count: usize,
    /// Usually zero or one entry per layer, hence the inline-capacity-2
    /// `SmallVec` (mirrors the teacher's `cwe_ids`/`strategies` fields).
    pub improvements: SmallVec<[String; 2]>,
    /// Which code path produced this layer's candidate text; `None` when
    /// no run was attempted (skipped) or none completed (failed before
    /// producing a candidate). A `StructuralPreferred` layer resolving to
    /// `TextualFallback` is a recoverable event, not an error, but callers
    /// still need to see it happened (spec.md §4.2).
    pub path: Option<PathTaken>,
    pub error_category: Option<ErrorCategory>,
    pub error_message: Option<String>,
    pub suggestions: Option<Vec<String>>,
}

pub type Summary = PipelineSummary;

/// The result envelope (spec.md §3 `OrchestrationResult`, §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrchestrationResult {
    pub success: bool,
    pub final_code: String,
    pub cache_hit: bool,
    pub elapsed_ms: u64,
    pub per_layer: Vec<LayerOutcome>,
    pub summary: Summary,
    pub improvements: Vec<String>,
    pub recommendation: Option<Recommendation>,
}

/// `metrics()`'s shape (spec.md §6).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Metrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_executions: u64,
    pub average_elapsed_ms: f64,
    pub success_rate: f64,
}

#[derive(Default)]
struct MetricsState {
    cache_hits: u64,
    cache_misses: u64,
    total_executions: u64,
    total_elapsed_ms: u64,
    total_successes: u64,
}

/// Drives one layer-orchestration run at a time per call; owns its
/// collaborators (cache, detector, validators, classifier) and the
/// caller-injected transformers and parser (spec.md §1, §9 "all mutable
/// state lives behind explicit interfaces the Orchestrator receives at
/// construction").
pub struct Orchestrator {
    config: EngineConfig,
    parser: Arc<dyn Parser>,
    transformers: rustc_hash::FxHashMap<LayerId, LayerTransformers>,
    cache: ResultCache,
    detector: IssueDetector,
    corruption: CorruptionDetector,
    integrity: IntegrityChecker,
    classifier: ErrorClassifier,
    metrics: Mutex<MetricsState>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        parser: Arc<dyn Parser>,
        transformers: rustc_hash::FxHashMap<LayerId, LayerTransformers>,
    ) -> Self {
        let cache = ResultCache::new(config.effective_cache_capacity());
        Self {
            config,
            parser,
            transformers,
            cache,
            detector: IssueDetector::new(),
            corruption: CorruptionDetector::new(),
            integrity: IntegrityChecker::new(),
            classifier: ErrorClassifier::new(),
            metrics: Mutex::new(MetricsState::default()),
        }
    }

    /// `analyse(source) -> Recommendation` (spec.md §4.6, §6).
    pub fn analyse(&self, source: &str) -> Recommendation {
        LayerSelector::new(&self.detector).recommend(source)
    }

    /// `execute(source, requested_layers, options) -> OrchestrationResult`
    /// (spec.md §4.1). `requested_layers` are raw layer numbers so an
    /// unknown id can be rejected as `InvalidRequest` rather than refused
    /// at the type level before the caller even gets a diagnostic.
    pub async fn execute(
        &self,
        source: &str,
        requested_layers: &[u8],
        options: ExecuteOptions,
    ) -> Result<OrchestrationResult, EngineError> {
        let start = Instant::now();
        let requested = parse_requested(requested_layers)?;
        let (layers, warnings) = self.resolve_layers(source, &requested, &options);
        for warning in &warnings {
            debug!(%warning, "layer auto-added by dependency closure");
        }

        let pre_skipped = self.pre_skip(source, &layers, &options);

        let source_hash = hash_code(source);
        let cache_key = make_key(source_hash, &layers.iter().copied().collect());
        if options.use_cache {
            if let Some(entry) = self.cache.get(&cache_key) {
                debug!(hash = %source_hash, "cache hit");
                self.record_cache_hit();
                return Ok(OrchestrationResult {
                    success: true,
                    final_code: entry.value,
                    cache_hit: true,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    per_layer: Vec::new(),
                    summary: Summary::default(),
                    improvements: Vec::new(),
                    recommendation: None,
                });
            }
        }
        self.record_cache_miss();

        let mut pipeline = Pipeline::new(source, self.config.effective_large_source_threshold() as usize);
        let mut current = source.to_string();
        let mut per_layer = Vec::new();
        let mut improvements: Vec<String> = Vec::new();
        let mut aborted = false;

        let runner = LayerRunner::new(self.parser.as_ref());
        let syntax = SyntaxValidator::new(self.parser.as_ref());
        let global_deadline = self.config.effective_global_deadline();
        let mut deadline_expired = false;

        for layer in layers.iter().copied() {
            if let Some(global) = global_deadline {
                if start.elapsed() >= global {
                    warn!(elapsed_ms = start.elapsed().as_millis() as u64, "global deadline expired between layers");
                    deadline_expired = true;
                    break;
                }
            }

            if options.cancellation.is_cancelled() {
                pipeline.append(Some(layer), current.clone(), Outcome::Skipped { reason: "cancelled".to_string() }, Duration::ZERO);
                per_layer.push(skipped_outcome(layer, "orchestration cancelled"));
                break;
            }

            if pre_skipped.contains(&layer) {
                pipeline.append(Some(layer), current.clone(), Outcome::Skipped { reason: "no fingerprint present".to_string() }, Duration::ZERO);
                per_layer.push(skipped_outcome(layer, "no fingerprint present"));
                continue;
            }

            let Some(transformers) = self.transformers.get(&layer) else {
                return Err(EngineError::Internal(format!(
                    "no transformer registered for layer {}",
                    layer.as_u8()
                )));
            };
            let deadline = options.deadline_per_layer_override.unwrap_or_else(|| layer.default_deadline());
            let step_start = Instant::now();

            match runner.run(layer, &current, transformers, deadline, &options.cancellation).await {
                Ok(run_outcome) => {
                    let verdict = self.validate_delta(&syntax, &current, &run_outcome.text);
                    let duration = step_start.elapsed();
                    if verdict.must_revert {
                        let reason = verdict.reason.unwrap_or_else(|| "validation failed".to_string());
                        warn!(layer = layer.name(), %reason, "reverting layer");
                        pipeline.append(Some(layer), current.clone(), Outcome::Reverted { reason: reason.clone() }, duration);
                        per_layer.push(LayerOutcome {
                            layer_id: layer,
                            outcome: "reverted".to_string(),
                            duration_ms: duration.as_millis() as u64,
                            change_count: 0,
                            improvements: SmallVec::new(),
                            path: Some(run_outcome.path),
                            error_category: None,
                            error_message: Some(reason),
                            suggestions: None,
                        });
                    } else {
                        let changes = change_count(&current, &run_outcome.text);
                        let path = run_outcome.path;
                        current = run_outcome.text;
                        debug!(layer = layer.name(), changes, fallback = path == PathTaken::TextualFallback, "layer accepted");
                        pipeline.append(Some(layer), current.clone(), Outcome::Accepted { change_count: changes }, duration);
                        let layer_improvements: SmallVec<[String; 2]> =
                            smallvec![format!("{}: {} change(s) applied", layer.name(), changes)];
                        improvements.extend(layer_improvements.iter().cloned());
                        per_layer.push(LayerOutcome {
                            layer_id: layer,
                            outcome: "accepted".to_string(),
                            duration_ms: duration.as_millis() as u64,
                            change_count: changes,
                            improvements: layer_improvements,
                            path: Some(path),
                            error_category: None,
                            error_message: None,
                            suggestions: None,
                        });
                    }
                }
                Err(err) => {
                    let duration = step_start.elapsed();
                    let category = match &err {
                        RunError::Transform(e) => self.classifier.classify_transform_error(e, layer),
                        RunError::Engine(e) => self.classifier.classify_engine_error(e),
                    };
                    let message = err.to_string();
                    error!(layer = layer.name(), error = %message, critical = layer.is_critical(), "layer failed");
                    pipeline.append(Some(layer), current.clone(), Outcome::Failed { error: message.clone() }, duration);
                    per_layer.push(LayerOutcome {
                        layer_id: layer,
                        outcome: "failed".to_string(),
                        duration_ms: duration.as_millis() as u64,
                        change_count: 0,
                        improvements: SmallVec::new(),
                        path: None,
                        error_category: Some(category),
                        error_message: Some(message),
                        suggestions: Some(category.recovery_options().into_iter().map(str::to_string).collect()),
                    });
                    if layer.is_critical() {
                        aborted = true;
                        break;
                    }
                }
            }
        }

        // spec.md §7: `success` flips to false only on a critical-layer
        // failure (or an aborted/empty run), never on an ordinary
        // non-critical layer failure — `aborted` is only ever set on the
        // critical-failure path above. Caching a result is a stricter
        // rule: any failure at all, critical or not, disqualifies it.
        let any_failed = per_layer.iter().any(|l| l.outcome == "failed");
        let success = !aborted && !deadline_expired && !per_layer.is_empty();

        if success && !any_failed {
            let any_accepted = per_layer.iter().any(|l| l.outcome == "accepted");
            if any_accepted {
                self.cache.insert(
                    cache_key,
                    CacheEntry {
                        value: current.clone(),
                        metadata: CacheMetadata {
                            layers_applied: layers.clone(),
                            total_changes: pipeline.summary().total_changes,
                        },
                    },
                );
            }
        }

        let elapsed = start.elapsed();
        self.record_execution(success, elapsed);

        Ok(OrchestrationResult {
            success,
            final_code: current,
            cache_hit: false,
            elapsed_ms: elapsed.as_millis() as u64,
            per_layer,
            summary: pipeline.summary(),
            improvements,
            recommendation: None,
        })
    }

    /// `execute_batch(inputs, options) -> [OrchestrationResult]` (spec.md
    /// §6), parallelised across inputs with one `tokio::task::JoinSet`
    /// task per input (SPEC_FULL.md §5).
    pub async fn execute_batch(
        self: &Arc<Self>,
        inputs: Vec<String>,
        options: ExecuteOptions,
    ) -> Vec<Result<OrchestrationResult, EngineError>> {
        let mut set = tokio::task::JoinSet::new();
        let total = inputs.len();
        for (index, input) in inputs.into_iter().enumerate() {
            let orchestrator = Arc::clone(self);
            let options = options.clone();
            set.spawn(async move {
                let result = orchestrator.execute(&input, &[], options).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<OrchestrationResult, EngineError>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (index, result) = joined.expect("execute_batch task panicked");
            results[index] = Some(result);
        }
        results
            .into_iter()
            .map(|entry| entry.expect("every spawned batch index is filled exactly once"))
            .collect()
    }

    pub fn metrics(&self) -> Metrics {
        let state = self.metrics.lock().expect("metrics mutex poisoned");
        let average_elapsed_ms = if state.total_executions > 0 {
            state.total_elapsed_ms as f64 / state.total_executions as f64
        } else {
            0.0
        };
        let success_rate = if state.total_executions > 0 {
            state.total_successes as f64 / state.total_executions as f64
        } else {
            0.0
        };
        Metrics {
            cache_hits: state.cache_hits,
            cache_misses: state.cache_misses,
            total_executions: state.total_executions,
            average_elapsed_ms,
            success_rate,
        }
    }

    /// Empties the Cache and metrics (spec.md §6 `reset`).
    pub fn reset(&self) {
        self.cache.invalidate_all();
        let mut state = self.metrics.lock().expect("metrics mutex poisoned");
        *state = MetricsState::default();
    }

    fn resolve_layers(
        &self,
        source: &str,
        requested: &BTreeSet<LayerId>,
        options: &ExecuteOptions,
    ) -> (Vec<LayerId>, Vec<String>) {
        let mut warnings = Vec::new();
        let chosen: BTreeSet<LayerId> = if requested.is_empty() {
            if options.smart_selection {
                LayerSelector::new(&self.detector).recommend(source).layers.into_iter().collect()
            } else {
                BTreeSet::from([LayerId::Configuration, LayerId::Patterns, LayerId::Components, LayerId::Hydration])
            }
        } else {
            requested.clone()
        };
        let (closure, auto_added) = dependency_closure(&chosen);
        for layer in &auto_added {
            warnings.push(format!("layer {} auto-added as a dependency", layer.as_u8()));
        }
        (closure.into_iter().collect(), warnings)
    }

    fn pre_skip(&self, source: &str, layers: &[LayerId], options: &ExecuteOptions) -> BTreeSet<LayerId> {
        let mut pre_skipped = BTreeSet::new();
        if !options.skip_unnecessary {
            return pre_skipped;
        }
        for &layer in layers {
            if layer == LayerId::Configuration {
                continue;
            }
            if !self.detector.has_fingerprint(source, layer) {
                pre_skipped.insert(layer);
            }
        }
        pre_skipped
    }

    fn validate_delta(&self, syntax: &SyntaxValidator<'_>, before: &str, after: &str) -> crate::validate::Verdict {
        let verdict = syntax.check_delta(before, after);
        if verdict.must_revert {
            return verdict;
        }
        let verdict = self.corruption.check(before, after);
        if verdict.must_revert {
            return verdict;
        }
        self.integrity.check(before, after)
    }

    fn record_cache_hit(&self) {
        self.metrics.lock().expect("metrics mutex poisoned").cache_hits += 1;
    }

    fn record_cache_miss(&self) {
        self.metrics.lock().expect("metrics mutex poisoned").cache_misses += 1;
    }

    fn record_execution(&self, success: bool, elapsed: Duration) {
        let mut state = self.metrics.lock().expect("metrics mutex poisoned");
        state.total_executions += 1;
        state.total_elapsed_ms += elapsed.as_millis() as u64;
        if success {
            state.total_successes += 1;
        }
    }
}

fn parse_requested(raw: &[u8]) -> Result<BTreeSet<LayerId>, EngineError> {
    raw.iter()
        .map(|&id| LayerId::from_u8(id).ok_or(EngineError::InvalidRequestUnknownLayer(id)))
        .collect()
}

fn skipped_outcome(layer: LayerId, reason: &str) -> LayerOutcome {
    LayerOutcome {
        layer_id: layer,
        outcome: "skipped".to_string(),
        duration_ms: 0,
        change_count: 0,
        improvements: SmallVec::new(),
        path: None,
        error_category: None,
        error_message: Some(reason.to_string()),
        suggestions: None,
    }
}

/// `|Δlines| + mismatched-line-count` (spec.md §9 open question 2).
fn change_count(before: &str, after: &str) -> usize {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();
    let delta_lines = (before_lines.len() as i64 - after_lines.len() as i64).unsigned_abs() as usize;
    let mismatched = before_lines
        .iter()
        .zip(after_lines.iter())
        .filter(|(a, b)| a != b)
        .count();
    delta_lines + mismatched
}
