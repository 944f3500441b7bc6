//! Engine configuration (SPEC_FULL.md §10.1), following the teacher's
//! `ScanConfig` shape: `Option<T>` fields with `effective_*()` accessors
//! that default sensibly, so a caller can override exactly one knob
//! without restating the rest. Loading this from a file or environment is
//! out of scope (spec.md §1); this is a plain value the embedder builds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one `Orchestrator` instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of entries retained in the result cache. Default: 100
    /// (spec.md §3 `CacheEntry`, "LRU-bounded at N entries (default 100)").
    pub cache_capacity: Option<u64>,
    /// Default per-layer deadline in milliseconds, used when a layer's own
    /// `LayerSpec::deadline` is not overridden by
    /// `options.deadline_per_layer_override`.
    pub default_layer_deadline_ms: Option<u64>,
    /// Optional global deadline for one `execute` call (spec.md §5).
    pub global_deadline_ms: Option<u64>,
    /// Source length, in bytes, above which `Pipeline` retains only hashes
    /// and line-count deltas instead of full code per state (spec.md
    /// §4.7). Default: 1 MiB.
    pub large_source_threshold_bytes: Option<u64>,
}

impl EngineConfig {
    pub fn effective_cache_capacity(&self) -> u64 {
        self.cache_capacity.unwrap_or(100)
    }

    pub fn effective_default_layer_deadline(&self) -> Duration {
        Duration::from_millis(self.default_layer_deadline_ms.unwrap_or(500))
    }

    pub fn effective_global_deadline(&self) -> Option<Duration> {
        self.global_deadline_ms.map(Duration::from_millis)
    }

    pub fn effective_large_source_threshold(&self) -> u64 {
        self.large_source_threshold_bytes.unwrap_or(1_048_576)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.effective_cache_capacity(), 100);
        assert_eq!(cfg.effective_large_source_threshold(), 1_048_576);
        assert_eq!(cfg.effective_global_deadline(), None);
    }

    #[test]
    fn serde_roundtrip_with_partial_overrides() {
        let json = r#"{"cache_capacity": 50}"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.effective_cache_capacity(), 50);
        assert_eq!(cfg.effective_default_layer_deadline().as_millis(), 500);
    }
}
