//! `IssueDetector` (spec.md §4.6): scans source for fingerprints of
//! fixable issues per layer. Grounded on the teacher's
//! `engine::regex_engine::RegexEngine` — a named pattern catalogue with a
//! category and confidence tag per entry — adapted so each fingerprint is
//! keyed by `LayerId` rather than `PatternCategory`, and literal
//! substrings run through `aho-corasick` instead of `regex` the way the
//! teacher's `DetectionContext` fast-paths literal matches ahead of the
//! regex pass.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use layerforge_core::LayerId;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One detected fingerprint (spec.md §3 `Issue`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Issue {
    pub layer: LayerId,
    pub severity: Severity,
    pub kind: String,
    pub description: String,
    pub occurrences: usize,
}

struct LiteralFingerprint {
    layer: LayerId,
    severity: Severity,
    kind: &'static str,
    description: &'static str,
    needles: &'static [&'static str],
}

struct RegexFingerprint {
    layer: LayerId,
    severity: Severity,
    kind: &'static str,
    description: &'static str,
    regex: &'static LazyLock<Regex>,
}

static HTML_ENTITIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(quot|amp|lt|gt|apos|nbsp);").expect("valid regex"));
static MAP_OPENING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.map\s*\(\s*\w*\s*=>\s*<[A-Za-z][\w.]*([^>]*)>").expect("valid regex")
});
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<img([^>]*)/?>").expect("valid regex"));
static HOOK_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(useState|useEffect|useContext|useMemo|useCallback|useRef)\s*\(").expect("valid regex"));
static BROWSER_API: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(localStorage|sessionStorage|window\.\w+|document\.\w+)\b").expect("valid regex")
});
static TYPEOF_GUARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"typeof\s+window").expect("valid regex"));
static FRAMEWORK_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"from\s+['"]next/(head|router|image|link|script)['"]"#).expect("valid regex")
});
static CONFIG_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(module\.exports|export\s+default\s+defineConfig|next\.config|tsconfig)").expect("valid regex")
});

fn literal_fingerprints() -> &'static [LiteralFingerprint] {
    static FP: LazyLock<Vec<LiteralFingerprint>> = LazyLock::new(|| {
        vec![
            LiteralFingerprint {
                layer: LayerId::Patterns,
                severity: Severity::Low,
                kind: "legacy_var_binder",
                description: "legacy `var` binder found; prefer `let`/`const`",
                needles: &["var "],
            },
            LiteralFingerprint {
                layer: LayerId::Patterns,
                severity: Severity::Low,
                kind: "debug_log_call",
                description: "debug logging call site found",
                needles: &["console.log(", "console.debug("],
            },
            LiteralFingerprint {
                layer: LayerId::TestingQuality,
                severity: Severity::Low,
                kind: "test_harness_call",
                description: "test-harness call site found",
                needles: &["describe(", "it(", "test(", "expect("],
            },
        ]
    });
    &FP
}

fn regex_fingerprints() -> &'static [RegexFingerprint] {
    static FP: LazyLock<Vec<RegexFingerprint>> = LazyLock::new(|| {
        vec![
            RegexFingerprint {
                layer: LayerId::Configuration,
                severity: Severity::Medium,
                kind: "configuration_marker",
                description: "configuration file marker found",
                regex: &CONFIG_MARKER,
            },
            RegexFingerprint {
                layer: LayerId::Patterns,
                severity: Severity::Medium,
                kind: "html_entities",
                description: "HTML-entity sequence found where a literal string was likely intended",
                regex: &HTML_ENTITIES,
            },
            RegexFingerprint {
                layer: LayerId::Hydration,
                severity: Severity::High,
                kind: "unguarded_browser_api",
                description: "browser-only API used without a `typeof window` guard",
                regex: &BROWSER_API,
            },
            RegexFingerprint {
                layer: LayerId::FrameworkSpecific,
                severity: Severity::Low,
                kind: "framework_module_import",
                description: "framework-specific module import found",
                regex: &FRAMEWORK_IMPORT,
            },
        ]
    });
    &FP
}

pub struct IssueDetector;

impl IssueDetector {
    pub fn new() -> Self {
        Self
    }

    /// Scan `code` with the fixed fingerprint catalogue, producing one
    /// `Issue` per (layer, kind) pair that matched at least once.
    pub fn scan(&self, code: &str) -> Vec<Issue> {
        let mut issues = Vec::new();

        for fp in literal_fingerprints() {
            let ac = AhoCorasick::new(fp.needles).expect("valid literal fingerprint set");
            let occurrences = ac.find_iter(code).count();
            if occurrences > 0 {
                issues.push(Issue {
                    layer: fp.layer,
                    severity: fp.severity,
                    kind: fp.kind.to_string(),
                    description: fp.description.to_string(),
                    occurrences,
                });
            }
        }

        for fp in regex_fingerprints() {
            let occurrences = fp.regex.find_iter(code).count();
            if occurrences > 0 {
                issues.push(Issue {
                    layer: fp.layer,
                    severity: fp.severity,
                    kind: fp.kind.to_string(),
                    description: fp.description.to_string(),
                    occurrences,
                });
            }
        }

        let img_missing_alt = IMG_TAG
            .captures_iter(code)
            .filter(|caps| !caps.get(1).map(|m| m.as_str().contains("alt=")).unwrap_or(false))
            .count();
        if img_missing_alt > 0 {
            issues.push(Issue {
                layer: LayerId::Components,
                severity: Severity::Medium,
                kind: "img_missing_alt".to_string(),
                description: "image markup missing an accessibility `alt` attribute".to_string(),
                occurrences: img_missing_alt,
            });
        }

        // Collection-map markup without a `key` attribute: a regex can match
        // the opening tag, but "does this tag's attribute list contain
        // `key=`" needs a per-match check, not a single pattern (the regex
        // crate has no lookahead).
        let map_without_key = MAP_OPENING_TAG
            .captures_iter(code)
            .filter(|caps| !caps.get(1).map(|m| m.as_str().contains("key=")).unwrap_or(false))
            .count();
        if map_without_key > 0 {
            issues.push(Issue {
                layer: LayerId::Components,
                severity: Severity::High,
                kind: "map_without_key".to_string(),
                description: "collection map producing markup without a `key` attribute".to_string(),
                occurrences: map_without_key,
            });
        }

        // L3 hook-without-import is a two-sided fingerprint: a hook is
        // called but the React import line doesn't bind it.
        if HOOK_CALL.is_match(code) {
            let missing: Vec<&str> = ["useState", "useEffect", "useContext", "useMemo", "useCallback", "useRef"]
                .into_iter()
                .filter(|hook| code.contains(&format!("{hook}(")) && !code.contains(&format!("{{ {hook}")) && !code.contains(&format!(", {hook}")) && !code.contains(&format!("{{{hook}")))
                .collect();
            if !missing.is_empty() && !code.contains("from 'react'") && !code.contains("from \"react\"") {
                issues.push(Issue {
                    layer: LayerId::Components,
                    severity: Severity::High,
                    kind: "hook_without_import".to_string(),
                    description: format!("hook(s) used without a React import: {}", missing.join(", ")),
                    occurrences: missing.len(),
                });
            }
        }

        // The browser-API fingerprint only counts as an issue for layer 4
        // when no guard is already present — re-filter the raw match above.
        if let Some(pos) = issues.iter().position(|i| i.kind == "unguarded_browser_api") {
            if TYPEOF_GUARD.is_match(code) {
                issues.remove(pos);
            }
        }

        issues
    }

    /// Whether this layer has at least one fingerprint present — used by
    /// the orchestrator's `skip_unnecessary` pre-check (spec.md §4.1 step
    /// 2) and by `LayerSelector` (spec.md §4.6).
    pub fn has_fingerprint(&self, code: &str, layer: LayerId) -> bool {
        self.scan(code).iter().any(|issue| issue.layer == layer)
    }
}

impl Default for IssueDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_html_entities_and_var_binder() {
        let detector = IssueDetector::new();
        let issues = detector.scan(r#"const m = &quot;Hi&quot;; console.log(m); var x = 1;"#);
        assert!(issues.iter().any(|i| i.kind == "html_entities"));
        assert!(issues.iter().any(|i| i.kind == "legacy_var_binder"));
        assert!(issues.iter().any(|i| i.kind == "debug_log_call"));
    }

    #[test]
    fn detects_map_without_key() {
        let detector = IssueDetector::new();
        let code = "function L({items}){return (<ul>{items.map(i => <li>{i.name}</li>)}</ul>);}";
        assert!(detector.has_fingerprint(code, LayerId::Components));
    }

    #[test]
    fn detects_unguarded_browser_api() {
        let detector = IssueDetector::new();
        let code = r#"const v = localStorage.getItem("k");"#;
        assert!(detector.has_fingerprint(code, LayerId::Hydration));
    }

    #[test]
    fn guarded_browser_api_is_not_flagged() {
        let detector = IssueDetector::new();
        let code = r#"const v = typeof window !== "undefined" ? localStorage.getItem("k") : null;"#;
        assert!(!detector.has_fingerprint(code, LayerId::Hydration));
    }

    #[test]
    fn clean_source_has_no_issues() {
        let detector = IssueDetector::new();
        let issues = detector.scan("const x: number = 1;\nexport default x;\n");
        assert!(issues.is_empty());
    }
}
