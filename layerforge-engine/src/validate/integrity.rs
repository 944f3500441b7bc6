//! `IntegrityChecker` (spec.md §4.5): compares import statements in
//! `before` and `after`; flags the removal of any statement whose
//! target-identifier set intersects a distinguished critical-identifiers
//! list.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::Verdict;

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s*(?:\{([^}]*)\}|(\w+))\s*from\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

fn bound_identifiers(line: &str) -> HashSet<String> {
    let mut ids = HashSet::new();
    if let Some(caps) = IMPORT_LINE.captures(line) {
        if let Some(named) = caps.get(1) {
            for part in named.as_str().split(',') {
                let name = part.split(" as ").next().unwrap_or("").trim();
                if !name.is_empty() {
                    ids.insert(name.to_string());
                }
            }
        }
        if let Some(default_name) = caps.get(2) {
            ids.insert(default_name.as_str().trim().to_string());
        }
    }
    ids
}

fn all_imported_identifiers(code: &str) -> HashSet<String> {
    code.lines().flat_map(|line| bound_identifiers(line)).collect()
}

/// Identifiers the corpus treats as framework-core: losing one of these
/// across a transform is never intentional for layers 1-6 (spec.md §4.5
/// "initially the common framework-core identifiers used by the corpus").
pub const DEFAULT_CRITICAL_IDENTIFIERS: &[&str] = &[
    "React", "useState", "useEffect", "useContext", "useMemo", "useCallback",
    "useRef", "Component", "createContext", "forwardRef",
];

pub struct IntegrityChecker {
    critical_identifiers: HashSet<String>,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            critical_identifiers: DEFAULT_CRITICAL_IDENTIFIERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_critical_identifiers(identifiers: impl IntoIterator<Item = String>) -> Self {
        Self {
            critical_identifiers: identifiers.into_iter().collect(),
        }
    }

    pub fn check(&self, before: &str, after: &str) -> Verdict {
        let before_ids = all_imported_identifiers(before);
        let after_ids = all_imported_identifiers(after);
        let lost: Vec<String> = before_ids
            .difference(&after_ids)
            .filter(|id| self.critical_identifiers.contains(*id))
            .cloned()
            .collect();
        if lost.is_empty() {
            Verdict::ok()
        } else {
            let mut sorted = lost;
            sorted.sort();
            Verdict::revert(format!("lost critical import(s): {}", sorted.join(", ")))
        }
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_dropped_critical_import() {
        let checker = IntegrityChecker::new();
        let before = "import React, { useState } from 'react';\nconst x = useState(1);";
        let after = "const x = useState(1);";
        let verdict = checker.check(before, after);
        assert!(verdict.must_revert);
    }

    #[test]
    fn ignores_dropped_noncritical_import() {
        let checker = IntegrityChecker::new();
        let before = "import { leftPad } from 'left-pad';\nconst x = 1;";
        let after = "const x = 1;";
        let verdict = checker.check(before, after);
        assert!(!verdict.must_revert);
    }

    #[test]
    fn unchanged_imports_pass() {
        let checker = IntegrityChecker::new();
        let code = "import React from 'react';\nconst x = 1;";
        let verdict = checker.check(code, code);
        assert!(!verdict.must_revert);
    }
}
