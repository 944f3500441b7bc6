//! `CorruptionDetector` (spec.md §4.4): a pattern-based heuristic checker,
//! invoked only when `before != after`. Grounded on the teacher's
//! `engine::regex_engine::RegexEngine` (a named `RegexPattern` catalogue
//! matched with compiled `regex::Regex`es), but restricted to the
//! "present after, absent before" semantics spec.md §9 open question 3
//! requires so a pattern can never flag corruption the transform did not
//! introduce.

use regex::Regex;
use std::sync::LazyLock;

use super::Verdict;

/// A single named bad-shape pattern.
struct CorruptionPattern {
    name: &'static str,
    regex: &'static LazyLock<Regex>,
}

static DOUBLED_HANDLER_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+=\{\([^()]*\)\s*=>\s*\(\)\s*=>").expect("valid regex")
});

static DOUBLE_IMPORT_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"import\s*\{[^}]*import\s*\{").expect("valid regex")
});

fn patterns() -> &'static [CorruptionPattern] {
    static PATTERNS: LazyLock<Vec<CorruptionPattern>> = LazyLock::new(|| {
        vec![
            CorruptionPattern {
                name: "doubled_handler_wrapper",
                regex: &DOUBLED_HANDLER_WRAPPER,
            },
            CorruptionPattern {
                name: "double_import_opener",
                regex: &DOUBLE_IMPORT_OPENER,
            },
        ]
    });
    &PATTERNS
}

/// Detects unbalanced parentheses inside an attribute value body: counts
/// `(` vs `)` within each `attr={...}` span and flags any span that isn't
/// balanced. This can't be expressed as a single regex (parens nest), so
/// it gets its own scan rather than living in `patterns()`.
fn has_unbalanced_attribute_parens(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(eq) = text[i..].find("={") {
        let start = i + eq + 2;
        let mut depth = 1i32; // the opening `{`
        let mut paren_depth = 0i32;
        let mut j = start;
        while j < bytes.len() && depth > 0 {
            match bytes[j] {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                b'(' => paren_depth += 1,
                b')' => paren_depth -= 1,
                _ => {}
            }
            j += 1;
        }
        if paren_depth != 0 {
            return true;
        }
        if j <= i {
            break;
        }
        i = j;
    }
    false
}

pub struct CorruptionDetector;

impl CorruptionDetector {
    pub fn new() -> Self {
        Self
    }

    /// Check `after` for known bad shapes absent from `before`. Only
    /// meaningful when `before != after` (spec.md §4.4); callers that
    /// already know the texts are equal may skip calling this.
    pub fn check(&self, before: &str, after: &str) -> Verdict {
        if before == after {
            return Verdict::ok();
        }
        for pattern in patterns() {
            let present_after = pattern.regex.is_match(after);
            let present_before = pattern.regex.is_match(before);
            if present_after && !present_before {
                return Verdict::revert(pattern.name);
            }
        }
        let unbalanced_after = has_unbalanced_attribute_parens(after);
        let unbalanced_before = has_unbalanced_attribute_parens(before);
        if unbalanced_after && !unbalanced_before {
            return Verdict::revert("unbalanced_attribute_parens");
        }
        Verdict::ok()
    }
}

impl Default for CorruptionDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_doubled_handler_wrapper_introduced_by_transform() {
        let detector = CorruptionDetector::new();
        let before = "<button onClick={handleClick}>Go</button>";
        let after = "<button onClick={(e) => () => handleClick(e)}>Go</button>";
        let verdict = detector.check(before, after);
        assert!(verdict.must_revert);
        assert_eq!(verdict.reason.as_deref(), Some("doubled_handler_wrapper"));
    }

    #[test]
    fn does_not_flag_preexisting_corruption() {
        let detector = CorruptionDetector::new();
        let before = "<button onClick={(e) => () => handleClick(e)}>Go</button>";
        let after = "<button onClick={(e) => () => handleClick(e)} disabled>Go</button>";
        let verdict = detector.check(before, after);
        assert!(!verdict.must_revert);
    }

    #[test]
    fn flags_unbalanced_parens_introduced_by_transform() {
        let detector = CorruptionDetector::new();
        let before = "<div data-x={fn(a, b)}>hi</div>";
        let after = "<div data-x={fn(a, b}>hi</div>";
        let verdict = detector.check(before, after);
        assert!(verdict.must_revert);
    }

    #[test]
    fn identical_texts_are_never_checked() {
        let detector = CorruptionDetector::new();
        let verdict = detector.check("same", "same");
        assert!(!verdict.must_revert);
    }
}
