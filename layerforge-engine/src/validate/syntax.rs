//! `SyntaxValidator` (spec.md §4.3): answers "is this still a valid
//! program?" using the injected `Parser`.

use super::Verdict;
use crate::parser::Parser;

pub enum SyntaxState {
    Valid,
    Invalid(String),
}

pub struct SyntaxValidator<'p> {
    parser: &'p dyn Parser,
}

impl<'p> SyntaxValidator<'p> {
    pub fn new(parser: &'p dyn Parser) -> Self {
        Self { parser }
    }

    pub fn validate(&self, code: &str) -> SyntaxState {
        let result = self.parser.parse(code);
        if result.is_ok() {
            SyntaxState::Valid
        } else {
            SyntaxState::Invalid(
                result
                    .error()
                    .unwrap_or("parse failed")
                    .to_string(),
            )
        }
    }

    /// Delta check between `before` and `after` (spec.md §4.1 step 4c,
    /// §4.3): if `before` was valid and `after` is not, the caller must
    /// revert. If `before` was already invalid, the same failure is
    /// surfaced without triggering a revert — there is nothing valid left
    /// to protect (spec.md §4.3, §4.4 scenario S4).
    pub fn check_delta(&self, before: &str, after: &str) -> Verdict {
        let before_valid = matches!(self.validate(before), SyntaxState::Valid);
        match self.validate(after) {
            SyntaxState::Valid => Verdict::ok(),
            SyntaxState::Invalid(message) => {
                if before_valid {
                    Verdict::revert(format!("syntax became invalid: {message}"))
                } else {
                    Verdict::ok()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TreeSitterParser;

    #[test]
    fn valid_before_invalid_after_reverts() {
        let parser = TreeSitterParser::new();
        let validator = SyntaxValidator::new(&parser);
        let verdict = validator.check_delta("const x = 1;", "const x = ;;;(((");
        assert!(verdict.must_revert);
    }

    #[test]
    fn invalid_before_does_not_revert_on_same_failure() {
        let parser = TreeSitterParser::new();
        let validator = SyntaxValidator::new(&parser);
        let broken = "function broken( { return <div>;";
        let verdict = validator.check_delta(broken, broken);
        assert!(!verdict.must_revert);
    }

    #[test]
    fn valid_before_and_after_is_ok() {
        let parser = TreeSitterParser::new();
        let validator = SyntaxValidator::new(&parser);
        let verdict = validator.check_delta("const x = 1;", "const x = 2;");
        assert!(!verdict.must_revert);
    }
}
