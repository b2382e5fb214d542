//! Answer matching for typed quizzes.
//!
//! Deliberately strict: trim, lowercase, compare. No fuzzy matching, no
//! partial credit, no Unicode normalization beyond case folding, so an
//! answer with a missing tone mark (`ni` vs `nǐ`) is wrong.

/// Normalized form used for comparison.
#[must_use]
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Whether a typed answer equals the canonical answer after normalization.
#[must_use]
pub fn matches(candidate: &str, canonical: &str) -> bool {
    normalize(candidate) == normalize(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_case_and_outer_whitespace() {
        assert!(matches("  Hello ", "hello"));
        assert!(matches("GOODBYE", " goodbye\t"));
    }

    #[test]
    fn inner_whitespace_is_significant() {
        assert!(!matches("good  bye", "good bye"));
    }

    #[test]
    fn tone_marks_are_not_folded() {
        assert!(!matches("ni", "nǐ"));
        assert!(matches("NǏ", "nǐ"));
    }

    #[test]
    fn no_partial_credit() {
        assert!(!matches("hell", "hello"));
        assert!(!matches("", "hello"));
    }

    #[test]
    fn symmetric_over_samples() {
        let samples = ["", " a", "A ", "你好", " 你好 ", "Nǐ hǎo", "nǐ hǎo", "x y"];
        for a in samples {
            for b in samples {
                assert_eq!(matches(a, b), matches(b, a), "{a:?} vs {b:?}");
                assert_eq!(matches(a, b), normalize(a) == normalize(b));
            }
        }
    }
}
