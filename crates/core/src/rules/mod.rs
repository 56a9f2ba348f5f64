//! Pattern primitives used by the classifier and the field extractors.
//!
//! OCR output is noisy, so every keyword is expressed as an alternation of
//! the spellings Tesseract actually produces. Patterns are compiled once,
//! case-insensitively, and shared through `Lazy` statics.

use regex::{Regex, RegexBuilder};

pub mod heuristics;
pub mod signatures;

/// How a pattern is applied to a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Match anywhere in the text.
    #[default]
    Search,
    /// Match must start at the first character.
    Prefix,
}

/// A group of case-insensitive patterns; a text matches the set if it
/// matches any member.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: compile_patterns(patterns, true),
        }
    }

    /// Case-sensitive variant, for literal labels copied from printed forms.
    pub fn exact<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: compile_patterns(patterns, false),
        }
    }

    /// Set that matches any of the given literal words, compared whole and
    /// case-insensitively.
    pub fn words<S: AsRef<str>>(words: &[S]) -> Self {
        let alternation = words
            .iter()
            .map(|w| regex::escape(w.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        Self::new(&[format!("^(?:{})$", alternation)])
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    /// True if some pattern matches at the start of `text`.
    pub fn is_prefix_match(&self, text: &str) -> bool {
        self.patterns
            .iter()
            .any(|re| re.find(text).is_some_and(|m| m.start() == 0))
    }

    pub fn matches(&self, text: &str, mode: MatchMode) -> bool {
        match mode {
            MatchMode::Search => self.is_match(text),
            MatchMode::Prefix => self.is_prefix_match(text),
        }
    }
}

/// Compiles patterns, skipping (and logging) invalid ones.
pub(crate) fn compile_patterns<S: AsRef<str>>(patterns: &[S], case_insensitive: bool) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| {
            RegexBuilder::new(p.as_ref())
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| log::warn!("[Rules] invalid pattern {:?}: {}", p.as_ref(), e))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_set_is_case_insensitive() {
        let set = PatternSet::new(&[r"\b\w*(father['’]s|father)\b"]);
        assert!(set.is_match("FATHER'S NAME"));
        assert!(set.is_match("grandfather"));
        assert!(!set.is_match("fathom"));
    }

    #[test]
    fn test_prefix_match() {
        let set = PatternSet::new(&[r"\d{2}/\d{2}/\d{4}"]);
        assert!(set.is_prefix_match("01/01/1990"));
        assert!(!set.is_prefix_match("DOB:01/01/1990"));
        assert!(set.is_match("DOB:01/01/1990"));
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let set = PatternSet::new(&["(unclosed", r"\bok\b"]);
        assert_eq!(set.len(), 1);
        assert!(set.is_match("ok"));
    }

    #[test]
    fn test_words_match_whole_token() {
        let set = PatternSet::words(&["kyc", "date"]);
        assert!(set.is_match("KYC"));
        assert!(set.is_match("Date"));
        assert!(!set.is_match("update"));
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        let set = PatternSet::exact(&["CBD Belapur"]);
        assert!(set.is_match("Income Tax CBD Belapur"));
        assert!(!set.is_match("cbd belapur"));
    }

    #[test]
    fn test_exact_skips_invalid_patterns() {
        let set = PatternSet::exact(&["[unclosed", "GOVT"]);
        assert_eq!(set.len(), 1);
        assert!(set.is_match("GOVT OF INDIA"));
    }
}
