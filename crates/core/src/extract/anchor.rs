//! Anchor search: find a label, then collect what follows it.

use super::{locate_words, Located, Shape};
use crate::rules::heuristics::{has_digit, is_alpha, is_upper};
use crate::rules::{MatchMode, PatternSet};
use crate::{BBox, ExtractionContext};

/// What the search walks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    #[default]
    Lines,
    Tokens,
}

/// Where collection starts. Fallbacks are tried in order.
#[derive(Debug, Clone)]
pub enum Anchor {
    Pattern(PatternSet),
    Shape(Shape),
    /// First entry of the sequence, without an offset.
    Start,
}

/// Entries that survive collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepFilter {
    pub min_len: usize,
    pub uppercase_only: bool,
    pub alphabetic_only: bool,
    pub no_digits: bool,
}

impl KeepFilter {
    fn accepts(&self, text: &str) -> bool {
        text.chars().count() >= self.min_len
            && (!self.uppercase_only || is_upper(text))
            && (!self.alphabetic_only || is_alpha(text))
            && (!self.no_digits || !has_digit(text))
    }
}

struct Entry<'a> {
    text: &'a str,
    bbox: Option<BBox>,
}

#[derive(Debug, Clone)]
pub struct AnchorSearch {
    source: Source,
    anchors: Vec<Anchor>,
    reverse: bool,
    drop_digit_lines: bool,
    offset: usize,
    window: Option<usize>,
    breaks: Vec<PatternSet>,
    break_mode: MatchMode,
    skips: Vec<PatternSet>,
    skip_mode: MatchMode,
    keep: KeepFilter,
    drop_last_word: bool,
    merge_span: bool,
}

impl AnchorSearch {
    pub fn new(source: Source, anchor: Anchor) -> Self {
        Self {
            source,
            anchors: vec![anchor],
            reverse: false,
            drop_digit_lines: false,
            offset: 1,
            window: None,
            breaks: Vec::new(),
            break_mode: MatchMode::Search,
            skips: Vec::new(),
            skip_mode: MatchMode::Search,
            keep: KeepFilter::default(),
            drop_last_word: false,
            merge_span: false,
        }
    }

    pub fn lines(anchor: PatternSet) -> Self {
        Self::new(Source::Lines, Anchor::Pattern(anchor))
    }

    pub fn tokens(anchor: Anchor) -> Self {
        Self::new(Source::Tokens, anchor)
    }

    /// Anchor tried when the previous ones are not found.
    pub fn fallback(mut self, anchor: Anchor) -> Self {
        self.anchors.push(anchor);
        self
    }

    /// Walk from the bottom of the document upwards.
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn without_digit_lines(mut self) -> Self {
        self.drop_digit_lines = true;
        self
    }

    /// Entries between the anchor and the first collected one, plus one.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Maximum number of entries examined after the anchor.
    pub fn window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn break_on(mut self, set: PatternSet) -> Self {
        self.breaks.push(set);
        self
    }

    pub fn break_mode(mut self, mode: MatchMode) -> Self {
        self.break_mode = mode;
        self
    }

    pub fn skip(mut self, set: PatternSet) -> Self {
        self.skips.push(set);
        self
    }

    pub fn skip_mode(mut self, mode: MatchMode) -> Self {
        self.skip_mode = mode;
        self
    }

    pub fn keep(mut self, keep: KeepFilter) -> Self {
        self.keep = keep;
        self
    }

    pub fn drop_last_word(mut self) -> Self {
        self.drop_last_word = true;
        self
    }

    /// Report one box spanning the first to the last collected token.
    pub fn merge_span(mut self) -> Self {
        self.merge_span = true;
        self
    }

    fn entries<'a>(&self, ctx: &ExtractionContext<'a>) -> Vec<Entry<'a>> {
        let mut entries: Vec<Entry<'a>> = match self.source {
            Source::Lines => ctx
                .lines
                .iter()
                .filter(|line| !self.drop_digit_lines || !is_digit_line(line))
                .map(|line| Entry {
                    text: line.as_str(),
                    bbox: None,
                })
                .collect(),
            Source::Tokens => ctx
                .tokens
                .iter()
                .map(|t| Entry {
                    text: t.text.as_str(),
                    bbox: Some(t.bbox),
                })
                .collect(),
        };
        if self.reverse {
            entries.reverse();
        }
        entries
    }

    fn start(&self, entries: &[Entry<'_>]) -> Option<usize> {
        self.anchors.iter().find_map(|anchor| match anchor {
            Anchor::Pattern(set) => entries
                .iter()
                .position(|e| set.is_match(e.text))
                .map(|i| i + self.offset),
            Anchor::Shape(shape) => entries
                .iter()
                .position(|e| shape.test(e.text))
                .map(|i| i + self.offset),
            Anchor::Start => Some(0),
        })
    }

    pub fn locate(&self, ctx: &ExtractionContext<'_>) -> Option<Located> {
        let entries = self.entries(ctx);
        let start = self.start(&entries)?;

        let mut collected: Vec<&Entry<'_>> = Vec::new();
        for (n, entry) in entries.iter().skip(start).enumerate() {
            if self.window.is_some_and(|w| n >= w) {
                break;
            }
            if self.breaks.iter().any(|b| b.matches(entry.text, self.break_mode)) {
                break;
            }
            if self.skips.iter().any(|s| s.matches(entry.text, self.skip_mode)) {
                continue;
            }
            if self.keep.accepts(entry.text) {
                collected.push(entry);
            }
        }
        if collected.is_empty() {
            return None;
        }

        let texts: Vec<String> = collected
            .iter()
            .map(|e| self.trim_words(e.text))
            .filter(|t| !t.is_empty())
            .collect();

        let boxes = match self.source {
            Source::Tokens => {
                let boxes: Vec<BBox> = collected.iter().filter_map(|e| e.bbox).collect();
                match (self.merge_span, boxes.first(), boxes.last()) {
                    (true, Some(first), Some(last)) => vec![first.span_to(last)],
                    _ => boxes,
                }
            }
            Source::Lines => {
                let words: Vec<&str> = texts.iter().flat_map(|t| t.split_whitespace()).collect();
                let boxes = locate_words(ctx.tokens, &words);
                match (self.merge_span, boxes.first(), boxes.last()) {
                    (true, Some(first), Some(last)) => vec![first.span_to(last)],
                    _ => boxes,
                }
            }
        };
        Located::new(texts.join(" "), boxes).non_empty()
    }

    fn trim_words(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if self.drop_last_word && words.len() > 1 {
            words[..words.len() - 1].join(" ")
        } else {
            words.join(" ")
        }
    }
}

fn is_digit_line(line: &str) -> bool {
    let mut digits = line.chars().filter(|c| !c.is_whitespace()).peekable();
    digits.peek().is_some() && digits.all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::page;
    use crate::rules::heuristics::is_tax_id;

    #[test]
    fn test_collect_after_anchor_until_break() {
        let page = page(&["Name", "RAVI KUMAR", "Father's Name", "SURESH KUMAR"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let search = AnchorSearch::lines(PatternSet::new(&[r"^name$"]))
            .break_on(PatternSet::new(&[r"\bfather"]));
        let found = search.locate(&ctx).unwrap();
        assert_eq!(found.text, "RAVI KUMAR");
        assert_eq!(found.boxes.len(), 2);
    }

    #[test]
    fn test_reverse_with_skips_and_fallback_anchor() {
        let page = page(&["GOVERNMENT OF INDIA", "Ravi Kumar", "1990", "Male", "1234 5678 9012"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let search = AnchorSearch::lines(PatternSet::new(&[r"\bdob\b"]))
            .fallback(Anchor::Pattern(PatternSet::new(&[r"^(19|20)\d{2}$"])))
            .reversed()
            .without_digit_lines()
            .skip(PatternSet::new(&[r"\bgovernment\b"]));
        // "1990" is a digit line and is filtered before anchoring, so the
        // date fallback misses and nothing is found.
        assert!(search.locate(&ctx).is_none());

        let search = AnchorSearch::lines(PatternSet::new(&[r"\bdob\b"]))
            .fallback(Anchor::Pattern(PatternSet::new(&[r"\bmale\b"])))
            .reversed()
            .without_digit_lines()
            .skip(PatternSet::new(&[r"\bgovernment\b"]));
        let found = search.locate(&ctx).unwrap();
        assert_eq!(found.text, "Ravi Kumar");
    }

    #[test]
    fn test_window_and_drop_last_word() {
        let page = page(&["To", "RAVI KUMAR S/O", "FLAT 12", "MG ROAD", "MUMBAI"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let search = AnchorSearch::lines(PatternSet::new(&[r"^to$"]))
            .window(1)
            .drop_last_word();
        let found = search.locate(&ctx).unwrap();
        assert_eq!(found.text, "RAVI KUMAR");
        assert_eq!(found.boxes.len(), 2);
    }

    #[test]
    fn test_token_source_merges_span() {
        let page = page(&["ABCDE1234F RAVI KUMAR KYC"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let search = AnchorSearch::tokens(Anchor::Shape(Shape(is_tax_id)))
            .break_on(PatternSet::words(&["kyc"]))
            .keep(KeepFilter {
                uppercase_only: true,
                alphabetic_only: true,
                ..Default::default()
            })
            .merge_span();
        let found = search.locate(&ctx).unwrap();
        assert_eq!(found.text, "RAVI KUMAR");
        assert_eq!(found.boxes, vec![BBox::new(120, 0, 340, 30)]);
    }

    #[test]
    fn test_start_anchor_ignores_offset() {
        let page = page(&["RAVI", "permanent"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let search = AnchorSearch::tokens(Anchor::Start)
            .break_on(PatternSet::new(&[r"permanent"]));
        assert_eq!(search.locate(&ctx).unwrap().text, "RAVI");
    }

    #[test]
    fn test_keep_filter() {
        let keep = KeepFilter {
            min_len: 2,
            no_digits: true,
            ..Default::default()
        };
        assert!(keep.accepts("AB"));
        assert!(!keep.accepts("A"));
        assert!(!keep.accepts("A1"));
    }
}
