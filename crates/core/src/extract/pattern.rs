//! Token and line filters.

use super::{locate_words, Located, Shape};
use crate::rules::{MatchMode, PatternSet};
use crate::ExtractionContext;

#[derive(Debug, Clone)]
pub enum Matcher {
    Patterns(PatternSet, MatchMode),
    Shape(Shape),
}

impl Matcher {
    fn test(&self, text: &str) -> bool {
        match self {
            Matcher::Patterns(set, mode) => set.matches(text, *mode),
            Matcher::Shape(shape) => shape.test(text),
        }
    }
}

/// Tokens matching a pattern set or a shape.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    matcher: Matcher,
    first_only: bool,
    exclude: Option<PatternSet>,
}

impl PatternFilter {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            first_only: false,
            exclude: None,
        }
    }

    pub fn shape(shape: fn(&str) -> bool) -> Self {
        Self::new(Matcher::Shape(Shape(shape)))
    }

    pub fn search(set: PatternSet) -> Self {
        Self::new(Matcher::Patterns(set, MatchMode::Search))
    }

    pub fn prefix(set: PatternSet) -> Self {
        Self::new(Matcher::Patterns(set, MatchMode::Prefix))
    }

    pub fn first_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    pub fn exclude(mut self, set: PatternSet) -> Self {
        self.exclude = Some(set);
        self
    }

    pub fn locate(&self, ctx: &ExtractionContext<'_>) -> Option<Located> {
        let hits = ctx.tokens.iter().filter(|t| {
            self.matcher.test(&t.text)
                && !self.exclude.as_ref().is_some_and(|ex| ex.is_match(&t.text))
        });
        let hits: Vec<_> = if self.first_only {
            hits.take(1).collect()
        } else {
            hits.collect()
        };
        let text = hits
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Located::new(text, hits.iter().map(|t| t.bbox).collect()).non_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    First,
    Last,
}

/// A whole line matching a pattern; its words are located as boxes.
#[derive(Debug, Clone)]
pub struct LineMatch {
    pattern: PatternSet,
    pick: Pick,
}

impl LineMatch {
    pub fn first(pattern: PatternSet) -> Self {
        Self {
            pattern,
            pick: Pick::First,
        }
    }

    pub fn last(pattern: PatternSet) -> Self {
        Self {
            pattern,
            pick: Pick::Last,
        }
    }

    pub fn locate(&self, ctx: &ExtractionContext<'_>) -> Option<Located> {
        let mut matching = ctx.lines.iter().filter(|l| self.pattern.is_match(l));
        let line = match self.pick {
            Pick::First => matching.next(),
            Pick::Last => matching.last(),
        }?;
        let words: Vec<&str> = line.split_whitespace().filter(|w| *w != "/").collect();
        Located::new(words.join(" "), locate_words(ctx.tokens, &words)).non_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::page;
    use crate::rules::heuristics::{is_national_id_fragment, GENDER, PLACES};
    use crate::BBox;

    #[test]
    fn test_shape_takes_all_matches() {
        let page = page(&["1234 5678 9012", "VID 9999"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let found = PatternFilter::shape(is_national_id_fragment)
            .locate(&ctx)
            .unwrap();
        assert_eq!(found.text, "1234 5678 9012 9999");
        assert_eq!(found.boxes.len(), 4);
    }

    #[test]
    fn test_first_only_and_exclude() {
        let page = page(&["Mumbai Pune", "generated"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let found = PatternFilter::search(PLACES.clone())
            .first_only()
            .locate(&ctx)
            .unwrap();
        assert_eq!(found.text, "Mumbai");

        let none = PatternFilter::search(PatternSet::new(&["generated"]))
            .exclude(PatternSet::new(&["generated"]))
            .locate(&ctx);
        assert!(none.is_none());
    }

    #[test]
    fn test_prefix_filter() {
        let page = page(&["DOB:01/01/1990 01/01/1990"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let found = PatternFilter::prefix(PatternSet::new(&[r"\d{2}/\d{2}/\d{4}"]))
            .locate(&ctx)
            .unwrap();
        assert_eq!(found.boxes, vec![BBox::new(120, 0, 220, 30)]);
    }

    #[test]
    fn test_last_line_match_drops_slash() {
        let page = page(&["Male", "पुरुष / Male"]);
        let ctx = ExtractionContext::new(&page, &[]);
        let found = LineMatch::last(GENDER.clone()).locate(&ctx).unwrap();
        assert_eq!(found.text, "पुरुष Male");
        // both "Male" tokens share the text; the first box wins
        assert_eq!(found.boxes.len(), 2);
    }
}
