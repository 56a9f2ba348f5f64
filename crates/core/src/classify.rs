//! Document type classification from OCR text.

use serde::{Deserialize, Serialize};

use crate::rules::signatures;
use crate::{DocumentKind, OcrPage};

/// How many matched kinds are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationPolicy {
    /// Only the highest-priority match.
    #[default]
    FirstMatch,
    /// Every match, in priority order, until one is redacted.
    AllMatches,
}

/// Matched kinds in priority order; empty means unidentified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub matches: Vec<DocumentKind>,
}

impl Classification {
    pub fn is_unidentified(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn primary(&self) -> Option<DocumentKind> {
        self.matches.first().copied()
    }

    /// Kinds to process under `policy`.
    pub fn candidates(&self, policy: ClassificationPolicy) -> &[DocumentKind] {
        match policy {
            ClassificationPolicy::FirstMatch => &self.matches[..self.matches.len().min(1)],
            ClassificationPolicy::AllMatches => &self.matches,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, page: &OcrPage) -> Classification {
        self.classify_texts(page.texts())
    }

    /// Scores `texts` against every signature. Pure and idempotent.
    pub fn classify_texts<'a, I>(&self, texts: I) -> Classification
    where
        I: IntoIterator<Item = &'a str>,
    {
        let texts: Vec<&str> = texts.into_iter().filter(|t| !t.trim().is_empty()).collect();
        let matches: Vec<DocumentKind> = DocumentKind::PRIORITY
            .into_iter()
            .filter(|kind| signatures::matches_any(*kind, texts.iter().copied()))
            .collect();

        if matches.is_empty() {
            log::info!("[Classifier] document un-identified ({} texts)", texts.len());
        } else {
            log::info!("[Classifier] matched {:?}", matches);
        }
        Classification { matches }
    }
}
