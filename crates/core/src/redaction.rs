//! Redaction coordinate calculation and acceptance policy.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extract::{ExtractedField, ExtractionContext};
use crate::{BBox, ClassificationPolicy, Classifier, DocumentKind, OcrPage};

/// How strictly missing fields are treated.
///
/// Level 1 accepts any document with at least one located field. Level 2
/// and above reject a document as soon as a required field is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedactionLevel(u8);

impl RedactionLevel {
    pub const BEST_EFFORT: RedactionLevel = RedactionLevel(1);
    pub const STRICT: RedactionLevel = RedactionLevel(2);

    /// Levels below 1 are treated as 1.
    pub fn new(level: u8) -> Self {
        Self(level.max(1))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_strict(&self) -> bool {
        self.0 >= 2
    }
}

impl Default for RedactionLevel {
    fn default() -> Self {
        Self::BEST_EFFORT
    }
}

impl fmt::Display for RedactionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    Redacted,
    Rejected,
}

/// Outcome of analysing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub kind: Option<DocumentKind>,
    pub status: VerdictStatus,
    pub message: String,
    pub fields: Vec<ExtractedField>,
}

impl Verdict {
    pub fn rejected(kind: Option<DocumentKind>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: VerdictStatus::Rejected,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn unidentified() -> Self {
        Self::rejected(None, "Document Un-identified")
    }

    pub fn is_redacted(&self) -> bool {
        self.status == VerdictStatus::Redacted
    }

    /// Every redaction box in field order.
    pub fn boxes(&self) -> Vec<BBox> {
        self.fields
            .iter()
            .flat_map(|f| f.coordinates.iter().copied())
            .collect()
    }

    /// Fields that located something.
    pub fn found_fields(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields.iter().filter(|f| !f.is_empty())
    }
}

/// Applies the acceptance policy of `level` to the fields of `kind`.
///
/// `fields` must be in profile order, as returned by
/// [`DocumentKind::extract_fields`].
pub fn evaluate(kind: DocumentKind, fields: Vec<ExtractedField>, level: RedactionLevel) -> Verdict {
    let doc = kind.display_name();

    let mut fields = if level.is_strict() {
        let mut kept = Vec::with_capacity(fields.len());
        for (field, spec) in fields.into_iter().zip(kind.field_specs()) {
            if field.is_empty() {
                if spec.required {
                    let message = format!("No information for {} found in {} document", spec.label, doc);
                    log::warn!("[Redaction] {}", message);
                    return Verdict::rejected(Some(kind), message);
                }
                continue;
            }
            kept.push(field);
        }
        kept
    } else {
        fields
    };

    if fields.iter().all(ExtractedField::is_empty) {
        let message = format!("No information found in {} document", doc);
        log::warn!("[Redaction] {}", message);
        return Verdict::rejected(Some(kind), message);
    }

    dedup_across_fields(&mut fields);
    Verdict {
        kind: Some(kind),
        status: VerdictStatus::Redacted,
        message: format!("Successfully Redacted {} document", doc),
        fields,
    }
}

/// Drops boxes already claimed by an earlier field.
pub fn dedup_across_fields(fields: &mut [ExtractedField]) {
    let mut seen: HashSet<BBox> = HashSet::new();
    for field in fields.iter_mut() {
        field.coordinates.retain(|b| seen.insert(*b));
    }
}

/// Extracts and evaluates one document kind.
pub fn redact(kind: DocumentKind, ctx: &ExtractionContext<'_>, level: RedactionLevel) -> Verdict {
    evaluate(kind, kind.extract_fields(ctx), level)
}

/// Classifies a page and produces its verdict.
///
/// With [`ClassificationPolicy::AllMatches`] each matched kind is tried in
/// priority order and the first redacted verdict wins; otherwise the
/// verdict of the highest-priority kind is returned.
pub fn analyze_page(
    page: &OcrPage,
    qr_boxes: &[BBox],
    policy: ClassificationPolicy,
    level: RedactionLevel,
) -> Verdict {
    let classification = Classifier::new().classify(page);
    let ctx = ExtractionContext::new(page, qr_boxes);

    let mut first: Option<Verdict> = None;
    for kind in classification.candidates(policy) {
        let verdict = redact(*kind, &ctx, level);
        log::info!("[Redaction] {}: {}", kind, verdict.message);
        if verdict.is_redacted() {
            return verdict;
        }
        first.get_or_insert(verdict);
    }
    first.unwrap_or_else(Verdict::unidentified)
}
