//! Field extraction framework.
//!
//! Each field of a document profile is a [`FieldSpec`]: a list of
//! [`Strategy`] values tried in order, plus the mask applied to the boxes
//! of the first strategy that locates something. Extraction never fails;
//! a field that finds nothing comes back empty.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::{BBox, OcrPage, OcrToken};

mod anchor;
mod pattern;

pub use anchor::{Anchor, AnchorSearch, KeepFilter, Source};
pub use pattern::{LineMatch, Matcher, Pick, PatternFilter};

// ============================================================================
// Inputs and outputs
// ============================================================================

/// Everything an extractor may look at for one document.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    pub tokens: &'a [OcrToken],
    pub lines: &'a [String],
    pub qr_boxes: &'a [BBox],
}

impl<'a> ExtractionContext<'a> {
    pub fn new(page: &'a OcrPage, qr_boxes: &'a [BBox]) -> Self {
        Self {
            tokens: &page.tokens,
            lines: &page.lines,
            qr_boxes,
        }
    }
}

/// Text and boxes found by one strategy, before masking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Located {
    pub text: String,
    pub boxes: Vec<BBox>,
}

impl Located {
    pub fn new(text: impl Into<String>, boxes: Vec<BBox>) -> Self {
        Self {
            text: text.into(),
            boxes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// `Some(self)` if anything was found.
    fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

/// Result of extracting one field. Empty text and coordinates mean
/// "not found".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub label: String,
    pub raw_text: String,
    pub coordinates: Vec<BBox>,
}

impl ExtractedField {
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

// ============================================================================
// Field specifications
// ============================================================================

/// Portion of each located box that gets covered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskPolicy {
    /// Left fraction of the box width.
    Fraction(f64),
    Full,
}

impl MaskPolicy {
    pub fn apply(&self, bbox: &BBox) -> BBox {
        match self {
            MaskPolicy::Fraction(f) => bbox.mask_left(*f),
            MaskPolicy::Full => *bbox,
        }
    }
}

/// Token-shape predicate, e.g. [`crate::rules::heuristics::is_tax_id`].
#[derive(Clone, Copy)]
pub struct Shape(pub fn(&str) -> bool);

impl Shape {
    pub fn test(&self, text: &str) -> bool {
        (self.0)(text)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Shape(..)")
    }
}

#[derive(Debug, Clone)]
pub enum Strategy {
    Anchor(AnchorSearch),
    Pattern(PatternFilter),
    LineMatch(LineMatch),
    /// Boxes reported by the QR detector, cropped to their top half.
    QrCode,
    /// Concatenation of several strategies.
    Union(Vec<Strategy>),
}

impl Strategy {
    pub fn locate(&self, ctx: &ExtractionContext<'_>) -> Option<Located> {
        match self {
            Strategy::Anchor(search) => search.locate(ctx),
            Strategy::Pattern(filter) => filter.locate(ctx),
            Strategy::LineMatch(line) => line.locate(ctx),
            Strategy::QrCode => {
                let boxes: Vec<BBox> = ctx.qr_boxes.iter().map(BBox::top_half).collect();
                Located::new(format!("Found {} QR Code", boxes.len()), boxes).non_empty()
            }
            Strategy::Union(parts) => {
                let mut texts = Vec::new();
                let mut boxes = Vec::new();
                for found in parts.iter().filter_map(|s| s.locate(ctx)) {
                    if !found.text.is_empty() {
                        texts.push(found.text);
                    }
                    boxes.extend(found.boxes);
                }
                Located::new(texts.join(" "), dedup_boxes(boxes)).non_empty()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub label: &'static str,
    pub strategies: Vec<Strategy>,
    pub mask: MaskPolicy,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(label: &'static str, mask: MaskPolicy, strategy: Strategy) -> Self {
        Self {
            label,
            strategies: vec![strategy],
            mask,
            required: true,
        }
    }

    pub fn optional(label: &'static str, mask: MaskPolicy, strategy: Strategy) -> Self {
        Self {
            required: false,
            ..Self::required(label, mask, strategy)
        }
    }

    /// Adds a strategy tried when the previous ones find nothing.
    pub fn or_else(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }
}

/// Runs the strategies of `spec` in order and masks the first hit.
pub fn extract_field(spec: &FieldSpec, ctx: &ExtractionContext<'_>) -> ExtractedField {
    match spec.strategies.iter().find_map(|s| s.locate(ctx)) {
        Some(found) => ExtractedField {
            label: spec.label.to_string(),
            raw_text: found.text,
            coordinates: found.boxes.iter().map(|b| spec.mask.apply(b)).collect(),
        },
        None => {
            log::warn!("[Extract] no value found for {}", spec.label);
            ExtractedField::empty(spec.label)
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Boxes of tokens whose text equals one of `words`, in token order,
/// without duplicates, stopping once there is one box per word.
pub fn locate_words(tokens: &[OcrToken], words: &[&str]) -> Vec<BBox> {
    let wanted: HashSet<&str> = words.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut boxes = Vec::new();
    for token in tokens {
        if boxes.len() >= words.len() {
            break;
        }
        if wanted.contains(token.text.as_str()) && seen.insert(token.bbox) {
            boxes.push(token.bbox);
        }
    }
    boxes
}

/// Removes repeated boxes, keeping the first occurrence.
pub fn dedup_boxes(boxes: Vec<BBox>) -> Vec<BBox> {
    let mut seen = HashSet::new();
    boxes.into_iter().filter(|b| seen.insert(*b)).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::OcrPage;

    pub fn page(rows: &[&str]) -> OcrPage {
        OcrPage::from_rows(rows)
    }
}
