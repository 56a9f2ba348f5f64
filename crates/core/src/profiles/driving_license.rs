//! Driving license (Union of India format).

use once_cell::sync::Lazy;

use super::qr_codes;
use crate::extract::{AnchorSearch, FieldSpec, KeepFilter, MaskPolicy, PatternFilter, Strategy};
use crate::rules::heuristics::{is_driving_license_number, DL_DATE, PLACES};
use crate::rules::{MatchMode, PatternSet};

/// Upper-case lines after the first "Name" caption; relation and blood
/// group captions are skipped.
fn names() -> AnchorSearch {
    AnchorSearch::lines(PatternSet::new(&[r"\b\w*(name)\b"]))
        .without_digit_lines()
        .break_on(PatternSet::new(&[r"\b(ex|se)\b"]))
        .break_mode(MatchMode::Prefix)
        .skip(PatternSet::new(&[r"\b\w*(son|daughter|blood|blond|ae|re)\b"]))
        .skip_mode(MatchMode::Prefix)
        .keep(KeepFilter {
            uppercase_only: true,
            ..Default::default()
        })
        .drop_last_word()
}

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required(
            "Driving License Number",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::shape(is_driving_license_number)),
        ),
        FieldSpec::required(
            "Driving License Dates",
            MaskPolicy::Fraction(0.80),
            Strategy::Pattern(PatternFilter::prefix(DL_DATE.clone())),
        ),
        FieldSpec::required("Driving License Names", MaskPolicy::Full, Strategy::Anchor(names())),
        FieldSpec::optional(
            "Driving License Address",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::search(PLACES.clone())),
        ),
        qr_codes("Driving License QR-Codes"),
    ]
});
