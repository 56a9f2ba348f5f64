//! Physical Aadhaar card (front and back).

use once_cell::sync::Lazy;

use super::qr_codes;
use crate::extract::{
    Anchor, AnchorSearch, FieldSpec, KeepFilter, LineMatch, MaskPolicy, PatternFilter, Strategy,
};
use crate::rules::heuristics::{
    is_national_id_fragment, is_pincode, AADHAAR_DATE, DOB_LABEL, GENDER, PLACES,
};
use crate::rules::PatternSet;

/// Header and caption fragments that sit above the name on the card.
static NAME_SKIPS: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\b(ay|ts|n 4|zn\.|zn|aaa|g|ee|em|gn|fo|of|f|gina|gina\.|“government|government|india)\b",
        r"\b(ee|a|uh|ra|tametor|ea|pias|ree|net|an|aa|sre|atti|ora|zu|eve|res|yan|ric|id|by|tat)\b",
        r"\b(address|afters|arent|2c|unique|authority|cad|compen|rte|aen|eee|wera|oftndia|cgavernment|surges|itt)\b",
        r"\b(chique|wentication|ons|par|pos|peers|src|rerp|ane|lace|tine|reer|nee|hin|sss|authority|of|tndiag|bus|main|road|address|tx|shiny|ios|male|female|son|fir)\b",
        r"\b([0-9]{1,2})\b",
        r"=|<<|~|-",
    ])
});

/// Walks up from the date-of-birth line and collects the lines above it.
fn name_search() -> AnchorSearch {
    AnchorSearch::lines(DOB_LABEL.clone())
        .fallback(Anchor::Pattern(AADHAAR_DATE.clone()))
        .fallback(Anchor::Pattern(GENDER.clone()))
        .reversed()
        .without_digit_lines()
        .skip(NAME_SKIPS.clone())
        .keep(KeepFilter {
            min_len: 2,
            ..Default::default()
        })
}

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required(
            "Aadhaar Number",
            MaskPolicy::Fraction(0.50),
            Strategy::Pattern(PatternFilter::shape(is_national_id_fragment)),
        ),
        FieldSpec::required(
            "Aadhaar Name",
            MaskPolicy::Fraction(0.35),
            Strategy::Anchor(name_search()),
        ),
        FieldSpec::required(
            "Aadhaar DOB",
            MaskPolicy::Fraction(0.80),
            Strategy::Pattern(PatternFilter::prefix(AADHAAR_DATE.clone())),
        )
        .or_else(Strategy::LineMatch(LineMatch::first(DOB_LABEL.clone()))),
        FieldSpec::required(
            "Aadhaar Gender",
            MaskPolicy::Full,
            Strategy::LineMatch(LineMatch::last(GENDER.clone())),
        ),
        FieldSpec::optional(
            "Aadhaar Address",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::search(PLACES.clone())),
        ),
        FieldSpec::optional(
            "Aadhaar Pincode",
            MaskPolicy::Fraction(0.30),
            Strategy::Pattern(PatternFilter::shape(is_pincode)),
        ),
        qr_codes("Aadhaar QR-Codes"),
    ]
});
