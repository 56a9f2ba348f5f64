//! E-PAN letter issued by the Income Tax Department.

use once_cell::sync::Lazy;

use super::qr_codes;
use crate::extract::{AnchorSearch, FieldSpec, MaskPolicy, PatternFilter, Strategy};
use crate::rules::heuristics::{is_tax_id, EPAN_DATE};
use crate::rules::PatternSet;

/// Line `offset` lines below a literal caption, minus its last word.
fn below(caption: &str, offset: usize) -> Strategy {
    Strategy::Anchor(
        AnchorSearch::lines(PatternSet::exact(&[regex::escape(caption)]))
            .offset(offset)
            .window(1)
            .drop_last_word(),
    )
}

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required(
            "E-Pancard Number",
            MaskPolicy::Fraction(0.65),
            Strategy::Pattern(PatternFilter::shape(is_tax_id)),
        ),
        FieldSpec::required(
            "E-Pancard DOB",
            MaskPolicy::Fraction(0.54),
            Strategy::Pattern(PatternFilter::prefix(EPAN_DATE.clone())),
        ),
        FieldSpec::required(
            "E-Pancard Gender",
            MaskPolicy::Full,
            Strategy::Pattern(
                PatternFilter::prefix(PatternSet::exact(&["Male|Female"])).first_only(),
            ),
        ),
        FieldSpec::required(
            "E-Pancard Client Name",
            MaskPolicy::Full,
            Strategy::Union(vec![below("ata / Name", 1), below("CBD Belapur", 1)]),
        ),
        FieldSpec::required(
            "E-Pancard Client Father Name",
            MaskPolicy::Full,
            Strategy::Union(vec![below("Father's name", 1), below("Rat 1 AT", 2)]),
        ),
        qr_codes("E-Pancard QR-Codes"),
    ]
});
