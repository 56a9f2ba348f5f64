//! CDSL KYC acknowledgement.

use once_cell::sync::Lazy;

use crate::extract::{Anchor, AnchorSearch, FieldSpec, KeepFilter, MaskPolicy, PatternFilter, Shape, Strategy};
use crate::rules::heuristics::is_tax_id;
use crate::rules::PatternSet;

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required(
            "CDSL Pancard Number",
            MaskPolicy::Fraction(0.65),
            Strategy::Pattern(PatternFilter::shape(is_tax_id).first_only()),
        ),
        FieldSpec::required(
            "CDSL Client Name",
            MaskPolicy::Full,
            Strategy::Anchor(
                AnchorSearch::tokens(Anchor::Shape(Shape(is_tax_id)))
                    .break_on(PatternSet::words(&[
                        "current", "kin", "ikyc", "kyc", "kra", "kyo", "date", "status", "not",
                        "available",
                    ]))
                    .keep(KeepFilter {
                        uppercase_only: true,
                        alphabetic_only: true,
                        ..Default::default()
                    })
                    .merge_span(),
            ),
        ),
    ]
});
