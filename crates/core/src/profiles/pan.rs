//! Physical PAN card.

use once_cell::sync::Lazy;

use super::qr_codes;
use crate::extract::{Anchor, AnchorSearch, FieldSpec, KeepFilter, MaskPolicy, PatternFilter, Strategy};
use crate::rules::heuristics::{is_tax_id, DATE, GENDER, PLACES};
use crate::rules::PatternSet;

/// Labelled layout: names follow a "Name" caption.
fn labelled_names() -> AnchorSearch {
    AnchorSearch::lines(PatternSet::new(&[
        r"\b(name|uiname|mame|nun|alatar|fname|hehe|itiame)\b",
    ]))
    .break_on(PatternSet::new(&[r"\b\w*(gate|auth|ory)\b"]))
    .break_on(PatternSet::new(&[r"\b(date|birth|signature)\b"]))
    .skip(PatternSet::new(&[
        r"\b\w*(name|uiname|mame|nun|alatar|fname|hehe|itiame)\b",
        r"\b\w*(father['’]s|father|eather['’]s|fathar['’]s|fathers|ffatugr|ffatubr['’]s)\b",
        r"\b\w*(hratlifies|facer|pacers|hratlieies|name|gather)\b",
    ]))
    .skip(DATE.clone())
    .keep(KeepFilter {
        min_len: 2,
        no_digits: true,
        ..Default::default()
    })
}

/// Older layout without captions: the upper-case run before the
/// "Permanent Account Number" caption, minus the header boilerplate.
fn unlabelled_names() -> AnchorSearch {
    AnchorSearch::tokens(Anchor::Start)
        .break_on(PatternSet::new(&[
            r"\b\w*(permanent|petmancnt|account|number|ermanent|ask|managers)\b",
        ]))
        .skip(PatternSet::new(&[
            r"\b\w*(sizer|feat|ana|uae|income|tax|department|departmen|indi|my|arg|fears|india|[0-9])\b",
            r"\b\w*(govt|goty|sree|feast|ofl|goyt|os|xe|ar|umdi|es|set|oe|oome|iid|fetax|incometaxdepartment|tincome|of|si|ali|[0-9])\b",
            r"\b\w*(pras|ta|ag|oreax|fart|mic|ncome|are|art|we|gove|tere|sittex|[0-9])\b",
        ]))
        .skip(DATE.clone())
        .keep(KeepFilter {
            min_len: 2,
            uppercase_only: true,
            alphabetic_only: true,
            ..Default::default()
        })
}

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required(
            "Pancard Number",
            MaskPolicy::Fraction(0.65),
            Strategy::Pattern(PatternFilter::shape(is_tax_id)),
        ),
        FieldSpec::required(
            "Pancard DOB",
            MaskPolicy::Fraction(0.80),
            Strategy::Pattern(PatternFilter::search(DATE.clone())),
        ),
        FieldSpec::required(
            "Pancard Name",
            MaskPolicy::Fraction(0.50),
            Strategy::Anchor(labelled_names()),
        )
        .or_else(Strategy::Anchor(unlabelled_names())),
        FieldSpec::optional(
            "Pancard Gender",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::search(GENDER.clone()).first_only()),
        ),
        FieldSpec::optional(
            "Pancard Address",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::search(PLACES.clone())),
        ),
        qr_codes("Pancard QR-Codes"),
    ]
});

#[cfg(test)]
mod tests {
    use crate::extract::test_support::page;
    use crate::{BBox, DocumentKind, ExtractionContext};

    #[test]
    fn test_labelled_card() {
        let page = page(&[
            "INCOME TAX DEPARTMENT",
            "Permanent Account Number Card",
            "ABCDE1234F",
            "Name",
            "RAVI SHARMA",
            "Father's Name",
            "SURESH VERMA",
            "Date of Birth",
            "01/01/1990",
            "Signature",
        ]);
        let ctx = ExtractionContext::new(&page, &[]);
        let fields = DocumentKind::Pan.extract_fields(&ctx);

        assert_eq!(fields[0].raw_text, "ABCDE1234F");
        assert_eq!(fields[0].coordinates, vec![BBox::new(0, 80, 65, 110)]);
        assert_eq!(fields[1].coordinates, vec![BBox::new(0, 320, 80, 350)]);
        assert_eq!(fields[2].raw_text, "RAVI SHARMA SURESH VERMA");
        assert_eq!(fields[2].coordinates.len(), 4);
        assert_eq!(fields[2].coordinates[0], BBox::new(0, 160, 50, 190));
    }

    #[test]
    fn test_unlabelled_card_uses_upper_case_run() {
        let page = page(&[
            "INCOME TAX DEPARTMENT GOVT. OF INDIA",
            "RAVI SHARMA",
            "SURESH VERMA",
            "01/01/1990",
            "Permanent Account Number",
            "ABCDE1234F",
        ]);
        let ctx = ExtractionContext::new(&page, &[]);
        let fields = DocumentKind::Pan.extract_fields(&ctx);
        assert_eq!(fields[2].raw_text, "RAVI SHARMA SURESH VERMA");
        assert_eq!(fields[2].coordinates.len(), 4);
    }
}
