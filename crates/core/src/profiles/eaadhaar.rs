//! E-Aadhaar letter (downloaded, "electronically generated").

use once_cell::sync::Lazy;

use super::qr_codes;
use crate::extract::{AnchorSearch, FieldSpec, LineMatch, MaskPolicy, PatternFilter, Strategy};
use crate::rules::heuristics::{
    is_mobile_number, is_national_id_fragment, is_pincode, EAADHAAR_DATE, GENDER_LOOSE, PLACES,
};
use crate::rules::PatternSet;

/// The addressee block: three lines after "To", and three lines above the
/// date or signature block at the bottom of the letter.
fn name_union() -> Strategy {
    let top = AnchorSearch::lines(PatternSet::new(&[r"\b\w*(to)\b"]))
        .without_digit_lines()
        .window(3)
        .drop_last_word();
    let bottom = AnchorSearch::lines(PatternSet::new(&[
        r"\b\w*(date|signature|dob|dos|birth|bith|year|dou|binh|008|pub|farce|binn|yoas|doe)\b",
    ]))
    .reversed()
    .without_digit_lines()
    .window(3)
    .drop_last_word();
    Strategy::Union(vec![Strategy::Anchor(top), Strategy::Anchor(bottom)])
}

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required("E-Aadhaar Name", MaskPolicy::Full, name_union()),
        FieldSpec::required(
            "E-Aadhaar Number",
            MaskPolicy::Fraction(0.50),
            Strategy::Pattern(PatternFilter::shape(is_national_id_fragment)),
        ),
        FieldSpec::required(
            "E-Aadhaar DOB",
            MaskPolicy::Fraction(0.80),
            Strategy::Pattern(PatternFilter::prefix(EAADHAAR_DATE.clone())),
        ),
        FieldSpec::required(
            "E-Aadhaar Gender",
            MaskPolicy::Full,
            Strategy::LineMatch(LineMatch::last(GENDER_LOOSE.clone())),
        ),
        FieldSpec::optional(
            "E-Aadhaar Address",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::search(PLACES.clone()).exclude(PatternSet::new(&[
                r"\b\w*(?:electronica.ly|electronically|sitrongs|elactronically.generated|generated)\b",
            ]))),
        ),
        FieldSpec::optional(
            "E-Aadhaar Mobile",
            MaskPolicy::Fraction(0.54),
            Strategy::Pattern(PatternFilter::shape(is_mobile_number)),
        ),
        FieldSpec::optional(
            "E-Aadhaar Pincode",
            MaskPolicy::Fraction(0.30),
            Strategy::Pattern(PatternFilter::shape(is_pincode)),
        ),
        qr_codes("E-Aadhaar QR-Codes"),
    ]
});

#[cfg(test)]
mod tests {
    use crate::extract::test_support::page;
    use crate::{DocumentKind, ExtractionContext};

    #[test]
    fn test_letter_fields() {
        let page = page(&[
            "Enrolment No.:",
            "To",
            "Ravi Sharma S/O",
            "Flat 12 MG Road",
            "Pune Maharashtra 411001",
            "Mobile: 9876543210",
            "1234 5678 9012",
            "Ravi Sharma",
            "DOB: 01/01/1990",
            "MALE",
        ]);
        let ctx = ExtractionContext::new(&page, &[]);
        let fields = DocumentKind::EAadhaar.extract_fields(&ctx);

        // top block: last word dropped from each of the three lines
        assert!(fields[0].raw_text.starts_with("Ravi Sharma Flat 12 MG Pune Maharashtra"));
        assert!(!fields[0].is_empty());
        assert_eq!(fields[1].raw_text, "1234 5678 9012");
        assert_eq!(fields[2].raw_text, "01/01/1990");
        assert_eq!(fields[3].raw_text, "MALE");
        assert_eq!(fields[4].raw_text, "Pune Maharashtra");
        assert_eq!(fields[5].raw_text, "9876543210");
        assert_eq!(fields[6].raw_text, "411001");
    }
}
