//! Indian passport, data page.

use once_cell::sync::Lazy;

use crate::extract::{AnchorSearch, FieldSpec, KeepFilter, MaskPolicy, PatternFilter, Strategy};
use crate::rules::heuristics::{
    is_machine_readable, is_passport_number, is_six_digit, PASSPORT_DATE, PLACES,
};
use crate::rules::PatternSet;

fn names() -> AnchorSearch {
    AnchorSearch::lines(PatternSet::new(&[
        r"\b\w*(surname|sermnemes|somame|sungme|semane|suname|surmame|sumama|sumame|ssurmame|weesenet|canam|sumsme|senane|surnane|sarnome)\b",
    ]))
    .break_on(PatternSet::new(&[
        r"\b(walionaiity|attonallty|nekiopalty|arsgiaen|natonaity|nationality|sex|sax|danga|st|indian)\b",
    ]))
    .break_on(PASSPORT_DATE.clone())
    .skip(PatternSet::new(&[
        r"\b(given|name|give|seen|nee|ot|attonallty|walionaiity|fauna|ama|nameis|amet|rear|nat|feast|ss|a|of|pat|ast|fa|ers|iee|oe|in|ait|beat)\b",
        r"\b(cee|ae|ane|vt|rome|udorretiecom|naly|meh|l|be|ere|x|ee|sh|senmies|os|mee|gies|cuenvermeias|va|tog|isoia|sen|‘wha|tens|ge|wale|is|cn|wei|as|ie|cssmaeall)\b",
        r"(=|-|//\\|~|/)",
    ]))
    .keep(KeepFilter {
        no_digits: true,
        ..Default::default()
    })
}

pub(super) static FIELDS: Lazy<Vec<FieldSpec>> = Lazy::new(|| {
    vec![
        FieldSpec::required(
            "Passport Number",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::shape(is_passport_number).exclude(PASSPORT_DATE.clone())),
        ),
        FieldSpec::required("Passport Names", MaskPolicy::Fraction(0.50), Strategy::Anchor(names())),
        FieldSpec::optional(
            "Passport Dates",
            MaskPolicy::Fraction(0.50),
            Strategy::Pattern(PatternFilter::search(PASSPORT_DATE.clone())),
        ),
        FieldSpec::optional(
            "Passport MRZ",
            MaskPolicy::Full,
            Strategy::Pattern(PatternFilter::shape(is_machine_readable)),
        ),
        FieldSpec::optional(
            "Passport Address",
            MaskPolicy::Full,
            Strategy::Union(vec![
                Strategy::Pattern(PatternFilter::search(PLACES.clone())),
                Strategy::Pattern(PatternFilter::shape(is_six_digit)),
            ]),
        ),
    ]
});

#[cfg(test)]
mod tests {
    use crate::extract::test_support::page;
    use crate::{BBox, DocumentKind, ExtractionContext};

    #[test]
    fn test_data_page() {
        let page = page(&[
            "REPUBLIC OF INDIA",
            "J8369854",
            "Surname",
            "SHARMA",
            "Given Name(s)",
            "RAVI",
            "Nationality INDIAN",
            "01/01/1990",
            "Place of Birth PUNE",
            "P<INDSHARMA<<RAVI<<<<<<<<<<<<<",
        ]);
        let ctx = ExtractionContext::new(&page, &[]);
        let fields = DocumentKind::Passport.extract_fields(&ctx);

        assert_eq!(fields[0].raw_text, "J8369854");
        assert_eq!(fields[1].raw_text, "SHARMA RAVI");
        assert_eq!(fields[1].coordinates[0], BBox::new(0, 120, 50, 150));
        assert_eq!(fields[2].raw_text, "01/01/1990");
        assert_eq!(fields[3].coordinates.len(), 1);
        assert_eq!(fields[4].raw_text, "PUNE");
    }
}
