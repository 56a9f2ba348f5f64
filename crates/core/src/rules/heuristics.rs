//! Shared token shapes and OCR-tolerant patterns.
//!
//! Shapes are plain predicates over a single token text. Patterns are
//! alternations of the spellings Tesseract produces for common labels on
//! Indian identity documents.

use once_cell::sync::Lazy;

use super::PatternSet;

// ============================================================================
// Character classes
// ============================================================================

/// Upper-case in the sense of "has a cased letter and no lower-case one".
pub fn is_upper(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

pub fn is_alpha(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_alphabetic)
}

pub fn is_digit_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

pub fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

fn leading_digits(text: &str, n: usize) -> bool {
    text.chars().take(n).filter(char::is_ascii_digit).count() == n
}

// ============================================================================
// Token shapes
// ============================================================================

/// PAN: 10 upper-case alphanumerics with at least one letter and one digit.
pub fn is_tax_id(text: &str) -> bool {
    text.chars().count() == 10
        && text
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && has_digit(text)
        && text.chars().any(|c| c.is_ascii_alphabetic())
}

/// Aadhaar numbers come out of OCR as 4-digit groups, or as one
/// 14-character run when the spaces survive.
pub fn is_national_id_fragment(text: &str) -> bool {
    is_digit_only(text) && matches!(text.len(), 4 | 14)
}

/// Six-digit pincode, possibly followed by one trailing OCR artefact.
pub fn is_pincode(text: &str) -> bool {
    matches!(text.chars().count(), 6 | 7) && leading_digits(text, 6)
}

pub fn is_six_digit(text: &str) -> bool {
    is_digit_only(text) && text.len() == 6
}

pub fn is_mobile_number(text: &str) -> bool {
    matches!(text.chars().count(), 10 | 11) && leading_digits(text, 10)
}

pub fn is_driving_license_number(text: &str) -> bool {
    is_digit_only(text) && text.len() == 11
}

/// Passport number: a letter and 7 digits, plus the variants OCR yields
/// when the letter is misread or the number is split.
pub fn is_passport_number(text: &str) -> bool {
    static STRICT: Lazy<PatternSet> = Lazy::new(|| PatternSet::exact(&[r"^[A-Z][0-9]{7}$"]));
    if STRICT.is_match(text) {
        return true;
    }
    let len = text.chars().count();
    if is_digit_only(text) && (6..=8).contains(&len) {
        return true;
    }
    let mut chars = text.chars();
    let first_upper = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    let rest_has_digit = chars.any(|c| c.is_ascii_digit());
    if matches!(len, 6 | 9 | 10) && first_upper && rest_has_digit {
        return true;
    }
    (6..=8).contains(&len) && has_digit(text)
}

/// Machine readable zone fragment: filler characters plus something else.
pub fn is_machine_readable(text: &str) -> bool {
    text.contains('<') && text.chars().any(|c| c != '<')
}

// ============================================================================
// Shared patterns
// ============================================================================

/// Dates anywhere in a token, as printed on PAN cards.
pub static DATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\d{2}/\d{2}/\d{4}|\d{2}-\d{2}-\d{4}|\d{4}-\d{4}|\d{4}/\d{4}|\d{2}/\d{2}/\d{2}|\d{1}/\d{2}/\d{4}",
    ])
});

/// Dates at the start of a token on E-PAN letters.
pub static EPAN_DATE: Lazy<PatternSet> =
    Lazy::new(|| PatternSet::new(&[r"\d{2}/\d{2}/\d{4}|\d{2}-\d{2}-\d{4}|\d{4}/\d{4}"]));

/// Dates on Aadhaar cards, including OCR-mangled separators and the
/// year-of-birth-only layout of older cards.
pub static AADHAAR_DATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\b\d{2}/\d{2}/\d{4}|\b\d{2}/\d{5}|\b\d{2}-\d{2}-\d{4}|\b\d{4}/\d{4}|\b\d{2}/\d{2}/\d{2}|\b\d{1}/\d{2}/\d{4}|\b[Oo]?\d{1}/\d{5}",
        r"\b(19|20)\d{2}\b",
    ])
});

/// Aadhaar dates without the bare year form.
pub static EAADHAAR_DATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\b\d{2}/\d{2}/\d{4}|\b\d{2}/\d{5}|\b\d{2}-\d{2}-\d{4}|\b\d{4}/\d{4}|\b\d{2}/\d{2}/\d{2}|\b\d{1}/\d{2}/\d{4}|\b[Oo]?\d{1}/\d{5}",
    ])
});

/// Dates on passports; also used to stop name collection.
pub static PASSPORT_DATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\d{2}/\d{2}/\d{4}|\d{2}-\d{2}-\d{4}|\d{4}/\d{4}|\d{2}/\d{2}/\d{2}|\d{1}/\d{2}/\d{4}",
    ])
});

/// Dates on driving licenses, which also use dots.
pub static DL_DATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\b\d{2}/\d{2}/\d{4}|\b\d{2}/\d{5}|\b\d{2}-\d{2}-\d{4}|\b\d{4}/\d{4}|\b\d{2}/\d{2}/\d{2}|\b\d{1}/\d{2}/\d{4}|\b[Oo]?\d{1}/\d{5}",
        r"\b\d{2}\.\d{2}\.\d{4}",
        r"\b\d{4}-\d{4}\b",
    ])
});

pub static GENDER: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\b(?:male|female|fmale|femalp|femere|femala|mate|femate|#femste|fomale|fertale|malo|femsle|fade|ferme|famate)\b",
    ])
});

/// Gender spellings with an arbitrary prefix, for letters where the label
/// and the value are glued together.
pub static GENDER_LOOSE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(&[
        r"\b\w*(male|female|fmale|femalp|femere|femala|mala|mate|femate|femste|fomale|fertale|malo|femsle|fade|ferme|famate)\b",
    ])
});

pub static DOB_LABEL: Lazy<PatternSet> =
    Lazy::new(|| PatternSet::new(&[r"\b\w*(dob|doe|rryoob|bieth|binh|dor|dow|dod)\b"]));

/// Indian states, union territories and major cities.
pub static PLACES: Lazy<PatternSet> = Lazy::new(|| {
    let names = load_word_list(include_str!("../../data/places.txt"));
    if names.is_empty() {
        log::error!("[Rules] places.txt is empty");
        return PatternSet::default();
    }
    let alternation = names
        .iter()
        .map(|name| {
            name.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");
    PatternSet::new(&[format!(r"\b(?:{})\b", alternation)])
});

fn load_word_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
