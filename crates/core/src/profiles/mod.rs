//! Per-document field lists.
//!
//! Every profile is a static list of [`FieldSpec`]s in evaluation order.
//! Required fields gate acceptance at strict redaction levels.

use crate::extract::{extract_field, ExtractedField, ExtractionContext, FieldSpec, MaskPolicy, Strategy};
use crate::DocumentKind;

mod aadhaar;
mod cdsl;
mod driving_license;
mod eaadhaar;
mod epan;
mod pan;
mod passport;

impl DocumentKind {
    pub fn field_specs(&self) -> &'static [FieldSpec] {
        match self {
            DocumentKind::Cdsl => &cdsl::FIELDS,
            DocumentKind::EPan => &epan::FIELDS,
            DocumentKind::Pan => &pan::FIELDS,
            DocumentKind::EAadhaar => &eaadhaar::FIELDS,
            DocumentKind::Aadhaar => &aadhaar::FIELDS,
            DocumentKind::Passport => &passport::FIELDS,
            DocumentKind::DrivingLicense => &driving_license::FIELDS,
        }
    }

    /// Extracts every field of this kind's profile, in profile order.
    pub fn extract_fields(&self, ctx: &ExtractionContext<'_>) -> Vec<ExtractedField> {
        log::info!("[Extract] extracting {} fields", self.display_name());
        self.field_specs()
            .iter()
            .map(|spec| extract_field(spec, ctx))
            .collect()
    }
}

fn qr_codes(label: &'static str) -> FieldSpec {
    FieldSpec::optional(label, MaskPolicy::Full, Strategy::QrCode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_profile_has_required_fields() {
        for kind in DocumentKind::PRIORITY {
            let specs = kind.field_specs();
            assert!(specs.iter().any(|s| s.required), "{kind}");
            let mut labels: Vec<_> = specs.iter().map(|s| s.label).collect();
            labels.dedup();
            assert_eq!(labels.len(), specs.len(), "{kind} repeats a label");
        }
    }
}
