//! Supported identity document types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Identity document type.
///
/// Variants are declared in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "CDSL")]
    Cdsl,
    #[serde(rename = "E-PANCARD")]
    EPan,
    #[serde(rename = "PANCARD")]
    Pan,
    #[serde(rename = "E-AADHAAR")]
    EAadhaar,
    #[serde(rename = "AADHAAR")]
    Aadhaar,
    #[serde(rename = "PASSPORT")]
    Passport,
    #[serde(rename = "DRIVING-LICENSE")]
    DrivingLicense,
}

impl DocumentKind {
    /// Classification priority, highest first.
    pub const PRIORITY: [DocumentKind; 7] = [
        DocumentKind::Cdsl,
        DocumentKind::EPan,
        DocumentKind::Pan,
        DocumentKind::EAadhaar,
        DocumentKind::Aadhaar,
        DocumentKind::Passport,
        DocumentKind::DrivingLicense,
    ];

    /// Stable code used in signatures and logs.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentKind::Cdsl => "CDSL",
            DocumentKind::EPan => "E-PANCARD",
            DocumentKind::Pan => "PANCARD",
            DocumentKind::EAadhaar => "E-AADHAAR",
            DocumentKind::Aadhaar => "AADHAAR",
            DocumentKind::Passport => "PASSPORT",
            DocumentKind::DrivingLicense => "DRIVING-LICENSE",
        }
    }

    /// Human readable name used in task results.
    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentKind::Cdsl => "CDSL",
            DocumentKind::EPan => "E-Pancard",
            DocumentKind::Pan => "Pancard",
            DocumentKind::EAadhaar => "E-Aadhaar",
            DocumentKind::Aadhaar => "Aadhaar",
            DocumentKind::Passport => "Passport",
            DocumentKind::DrivingLicense => "Driving License",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['_', ' '], "-");
        DocumentKind::PRIORITY
            .into_iter()
            .find(|kind| kind.code() == normalized)
            .ok_or_else(|| CoreError::UnknownDocumentKind(s.to_string()))
    }
}
