//! Per-document keyword signatures.
//!
//! Signatures live in `data/signatures.json` and are compiled once. A
//! document kind matches when any OCR text matches any of its groups.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Deserialize;

use super::PatternSet;
use crate::DocumentKind;

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Deserialize)]
struct SignatureConfig {
    #[allow(dead_code)]
    version: String,
    documents: Vec<DocumentSignature>,
}

#[derive(Debug, Deserialize)]
struct DocumentSignature {
    kind: DocumentKind,
    groups: Vec<String>,
}

static SIGNATURES: Lazy<HashMap<DocumentKind, PatternSet>> = Lazy::new(|| {
    let json_str = include_str!("../../data/signatures.json");
    match serde_json::from_str::<SignatureConfig>(json_str) {
        Ok(config) => config
            .documents
            .into_iter()
            .map(|doc| (doc.kind, PatternSet::new(&doc.groups)))
            .collect(),
        Err(e) => {
            log::error!("[Rules] failed to parse signatures.json: {}", e);
            HashMap::new()
        }
    }
});

// ============================================================================
// Lookup
// ============================================================================

/// Compiled signature of a document kind.
pub fn signature(kind: DocumentKind) -> Option<&'static PatternSet> {
    SIGNATURES.get(&kind)
}

/// True if any of `texts` matches the signature of `kind`.
pub fn matches_any<'a>(kind: DocumentKind, texts: impl IntoIterator<Item = &'a str>) -> bool {
    match signature(kind) {
        Some(set) => texts.into_iter().any(|t| set.is_match(t)),
        None => false,
    }
}
