//! Client source signature matching
//!
//! Matching is a case-insensitive substring test. It is deliberately loose:
//! disguised tool names still match, at the cost of false positives such as
//! "hook" inside an unrelated word. Allow markers always win.

use super::category::CheatCategory;

/// One row of the marker → category table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRule {
    pub marker: String,
    pub category: CheatCategory,
}

impl SignatureRule {
    pub fn new(marker: impl Into<String>, category: CheatCategory) -> Self {
        Self {
            marker: marker.into().trim().to_lowercase(),
            category,
        }
    }
}

/// Allow-list, blocked-source list and the ordered signature table.
/// All markers are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct SignatureMatcher {
    allow: Vec<String>,
    blocked: Vec<String>,
    signatures: Vec<SignatureRule>,
}

impl SignatureMatcher {
    pub fn new(allow: Vec<String>, blocked: Vec<String>, signatures: Vec<SignatureRule>) -> Self {
        let normalize = |markers: Vec<String>| -> Vec<String> {
            markers.into_iter().map(|m| m.trim().to_lowercase()).collect()
        };

        Self {
            allow: normalize(allow),
            blocked: normalize(blocked),
            signatures,
        }
    }

    /// True if the source carries a trusted first-party marker
    pub fn is_allowed(&self, src: &str) -> bool {
        let src = src.to_lowercase();
        self.allow.iter().any(|m| src.contains(m.as_str()))
    }

    /// True if the source carries a blocked-source marker and no allow marker
    pub fn is_blocked_source(&self, src: &str) -> bool {
        self.blocked_marker(src).is_some()
    }

    /// The first blocked-source marker found in `src`, unless allow-listed
    pub fn blocked_marker(&self, src: &str) -> Option<&str> {
        if self.is_allowed(src) {
            return None;
        }
        let src = src.to_lowercase();
        self.blocked
            .iter()
            .find(|m| src.contains(m.as_str()))
            .map(String::as_str)
    }

    /// Single pass over the signature table in order; first match wins.
    /// Allow-listed sources never match.
    pub fn match_signature(&self, src: &str) -> Option<&SignatureRule> {
        if self.is_allowed(src) {
            return None;
        }
        let src = src.to_lowercase();
        self.signatures
            .iter()
            .find(|rule| src.contains(rule.marker.as_str()))
    }

    pub fn signatures(&self) -> &[SignatureRule] {
        &self.signatures
    }

    pub fn blocked_len(&self) -> usize {
        self.blocked.len()
    }
}
