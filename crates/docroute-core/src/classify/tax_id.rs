//! Tax identifier (NIF) matching.

use image::DynamicImage;
use tracing::debug;

use super::keywords::matched_keywords;
use super::{MatchCandidate, Matcher};
use crate::models::outcome::{MatchEvidence, MatchMethod};
use crate::models::supplier::normalize_digits;
use crate::registry::SupplierRegistry;

/// Confidence of a tax identifier match.
pub const TAX_ID_CONFIDENCE: f32 = 0.95;

/// Finds a registered tax identifier anywhere in the text.
///
/// Separators are removed from both sides first, so `501 496 912`,
/// `501.496.912` and `501496912` all match. When several registered
/// identifiers occur, the earliest registry entry wins.
#[derive(Debug, Default)]
pub struct TaxIdMatcher;

impl TaxIdMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for TaxIdMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::TaxId
    }

    fn authoritative(&self) -> bool {
        true
    }

    fn attempt(
        &self,
        text: &str,
        _image: Option<&DynamicImage>,
        registry: &SupplierRegistry,
    ) -> Option<MatchCandidate> {
        if text.trim().is_empty() {
            return None;
        }

        let normalized = normalize_digits(text);
        let mut found = registry
            .tax_ids()
            .filter(|(_, tax_id)| normalized.contains(tax_id.as_str()));

        let (owner, tax_id) = found.next()?;
        let others: Vec<String> = found.map(|(_, t)| t).collect();
        if !others.is_empty() {
            debug!(
                "Tax id {} wins over {:?} by registry order",
                tax_id, others
            );
        }

        // A variant sharing the identifier takes over when its keywords occur.
        let lowered = text.to_lowercase();
        let supplier = registry
            .variants_of(&owner.identity)
            .find(|variant| !matched_keywords(variant, &lowered).is_empty())
            .map(|variant| variant.identity.clone())
            .unwrap_or_else(|| owner.identity.clone());

        Some(MatchCandidate {
            supplier,
            confidence: TAX_ID_CONFIDENCE,
            method: MatchMethod::TaxId,
            evidence: MatchEvidence::TaxId { tax_id },
        })
    }
}
