//! Keyword matching.

use image::DynamicImage;

use super::{MatchCandidate, Matcher};
use crate::models::outcome::{MatchEvidence, MatchMethod};
use crate::models::supplier::SupplierProfile;
use crate::registry::SupplierRegistry;

const BASE_CONFIDENCE: f32 = 0.50;
const RATIO_WEIGHT: f32 = 0.40;
const MAX_CONFIDENCE: f32 = 0.90;

/// Scores suppliers by the share of their keywords found in the text.
#[derive(Debug, Default)]
pub struct KeywordMatcher;

impl KeywordMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl Matcher for KeywordMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Keyword
    }

    fn attempt(
        &self,
        text: &str,
        _image: Option<&DynamicImage>,
        registry: &SupplierRegistry,
    ) -> Option<MatchCandidate> {
        let lowered = text.to_lowercase();
        if lowered.trim().is_empty() {
            return None;
        }

        let mut best: Option<(&SupplierProfile, Vec<String>, f32)> = None;
        for profile in registry.iter() {
            if profile.keywords.is_empty() {
                continue;
            }
            let matched = matched_keywords(profile, &lowered);
            if matched.is_empty() {
                continue;
            }

            let ratio = matched.len() as f32 / profile.keywords.len() as f32;
            if best.as_ref().is_none_or(|(_, _, r)| ratio > *r) {
                best = Some((profile, matched, ratio));
            }
        }

        let (profile, matched, ratio) = best?;
        Some(MatchCandidate {
            supplier: profile.identity.clone(),
            confidence: keyword_confidence(ratio),
            method: MatchMethod::Keyword,
            evidence: MatchEvidence::Keywords { matched, ratio },
        })
    }
}

/// Confidence for a keyword ratio.
pub fn keyword_confidence(ratio: f32) -> f32 {
    (BASE_CONFIDENCE + RATIO_WEIGHT * ratio).clamp(BASE_CONFIDENCE, MAX_CONFIDENCE)
}

/// Keywords of `profile` that occur in already lower-cased text.
pub(crate) fn matched_keywords(profile: &SupplierProfile, lowered: &str) -> Vec<String> {
    profile
        .keywords
        .iter()
        .filter(|k| {
            let k = k.trim().to_lowercase();
            !k.is_empty() && lowered.contains(&k)
        })
        .cloned()
        .collect()
}
