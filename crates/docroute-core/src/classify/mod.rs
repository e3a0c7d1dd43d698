//! Supplier classification.
//!
//! Matchers form a fixed, ordered list. The list order is the tie-break
//! order, and an authoritative matcher (the tax identifier) ends the search
//! as soon as it fires. The remaining matchers all run; when two of them
//! agree on a supplier the verdict becomes a hybrid.

pub mod keywords;
pub mod ssim;
pub mod tax_id;
pub mod template;

use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::models::config::ClassificationConfig;
use crate::models::outcome::{ClassificationResult, MatchEvidence, MatchMethod};
use crate::registry::SupplierRegistry;

pub use keywords::KeywordMatcher;
pub use tax_id::TaxIdMatcher;
pub use template::TemplateMatcher;

/// One matcher's proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// Supplier identity.
    pub supplier: String,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    pub method: MatchMethod,
    pub evidence: MatchEvidence,
}

/// A single identification strategy.
pub trait Matcher {
    /// Method reported for candidates of this matcher.
    fn method(&self) -> MatchMethod;

    /// Whether a candidate from this matcher ends classification.
    fn authoritative(&self) -> bool {
        false
    }

    /// Try to identify the supplier.
    fn attempt(
        &self,
        text: &str,
        image: Option<&DynamicImage>,
        registry: &SupplierRegistry,
    ) -> Option<MatchCandidate>;
}

/// Runs the matchers and arbitrates between their candidates.
pub struct Classifier {
    registry: Arc<SupplierRegistry>,
    matchers: Vec<Box<dyn Matcher>>,
    hybrid_floor: f32,
}

impl Classifier {
    /// Classifier with the standard tax-id, keyword, template order.
    pub fn new(registry: Arc<SupplierRegistry>, config: &ClassificationConfig) -> Self {
        let matchers: Vec<Box<dyn Matcher>> = vec![
            Box::new(TaxIdMatcher::new()),
            Box::new(KeywordMatcher::new()),
            Box::new(TemplateMatcher::new(config.template_threshold)),
        ];
        Self::with_matchers(registry, matchers, config.hybrid_floor)
    }

    /// Classifier with a custom matcher list.
    pub fn with_matchers(
        registry: Arc<SupplierRegistry>,
        matchers: Vec<Box<dyn Matcher>>,
        hybrid_floor: f32,
    ) -> Self {
        Self {
            registry,
            matchers,
            hybrid_floor,
        }
    }

    pub fn registry(&self) -> &Arc<SupplierRegistry> {
        &self.registry
    }

    /// Identify the supplier of a document.
    pub fn classify(&self, text: &str, image: Option<&DynamicImage>) -> ClassificationResult {
        let mut candidates = Vec::new();

        for matcher in &self.matchers {
            let Some(candidate) = matcher.attempt(text, image, &self.registry) else {
                debug!("{} matcher: no candidate", matcher.method());
                continue;
            };
            debug!(
                "{} matcher: {} ({:.2})",
                matcher.method(),
                candidate.supplier,
                candidate.confidence
            );

            if matcher.authoritative() {
                return single(candidate);
            }
            candidates.push(candidate);
        }

        self.arbitrate(candidates)
    }

    /// Combine non-authoritative candidates, given in matcher order.
    fn arbitrate(&self, candidates: Vec<MatchCandidate>) -> ClassificationResult {
        // Largest group of agreeing candidates; the earliest supplier wins ties.
        let mut best_group: Option<(usize, &str)> = None;
        for candidate in &candidates {
            let size = candidates
                .iter()
                .filter(|c| c.supplier == candidate.supplier)
                .count();
            if size >= 2 && best_group.is_none_or(|(best, _)| size > best) {
                best_group = Some((size, candidate.supplier.as_str()));
            }
        }

        if let Some((_, supplier)) = best_group {
            let agreeing: Vec<&MatchCandidate> =
                candidates.iter().filter(|c| c.supplier == supplier).collect();
            let max = agreeing
                .iter()
                .map(|c| c.confidence)
                .fold(0.0f32, f32::max);

            return ClassificationResult {
                supplier: Some(supplier.to_string()),
                confidence: max.max(self.hybrid_floor).min(1.0),
                method: MatchMethod::Hybrid,
                contributing: agreeing.iter().map(|c| c.method).collect(),
                evidence: agreeing.iter().map(|c| c.evidence.clone()).collect(),
            };
        }

        // Disagreement or a single candidate: strictly higher confidence wins.
        let mut best: Option<MatchCandidate> = None;
        for candidate in candidates {
            if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
                best = Some(candidate);
            }
        }

        best.map(single).unwrap_or_else(ClassificationResult::unmatched)
    }
}

fn single(candidate: MatchCandidate) -> ClassificationResult {
    ClassificationResult {
        supplier: Some(candidate.supplier),
        confidence: candidate.confidence,
        method: candidate.method,
        contributing: Vec::new(),
        evidence: vec![candidate.evidence],
    }
}
