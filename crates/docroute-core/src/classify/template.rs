//! Visual template matching against reference page headers.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use tracing::debug;

use super::ssim::{ssim, WINDOW};
use super::{MatchCandidate, Matcher};
use crate::models::outcome::{MatchEvidence, MatchMethod};
use crate::models::supplier::SupplierProfile;
use crate::registry::SupplierRegistry;

/// Confidence assigned to a score exactly at the threshold.
const THRESHOLD_CONFIDENCE: f32 = 0.40;

/// Compares the header region of the page with each supplier's template.
#[derive(Debug)]
pub struct TemplateMatcher {
    threshold: f32,
}

impl TemplateMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Similarity between the page header and one supplier's template.
    pub fn score(&self, page: &GrayImage, profile: &SupplierProfile) -> Option<f32> {
        let (region, template) = profile.header_region.zip(profile.template.as_ref())?;
        let (page_width, page_height) = page.dimensions();

        let Some(clipped) = region.clip(page_width, page_height) else {
            debug!("{}: header region lies outside the page", profile.identity);
            return None;
        };
        if clipped.width < WINDOW || clipped.height < WINDOW {
            debug!("{}: header crop too small", profile.identity);
            return None;
        }

        let crop = imageops::crop_imm(page, clipped.x, clipped.y, clipped.width, clipped.height)
            .to_image();
        let (tw, th) = template.dimensions();
        let crop = if crop.dimensions() == (tw, th) {
            crop
        } else {
            imageops::resize(&crop, tw, th, FilterType::Triangle)
        };

        ssim(&crop, template).map(|s| s as f32)
    }
}

impl Matcher for TemplateMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Template
    }

    fn attempt(
        &self,
        _text: &str,
        image: Option<&DynamicImage>,
        registry: &SupplierRegistry,
    ) -> Option<MatchCandidate> {
        let page = image?.to_luma8();

        let mut best: Option<(&SupplierProfile, f32)> = None;
        for profile in registry.iter().filter(|p| p.has_template()) {
            let Some(score) = self.score(&page, profile) else {
                continue;
            };
            debug!("{}: template similarity {:.3}", profile.identity, score);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((profile, score));
            }
        }

        let (profile, score) = best?;
        if score < self.threshold {
            return None;
        }

        Some(MatchCandidate {
            supplier: profile.identity.clone(),
            confidence: template_confidence(score, self.threshold),
            method: MatchMethod::Template,
            evidence: MatchEvidence::Template { similarity: score },
        })
    }
}

/// Map a similarity at or above `threshold` linearly onto 0.40..=1.00.
pub fn template_confidence(score: f32, threshold: f32) -> f32 {
    if threshold >= 1.0 {
        return 1.0;
    }
    let span = (score - threshold) / (1.0 - threshold);
    (THRESHOLD_CONFIDENCE + (1.0 - THRESHOLD_CONFIDENCE) * span).clamp(0.0, 1.0)
}
