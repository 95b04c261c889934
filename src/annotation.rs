//! Field annotations and the confidence-tier colour policy.
//!
//! An [`Annotation`] is one labelled region the extraction service detected
//! on a document: a field name, the text it read there, a rectangle in the
//! document's native space, and the service's confidence in the match.
//! Annotations are kept in service response order — the order fields appear
//! on the document — so previews and auto-fill walk them identically.
//!
//! Rendering colour is decided by a single [`ConfidencePolicy`] rather than
//! per-call-site constants; every renderer branch asks the same policy so a
//! box never changes tier between the bitmap and the PDF path.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// One detected field region on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Field name as reported by the extraction service (e.g. "First Name").
    pub label: String,
    /// Extracted or verified text, when the service produced one.
    pub value: Option<String>,
    /// Bounding region in the source document's native coordinate space.
    /// `None` for fields the service read without locating (those still
    /// participate in auto-fill, just not in the preview overlay).
    pub region: Option<Rect>,
    /// Match confidence in `[0, 1]`; drives the rendering tier.
    pub confidence: f32,
}

impl Annotation {
    pub fn new(label: impl Into<String>, region: Rect, confidence: f32) -> Self {
        Self {
            label: label.into(),
            value: None,
            region: Some(region),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Confidence as a whole percentage for labels ("92%").
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Rendering tier derived from a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Stroke/label colour for this tier: green, orange, red.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            ConfidenceTier::High => [0, 128, 0],
            ConfidenceTier::Medium => [255, 165, 0],
            ConfidenceTier::Low => [255, 0, 0],
        }
    }

    /// Same colour as unit floats, for PDF `/C` colour arrays.
    pub fn rgb_f32(self) -> [f32; 3] {
        let [r, g, b] = self.rgb();
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
    }
}

/// Thresholds mapping a confidence score onto a [`ConfidenceTier`].
///
/// One policy for the whole pipeline. Defaults: `high ≥ 0.9`,
/// `medium ≥ 0.7`, everything below is low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// Minimum confidence for the high tier.
    pub high: f32,
    /// Minimum confidence for the medium tier.
    pub medium: f32,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            high: 0.9,
            medium: 0.7,
        }
    }
}

impl ConfidencePolicy {
    /// Classify a confidence score. Boundary values land in the higher tier.
    pub fn tier(&self, confidence: f32) -> ConfidenceTier {
        if confidence >= self.high {
            ConfidenceTier::High
        } else if confidence >= self.medium {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_tiers() {
        let p = ConfidencePolicy::default();
        assert_eq!(p.tier(0.95), ConfidenceTier::High);
        assert_eq!(p.tier(0.9), ConfidenceTier::High);
        assert_eq!(p.tier(0.89), ConfidenceTier::Medium);
        assert_eq!(p.tier(0.7), ConfidenceTier::Medium);
        assert_eq!(p.tier(0.42), ConfidenceTier::Low);
    }

    #[test]
    fn confidence_is_clamped_on_construction() {
        let a = Annotation::new("DOB", Rect::new(0.0, 0.0, 1.0, 1.0), 1.7);
        assert_eq!(a.confidence, 1.0);
        assert_eq!(a.confidence_percent(), 100);
    }

    #[test]
    fn percent_rounds() {
        let a = Annotation::new("Phone", Rect::new(0.0, 0.0, 1.0, 1.0), 0.876);
        assert_eq!(a.confidence_percent(), 88);
    }

    #[test]
    fn tier_colours_are_distinct() {
        assert_ne!(ConfidenceTier::High.rgb(), ConfidenceTier::Medium.rgb());
        assert_ne!(ConfidenceTier::Medium.rgb(), ConfidenceTier::Low.rgb());
    }
}
