//! Configuration for document validation and preview rendering.
//!
//! All behaviour is controlled through [`ValidationConfig`], built via its
//! [`ValidationConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share one config across all slots of a form, serialise it for
//! logging, and diff two runs to understand why their previews differ.
//!
//! # Design choice: builder over constructor
//! The field list grows with every tuning knob (thresholds, ceilings,
//! stroke widths); the builder lets callers set only what they care about
//! and rely on documented defaults for the rest.

use crate::annotation::ConfidencePolicy;
use crate::error::DocGateError;
use serde::{Deserialize, Serialize};

/// Configuration shared by slot controllers and the annotation renderer.
///
/// Built via [`ValidationConfig::builder()`] or using
/// [`ValidationConfig::default()`].
///
/// # Example
/// ```rust
/// use docgate::ValidationConfig;
///
/// let config = ValidationConfig::builder()
///     .max_file_bytes(1024 * 1024)
///     .confidence_thresholds(0.9, 0.7)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Upload size ceiling in bytes. Default: 2 MiB.
    ///
    /// Checked synchronously on `upload`, before any network call, so an
    /// oversized file never costs a round-trip. The ceiling matches what
    /// the verification backend accepts for a single multipart part.
    pub max_file_bytes: u64,

    /// Confidence thresholds for the three rendering tiers.
    /// Default: high ≥ 0.9, medium ≥ 0.7.
    pub confidence: ConfidencePolicy,

    /// Stroke width of annotation boxes in pixels (raster) or points (PDF).
    /// Default: 2.
    pub stroke_width: u32,

    /// Label text height in pixels for raster previews. Default: 30.
    pub label_scale: f32,

    /// DPI at which the extraction backend rasterises PDF pages before
    /// locating fields. Default: 220.
    ///
    /// Field coordinates for a PDF arrive in the pixel space of that
    /// render, not in page points. The PDF renderer divides by this value
    /// (×72) to get back to point space before embedding annotations.
    /// Set to 72 when a backend reports point-space coordinates directly.
    pub pdf_raster_dpi: u32,

    /// Per-backend-call timeout in seconds. Default: 30.
    ///
    /// The pipeline never retries on its own; this bound keeps a hung
    /// service call from pinning a slot in a transient state forever.
    pub api_timeout_secs: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 2 * 1024 * 1024,
            confidence: ConfidencePolicy::default(),
            stroke_width: 2,
            label_scale: 30.0,
            pdf_raster_dpi: 220,
            api_timeout_secs: 30,
        }
    }
}

impl ValidationConfig {
    /// Create a new builder for `ValidationConfig`.
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ValidationConfig`].
#[derive(Debug)]
pub struct ValidationConfigBuilder {
    config: ValidationConfig,
}

impl ValidationConfigBuilder {
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn confidence_thresholds(mut self, high: f32, medium: f32) -> Self {
        self.config.confidence = ConfidencePolicy { high, medium };
        self
    }

    pub fn stroke_width(mut self, px: u32) -> Self {
        self.config.stroke_width = px.max(1);
        self
    }

    pub fn label_scale(mut self, px: f32) -> Self {
        self.config.label_scale = px.clamp(8.0, 72.0);
        self
    }

    pub fn pdf_raster_dpi(mut self, dpi: u32) -> Self {
        self.config.pdf_raster_dpi = dpi.clamp(36, 600);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ValidationConfig, DocGateError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(DocGateError::InvalidConfig(
                "max_file_bytes must be ≥ 1".into(),
            ));
        }
        let p = c.confidence;
        if !(0.0..=1.0).contains(&p.high) || !(0.0..=1.0).contains(&p.medium) {
            return Err(DocGateError::InvalidConfig(format!(
                "Confidence thresholds must be within [0, 1], got high={} medium={}",
                p.high, p.medium
            )));
        }
        if p.medium > p.high {
            return Err(DocGateError::InvalidConfig(format!(
                "Medium threshold ({}) must not exceed high threshold ({})",
                p.medium, p.high
            )));
        }
        Ok(self.config)
    }
}
