//! Annotated-preview rendering.
//!
//! ```text
//! UploadedFile + [Annotation] ──▶ raster | pdf ──▶ PreviewArtifact
//!                                 (draw)  (embed)
//! ```
//!
//! Two branches, one contract: given a file and its annotations, produce a
//! preview artifact the caller can display.
//!
//! * [`raster`] decodes the bitmap and **draws** boxes and labels into the
//!   pixels, re-encoding as PNG.
//! * [`pdf`] never rasterises; it **embeds** square and text annotation
//!   objects into the document so the preview stays a real, selectable PDF.
//!
//! ## Why spawn_blocking?
//!
//! Both branches are CPU-bound (image decode/encode, PDF parse/serialise).
//! `tokio::task::spawn_blocking` moves them onto the blocking thread pool so
//! slot operations awaiting a render never stall the async workers handling
//! other slots.

pub(crate) mod pdf;
pub(crate) mod raster;

use tracing::debug;

use crate::annotation::Annotation;
use crate::config::ValidationConfig;
use crate::document::{PreviewArtifact, UploadedFile};
use crate::error::SlotError;

/// Produce the annotated preview for `file`.
///
/// With no annotations the original file is passed through untouched (an
/// `Original` artifact); otherwise the branch is picked by media type.
/// Failures surface as [`SlotError::RenderFailure`] and leave the input
/// untouched, so callers can fall back to the unannotated source.
pub async fn annotate_preview(
    file: &UploadedFile,
    annotations: &[Annotation],
    config: &ValidationConfig,
) -> Result<PreviewArtifact, SlotError> {
    if annotations.iter().all(|a| a.region.is_none()) {
        debug!(file = %file.name, "no positioned annotations; preview is the original");
        return Ok(PreviewArtifact::original(file));
    }

    let bytes = std::sync::Arc::clone(&file.bytes);
    let annotations = annotations.to_vec();
    let config = config.clone();

    if file.is_pdf() {
        let out = tokio::task::spawn_blocking(move || {
            pdf::annotate_pdf(&bytes, &annotations, &config)
        })
        .await
        .map_err(|e| SlotError::render(format!("render task failed: {e}")))??;
        Ok(PreviewArtifact::annotated("application/pdf", out))
    } else if file.is_image() {
        let out = tokio::task::spawn_blocking(move || {
            raster::annotate_image(&bytes, &annotations, &config)
        })
        .await
        .map_err(|e| SlotError::render(format!("render task failed: {e}")))??;
        Ok(PreviewArtifact::annotated("image/png", out))
    } else {
        Err(SlotError::render(format!(
            "no renderer for media type '{}'",
            file.media_type
        )))
    }
}
