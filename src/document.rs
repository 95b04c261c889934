//! Uploaded files, preview artifacts and revocable preview handles.
//!
//! A slot hands callers a [`PreviewHandle`], not raw bytes. The handle is
//! cheap to clone and can be **revoked** by the slot when the document it
//! points at is replaced or removed; a revoked handle stops yielding data.
//! This mirrors how object URLs work in browsers (create on display, revoke
//! on replacement) and keeps superseded previews from lingering in a UI
//! layer that cloned the handle earlier.

use base64::Engine;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SlotError;

/// A file as received from the user, before any validation.
///
/// Bytes are behind an `Arc` so a file can be shared between the slot, an
/// in-flight backend call and a preview artifact without copying.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name, for display and multipart uploads.
    pub name: String,
    /// Declared media type, e.g. `application/pdf` or `image/png`.
    pub media_type: String,
    /// Raw file content.
    pub bytes: Arc<Vec<u8>>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type.eq_ignore_ascii_case("application/pdf")
    }

    pub fn is_image(&self) -> bool {
        self.media_type
            .to_ascii_lowercase()
            .starts_with("image/")
    }

    /// Load a file from disk, inferring the media type from its extension.
    ///
    /// Used by the CLI; web callers construct [`UploadedFile`] directly from
    /// the request they received.
    pub fn from_path(path: &Path) -> Result<Self, SlotError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let media_type = match ext.as_str() {
            "pdf" => "application/pdf",
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            other => {
                return Err(SlotError::UnsupportedMediaType {
                    media_type: format!(".{other}"),
                })
            }
        };
        let bytes = std::fs::read(path)
            .map_err(|e| SlotError::render(format!("cannot read {}: {e}", path.display())))?;
        Ok(Self::new(name, media_type, bytes))
    }
}

/// Whether an artifact shows the source as uploaded or with annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Byte-for-byte the uploaded file.
    Original,
    /// Re-encoded with bounding boxes and labels drawn in.
    Annotated,
}

/// A renderable preview: either the original upload or its annotated form.
#[derive(Debug, Clone)]
pub struct PreviewArtifact {
    pub media_type: String,
    pub bytes: Arc<Vec<u8>>,
    pub kind: ArtifactKind,
}

impl PreviewArtifact {
    pub fn original(file: &UploadedFile) -> Self {
        Self {
            media_type: file.media_type.clone(),
            bytes: Arc::clone(&file.bytes),
            kind: ArtifactKind::Original,
        }
    }

    pub fn annotated(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            bytes: Arc::new(bytes),
            kind: ArtifactKind::Annotated,
        }
    }

    /// Render as a `data:` URL for direct embedding in an `<img>`/`<embed>`.
    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.bytes.as_slice());
        format!("data:{};base64,{}", self.media_type, encoded)
    }
}

/// A cloneable, revocable reference to a [`PreviewArtifact`].
///
/// All clones of a handle share one liveness flag. When the owning slot
/// replaces or removes its document it revokes the handle, and every clone
/// starts returning `None` from [`artifact`](Self::artifact) and
/// [`url`](Self::url). Holding a stale clone is therefore harmless: it shows
/// nothing rather than a superseded preview.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    artifact: Arc<PreviewArtifact>,
    alive: Arc<AtomicBool>,
}

impl PreviewHandle {
    pub(crate) fn new(artifact: PreviewArtifact) -> Self {
        Self {
            artifact: Arc::new(artifact),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// The artifact, or `None` once revoked.
    pub fn artifact(&self) -> Option<Arc<PreviewArtifact>> {
        if self.is_live() {
            Some(Arc::clone(&self.artifact))
        } else {
            None
        }
    }

    /// Data URL for the artifact, or `None` once revoked.
    pub fn url(&self) -> Option<String> {
        self.artifact().map(|a| a.data_url())
    }

    pub(crate) fn revoke(&self) {
        self.alive.store(false, Ordering::Release);
    }
}
