//! Document slots: the per-document upload/validation state machine.
//!
//! One [`SlotController`] owns one document position on a form ("identity
//! proof", "address proof", …). It runs the full pipeline for that slot:
//!
//! ```text
//! select_type ─▶ upload ─▶ [classify] ─▶ score ─▶ Ready ─▶ annotate
//!                  │            │           │                 │
//!                  ▼            ▼           ▼                 ▼
//!              TypeRequired  Rejected     Failed        annotated preview
//! ```
//!
//! ## Concurrency model
//!
//! State lives behind a `std::sync::Mutex` that is **never held across an
//! await**. Each mutation bumps an epoch counter; an async operation records
//! the epoch when it starts and re-checks it after every backend call. If a
//! newer upload or removal bumped the epoch in the meantime, the stale
//! operation drops its result on the floor instead of overwriting newer
//! state — last writer wins, with no cross-task locking.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::Annotation;
use crate::client::VerificationBackend;
use crate::config::ValidationConfig;
use crate::document::{PreviewArtifact, PreviewHandle, UploadedFile};
use crate::error::SlotError;
use crate::render::annotate_preview;

/// Which form position a slot fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    /// Proof of identity.
    Identity,
    /// Proof of date of birth.
    DateOfBirth,
    /// Proof of address.
    Address,
    /// A filled application form used to auto-populate applicant fields.
    AutoFillSource,
}

impl DocumentCategory {
    pub fn all() -> [DocumentCategory; 4] {
        [
            DocumentCategory::Identity,
            DocumentCategory::DateOfBirth,
            DocumentCategory::Address,
            DocumentCategory::AutoFillSource,
        ]
    }

    /// Document types a user may pick for this category.
    pub fn doc_type_options(&self) -> &'static [&'static str] {
        match self {
            DocumentCategory::Identity => &[
                "Aadhaar Card",
                "Driving License",
                "Passport",
                "Voter ID",
                "PAN Card",
            ],
            DocumentCategory::DateOfBirth => &[
                "Birth Certificate",
                "SSLC Marks Card",
                "Passport",
                "Aadhaar Card",
            ],
            DocumentCategory::Address => &[
                "Aadhaar Card",
                "Driving License",
                "Passport",
                "Utility Bill",
                "Rent Agreement",
            ],
            DocumentCategory::AutoFillSource => &["Handwritten Form", "Printed Form"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::Identity => "Identity proof",
            DocumentCategory::DateOfBirth => "Date-of-birth proof",
            DocumentCategory::Address => "Address proof",
            DocumentCategory::AutoFillSource => "Application form",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether uploads of `doc_type` go through the classification step.
///
/// Only Aadhaar cards have a trained classifier; other types skip straight
/// to quality scoring.
pub fn requires_classification(doc_type: &str) -> bool {
    doc_type.contains("Aadhaar")
}

/// Lifecycle state of one document slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    /// No file; a document type may or may not be selected.
    Empty,
    /// A file was offered before a document type was chosen.
    TypeRequired,
    /// A file passed the synchronous gates and is being processed.
    Uploading,
    /// Waiting on the classification service.
    Classifying,
    /// The classifier said the file is not the selected document type.
    Rejected,
    /// Waiting on the quality-scoring service.
    Scoring,
    /// Accepted; score and preview available.
    Ready,
    /// Waiting on extraction + preview rendering.
    Annotating,
    /// A backend call failed; the file is kept for retry.
    Failed,
}

impl SlotState {
    /// States with an operation in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SlotState::Uploading
                | SlotState::Classifying
                | SlotState::Scoring
                | SlotState::Annotating
        )
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotState::Empty => "empty",
            SlotState::TypeRequired => "type-required",
            SlotState::Uploading => "uploading",
            SlotState::Classifying => "classifying",
            SlotState::Rejected => "rejected",
            SlotState::Scoring => "scoring",
            SlotState::Ready => "ready",
            SlotState::Annotating => "annotating",
            SlotState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a slot, safe to hand to a UI layer.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    pub state: SlotState,
    pub doc_type: Option<String>,
    pub file_name: Option<String>,
    pub quality_score: Option<f32>,
    pub preview: Option<PreviewHandle>,
    pub annotations: Vec<Annotation>,
    pub last_error: Option<SlotError>,
}

struct SlotInner {
    doc_type: Option<String>,
    file: Option<UploadedFile>,
    preview: Option<PreviewHandle>,
    annotations: Vec<Annotation>,
    quality_score: Option<f32>,
    state: SlotState,
    last_error: Option<SlotError>,
    /// Bumped on every upload/annotate/remove; stale async work compares
    /// against it before writing results back.
    epoch: u64,
}

impl SlotInner {
    fn install_file(&mut self, file: UploadedFile) {
        self.clear_document();
        self.preview = Some(PreviewHandle::new(PreviewArtifact::original(&file)));
        self.file = Some(file);
    }

    fn clear_document(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.revoke();
        }
        self.file = None;
        self.annotations.clear();
        self.quality_score = None;
        self.last_error = None;
    }

    fn replace_preview(&mut self, artifact: PreviewArtifact) -> PreviewHandle {
        if let Some(old) = self.preview.take() {
            old.revoke();
        }
        let handle = PreviewHandle::new(artifact);
        self.preview = Some(handle.clone());
        handle
    }
}

impl Drop for SlotInner {
    fn drop(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.revoke();
        }
    }
}

/// Controller for a single document slot.
///
/// Cheap to share: clones reference the same slot. All operations are safe
/// to call concurrently; conflicting uploads resolve last-writer-wins.
#[derive(Clone)]
pub struct SlotController {
    category: DocumentCategory,
    backend: Arc<dyn VerificationBackend>,
    config: ValidationConfig,
    inner: Arc<Mutex<SlotInner>>,
}

impl SlotController {
    pub fn new(
        category: DocumentCategory,
        backend: Arc<dyn VerificationBackend>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            category,
            backend,
            config,
            inner: Arc::new(Mutex::new(SlotInner {
                doc_type: None,
                file: None,
                preview: None,
                annotations: Vec::new(),
                quality_score: None,
                state: SlotState::Empty,
                last_error: None,
                epoch: 0,
            })),
        }
    }

    pub fn category(&self) -> DocumentCategory {
        self.category
    }

    // Lock is only ever held for field access, so a poisoned mutex means a
    // panic mid field update never happened; recovering keeps one crashed
    // task from wedging the whole form.
    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Select (or switch) the document type for this slot.
    ///
    /// Switching types discards any current document: its classification
    /// and score were judged against the previous type.
    pub fn select_type(&self, doc_type: &str) -> Result<(), SlotError> {
        if !self.category.doc_type_options().contains(&doc_type) {
            return Err(SlotError::DocumentTypeMismatch {
                doc_type: doc_type.to_string(),
            });
        }
        let mut inner = self.lock();
        let switching = inner.doc_type.as_deref() != Some(doc_type);
        inner.doc_type = Some(doc_type.to_string());
        if switching {
            inner.clear_document();
            inner.epoch += 1;
            inner.state = SlotState::Empty;
        } else if inner.state == SlotState::TypeRequired {
            inner.state = SlotState::Empty;
        }
        debug!(category = %self.category, doc_type, "document type selected");
        Ok(())
    }

    /// The currently selected document type, if any.
    pub fn doc_type(&self) -> Option<String> {
        self.lock().doc_type.clone()
    }

    /// Upload a file into the slot and run it through the pipeline.
    ///
    /// Synchronous gates (type selected, size, media type) are checked
    /// before any backend call. A second upload while one is in flight
    /// supersedes it: the earlier upload's pending results are discarded
    /// when they arrive.
    pub async fn upload(&self, file: UploadedFile) -> Result<(), SlotError> {
        let (doc_type, epoch) = {
            let mut inner = self.lock();
            let Some(doc_type) = inner.doc_type.clone() else {
                inner.state = SlotState::TypeRequired;
                let err = SlotError::TypeNotSelected;
                inner.last_error = Some(err.clone());
                return Err(err);
            };
            if file.len() > self.config.max_file_bytes {
                let err = SlotError::FileTooLarge {
                    size: file.len(),
                    limit: self.config.max_file_bytes,
                };
                inner.last_error = Some(err.clone());
                return Err(err);
            }
            if !file.is_pdf() && !file.is_image() {
                let err = SlotError::UnsupportedMediaType {
                    media_type: file.media_type.clone(),
                };
                inner.last_error = Some(err.clone());
                return Err(err);
            }
            inner.epoch += 1;
            inner.install_file(file.clone());
            inner.state = SlotState::Uploading;
            (doc_type, inner.epoch)
        };
        info!(category = %self.category, doc_type, file = %file.name, "upload accepted");

        if requires_classification(&doc_type) {
            self.transition_if_current(epoch, SlotState::Classifying);
            match self.backend.classify(&file, &doc_type).await {
                Ok(true) => {}
                Ok(false) => {
                    let err = SlotError::DocumentTypeMismatch { doc_type };
                    let mut inner = self.lock();
                    if inner.epoch != epoch {
                        return Ok(());
                    }
                    inner.clear_document();
                    inner.state = SlotState::Rejected;
                    inner.last_error = Some(err.clone());
                    return Err(err);
                }
                Err(err) => return self.fail_if_current(epoch, err),
            }
        }

        self.transition_if_current(epoch, SlotState::Scoring);
        let score = match self.backend.score(&file).await {
            Ok(score) => score,
            Err(err) => return self.fail_if_current(epoch, err),
        };

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(category = %self.category, "score result superseded; discarded");
            return Ok(());
        }
        inner.quality_score = Some(score);
        inner.state = SlotState::Ready;
        inner.last_error = None;
        info!(category = %self.category, score, "document ready");
        Ok(())
    }

    /// Replace the preview with an annotated rendition of the current
    /// document. Requires the slot to be `Ready`; the caller supplies the
    /// annotations (typically from an `extract` call it made itself, see
    /// [`extract_and_annotate`](Self::extract_and_annotate)).
    ///
    /// May be invoked repeatedly; each render supersedes the previous
    /// preview handle. On a render failure the slot falls back to the
    /// unannotated original and stays `Ready`.
    pub async fn annotate(&self, annotations: Vec<Annotation>) -> Result<PreviewHandle, SlotError> {
        let (file, epoch) = {
            let mut inner = self.lock();
            if inner.state != SlotState::Ready {
                return Err(SlotError::NotReady {
                    state: inner.state.to_string(),
                });
            }
            // State is Ready, so a file is present.
            let Some(file) = inner.file.clone() else {
                return Err(SlotError::NotReady {
                    state: inner.state.to_string(),
                });
            };
            inner.epoch += 1;
            inner.state = SlotState::Annotating;
            (file, inner.epoch)
        };

        match annotate_preview(&file, &annotations, &self.config).await {
            Ok(artifact) => {
                let mut inner = self.lock();
                if inner.epoch != epoch {
                    debug!(category = %self.category, "annotated preview superseded; discarded");
                    return Err(SlotError::NotReady {
                        state: inner.state.to_string(),
                    });
                }
                let handle = inner.replace_preview(artifact);
                inner.annotations = annotations;
                inner.state = SlotState::Ready;
                inner.last_error = None;
                info!(category = %self.category, count = inner.annotations.len(), "preview annotated");
                Ok(handle)
            }
            Err(err) => {
                warn!(category = %self.category, error = %err, "annotation render failed; showing original");
                let mut inner = self.lock();
                if inner.epoch == epoch {
                    inner.replace_preview(PreviewArtifact::original(&file));
                    inner.annotations.clear();
                    inner.state = SlotState::Ready;
                    inner.last_error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Run extraction on the current document and annotate its preview with
    /// the result. Convenience over `extract` + [`annotate`](Self::annotate).
    ///
    /// An extraction failure leaves the slot `Ready` with its current
    /// preview; only the error is recorded.
    pub async fn extract_and_annotate(&self) -> Result<PreviewHandle, SlotError> {
        let (file, doc_type) = {
            let inner = self.lock();
            if inner.state != SlotState::Ready {
                return Err(SlotError::NotReady {
                    state: inner.state.to_string(),
                });
            }
            let (Some(file), Some(doc_type)) = (inner.file.clone(), inner.doc_type.clone()) else {
                return Err(SlotError::NotReady {
                    state: inner.state.to_string(),
                });
            };
            (file, doc_type)
        };

        let annotations = match self.backend.extract(&file, &doc_type).await {
            Ok(annotations) => annotations,
            Err(err) => {
                self.lock().last_error = Some(err.clone());
                return Err(err);
            }
        };
        self.annotate(annotations).await
    }

    /// Remove the current document, revoking its preview. The selected
    /// document type is kept. Supersedes any in-flight operation.
    pub fn remove(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.clear_document();
        inner.state = SlotState::Empty;
        debug!(category = %self.category, "document removed");
    }

    /// The current file, if one is installed.
    pub fn file(&self) -> Option<UploadedFile> {
        self.lock().file.clone()
    }

    /// Extracted annotations from the last successful `annotate`.
    pub fn annotations(&self) -> Vec<Annotation> {
        self.lock().annotations.clone()
    }

    /// Point-in-time view of the slot.
    pub fn snapshot(&self) -> SlotSnapshot {
        let inner = self.lock();
        SlotSnapshot {
            state: inner.state,
            doc_type: inner.doc_type.clone(),
            file_name: inner.file.as_ref().map(|f| f.name.clone()),
            quality_score: inner.quality_score,
            preview: inner.preview.clone(),
            annotations: inner.annotations.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    fn transition_if_current(&self, epoch: u64, state: SlotState) -> bool {
        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.state = state;
            true
        } else {
            false
        }
    }

    /// Record a backend failure unless a newer operation superseded us.
    /// The file is kept so the user can retry without re-uploading.
    fn fail_if_current(&self, epoch: u64, err: SlotError) -> Result<(), SlotError> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Ok(());
        }
        inner.state = SlotState::Failed;
        inner.last_error = Some(err.clone());
        warn!(category = %self.category, error = %err, "slot operation failed");
        Err(err)
    }
}

impl fmt::Debug for SlotController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("SlotController")
            .field("category", &self.category)
            .field("state", &inner.state)
            .field("doc_type", &inner.doc_type)
            .finish()
    }
}
