//! Error types for the docgate library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocGateError`] — **Fatal**: the library cannot be used as configured
//!   (invalid builder input, unusable backend URL). Returned from
//!   constructors and builders.
//!
//! * [`SlotError`] — **Recoverable**: one document slot's operation failed
//!   (missing type selection, oversized file, negative classification,
//!   unreachable service, preview render glitch). Always recovered at the
//!   slot boundary: the slot records it, the form stays interactive, and
//!   the user can retry by re-invoking the same operation.
//!
//! The separation lets callers treat slot failures as UI state rather than
//! exceptions: a `SlotError` is `Clone + Serialize` so snapshots can carry
//! the last error next to the slot it belongs to.

use thiserror::Error;

/// Fatal errors: the library cannot proceed with the given configuration.
#[derive(Debug, Error)]
pub enum DocGateError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable, per-slot error.
///
/// Stored in the slot's `last_error` and surfaced through
/// [`crate::slot::SlotSnapshot`]; never fatal to the overall form.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SlotError {
    /// A file was offered before a document type was chosen.
    /// No network call is made in this case.
    #[error("Select a document type before uploading a file")]
    TypeNotSelected,

    /// The file exceeds the upload ceiling. Checked synchronously,
    /// before any network call.
    #[error("File is {size} bytes, above the {limit}-byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// The declared media type is neither `application/pdf` nor `image/*`.
    #[error("Only PDF, JPEG and PNG files are accepted (got '{media_type}')")]
    UnsupportedMediaType { media_type: String },

    /// The classification service decided the file is not the selected
    /// document type. Terminal for the current file, not for the slot.
    #[error("Uploaded file does not look like a {doc_type} — upload the correct document")]
    DocumentTypeMismatch { doc_type: String },

    /// A backend call failed at the transport level or returned non-2xx.
    /// The caller may retry by re-invoking the same operation.
    #[error("Verification service unavailable during {operation}: {detail}")]
    ServiceUnavailable { operation: String, detail: String },

    /// The annotated preview could not be produced (decode or parse error).
    /// The slot degrades to showing the unannotated source.
    #[error("Could not render annotated preview: {detail}")]
    RenderFailure { detail: String },

    /// `annotate` was invoked on a slot that is not `Ready`.
    #[error("Slot is not ready for annotation (state: {state})")]
    NotReady { state: String },
}

impl SlotError {
    /// Convenience constructor used wherever a transport failure is mapped.
    pub(crate) fn service(operation: &str, detail: impl std::fmt::Display) -> Self {
        SlotError::ServiceUnavailable {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Convenience constructor for render-path failures.
    pub(crate) fn render(detail: impl std::fmt::Display) -> Self {
        SlotError::RenderFailure {
            detail: detail.to_string(),
        }
    }
}
