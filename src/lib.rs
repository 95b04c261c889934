//! # docgate
//!
//! Document-slot validation and annotated previews for registration
//! front ends.
//!
//! ## Why this crate?
//!
//! Registration flows that collect proof documents (identity, date of
//! birth, address) tend to scatter their rules across UI handlers: size
//! checks in one callback, classification in another, preview drawing in a
//! third, with ad-hoc globals deciding which upload "wins" when the user
//! re-uploads quickly. This crate centralises the whole per-document
//! pipeline into one state machine per slot, with one confidence policy,
//! one coordinate convention, and last-writer-wins supersession built in.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Gate      type selected? size ≤ limit? PDF/JPEG/PNG?
//!  ├─ 2. Classify  is it really the selected type? (Aadhaar only)
//!  ├─ 3. Score     document quality on a 0–100 scale
//!  ├─ 4. Ready     original preview + score available
//!  ├─ 5. Extract   labelled field regions from the service
//!  └─ 6. Render    boxes + labels drawn (bitmap) or embedded (PDF)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docgate::{
//!     DocumentCategory, HttpBackend, RegistrationForm, UploadedFile, ValidationConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ValidationConfig::default();
//!     let backend = Arc::new(HttpBackend::new("https://verify.example.com", &config)?);
//!     let form = RegistrationForm::new(backend, config);
//!
//!     let slot = form.slot(DocumentCategory::Identity);
//!     slot.select_type("Aadhaar Card")?;
//!     slot.upload(UploadedFile::from_path("aadhaar.png".as_ref())?).await?;
//!     let preview = slot.extract_and_annotate().await?;
//!     println!("{}", preview.url().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docgate` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docgate = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod annotation;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod form;
pub mod geometry;
pub mod render;
pub mod slot;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use annotation::{Annotation, ConfidencePolicy, ConfidenceTier};
pub use client::{HttpBackend, VerificationBackend};
pub use config::{ValidationConfig, ValidationConfigBuilder};
pub use document::{ArtifactKind, PreviewArtifact, PreviewHandle, UploadedFile};
pub use error::{DocGateError, SlotError};
pub use form::{ApplicantDetails, RegistrationForm};
pub use geometry::Rect;
pub use render::annotate_preview;
pub use slot::{
    requires_classification, DocumentCategory, SlotController, SlotSnapshot, SlotState,
};
