//! Verification backend: trait contract and the HTTP implementation.
//!
//! Slots talk to three remote operations through one [`VerificationBackend`]
//! trait: `classify` (is this file the selected document type), `score`
//! (document quality in `[0, 1]`) and `extract` (labelled field regions).
//! The trait seam exists so the slot state machine is testable with a mock
//! backend and so deployments can swap the transport without touching slot
//! logic.
//!
//! [`HttpBackend`] is the production implementation: multipart POSTs against
//! a verification service. Every transport or non-2xx failure maps to
//! [`SlotError::ServiceUnavailable`] tagged with the operation name, so a
//! snapshot can tell the user *which* step to retry.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::annotation::Annotation;
use crate::config::ValidationConfig;
use crate::document::UploadedFile;
use crate::error::{DocGateError, SlotError};
use crate::geometry::Rect;

/// Remote document-verification operations.
///
/// Implementations must be safe to call concurrently; one backend instance
/// is shared by every slot of a form.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    /// Does `file` look like a document of type `doc_type`?
    async fn classify(&self, file: &UploadedFile, doc_type: &str) -> Result<bool, SlotError>;

    /// Quality score for `file` on a 0–100 scale.
    async fn score(&self, file: &UploadedFile) -> Result<f32, SlotError>;

    /// Labelled field regions detected on `file`, in document order.
    async fn extract(
        &self,
        file: &UploadedFile,
        doc_type: &str,
    ) -> Result<Vec<Annotation>, SlotError>;
}

/// HTTP client for a verification service.
///
/// Endpoints are `{base}/classify`, `{base}/score` and `{base}/extract`,
/// each taking a multipart body with the file under the `file` part.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyResponse {
    is_valid: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreResponse {
    quality_score: f32,
}

/// One field in an `/extract` response.
///
/// The service reports regions as corner coordinates in the order
/// `[x1, x2, y1, y2]` (both x values before both y values), and names the
/// confidence key either `confidence` or `confidence_score` depending on
/// service version.
#[derive(Debug, Deserialize)]
struct FieldWire {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    coordinates: Option<[f32; 4]>,
    #[serde(default, alias = "confidence_score")]
    confidence: f32,
}

impl HttpBackend {
    /// Build a backend against `base_url`, with the request timeout taken
    /// from `config`.
    pub fn new(base_url: impl Into<String>, config: &ValidationConfig) -> Result<Self, DocGateError> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(DocGateError::InvalidConfig(
                "Backend base URL must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| DocGateError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn file_part(file: &UploadedFile) -> Result<multipart::Part, SlotError> {
        multipart::Part::bytes(file.bytes.as_ref().clone())
            .file_name(file.name.clone())
            .mime_str(&file.media_type)
            .map_err(|e| SlotError::service("upload", e))
    }

    async fn post_multipart(
        &self,
        operation: &str,
        form: multipart::Form,
    ) -> Result<serde_json::Value, SlotError> {
        let url = format!("{}/{operation}", self.base_url);
        debug!(%url, "calling verification service");
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SlotError::service(operation, e))?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "verification service returned an error status");
            return Err(SlotError::service(operation, format!("HTTP {status}")));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SlotError::service(operation, format!("invalid JSON body: {e}")))
    }
}

#[async_trait]
impl VerificationBackend for HttpBackend {
    async fn classify(&self, file: &UploadedFile, doc_type: &str) -> Result<bool, SlotError> {
        let form = multipart::Form::new()
            .part("file", Self::file_part(file)?)
            .text("docType", doc_type.to_string());
        let body = self.post_multipart("classify", form).await?;
        let parsed: ClassifyResponse = serde_json::from_value(body)
            .map_err(|e| SlotError::service("classify", format!("unexpected response: {e}")))?;
        Ok(parsed.is_valid)
    }

    async fn score(&self, file: &UploadedFile) -> Result<f32, SlotError> {
        let form = multipart::Form::new().part("file", Self::file_part(file)?);
        let body = self.post_multipart("score", form).await?;
        let parsed: ScoreResponse = serde_json::from_value(body)
            .map_err(|e| SlotError::service("score", format!("unexpected response: {e}")))?;
        Ok(parsed.quality_score.clamp(0.0, 100.0))
    }

    async fn extract(
        &self,
        file: &UploadedFile,
        doc_type: &str,
    ) -> Result<Vec<Annotation>, SlotError> {
        let form = multipart::Form::new()
            .part("file", Self::file_part(file)?)
            .text("docType", doc_type.to_string());
        let body = self.post_multipart("extract", form).await?;
        Ok(parse_extract_fields(body))
    }
}

/// Parse an `/extract` response body into annotations.
///
/// The body is a JSON object mapping field label → field record, optionally
/// wrapped in a `{"fields": {...}}` envelope. Insertion order of the map is
/// preserved (the service emits fields in document order). Records that are
/// not objects are skipped with a warning rather than failing the whole
/// extraction.
pub fn parse_extract_fields(body: serde_json::Value) -> Vec<Annotation> {
    let fields = match &body {
        serde_json::Value::Object(map) => match map.get("fields") {
            Some(serde_json::Value::Object(inner)) => inner,
            _ => map,
        },
        _ => {
            warn!("extract response is not a JSON object; no fields parsed");
            return Vec::new();
        }
    };

    let mut annotations = Vec::with_capacity(fields.len());
    for (label, record) in fields {
        let wire: FieldWire = match serde_json::from_value(record.clone()) {
            Ok(w) => w,
            Err(e) => {
                warn!(%label, error = %e, "skipping malformed field record");
                continue;
            }
        };
        // Wire order is [x1, x2, y1, y2].
        let region = wire
            .coordinates
            .map(|c| Rect::from_corners(c[0], c[2], c[1], c[3]));
        let mut annotation = Annotation {
            label: label.clone(),
            value: wire.value,
            region,
            confidence: wire.confidence.clamp(0.0, 1.0),
        };
        if annotation.label.is_empty() {
            annotation.label = "Field".to_string();
        }
        annotations.push(annotation);
    }
    annotations
}
