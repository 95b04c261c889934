//! The registration form: slot aggregation, submission gating, auto-fill.
//!
//! A [`RegistrationForm`] owns one [`SlotController`] per document category
//! plus the applicant's typed-in details. It decides when the form as a
//! whole may be submitted (all required proofs `Ready`) and can populate
//! the applicant fields from a scanned application form via the extraction
//! service.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::annotation::Annotation;
use crate::client::VerificationBackend;
use crate::config::ValidationConfig;
use crate::error::SlotError;
use crate::slot::{DocumentCategory, SlotController, SlotSnapshot, SlotState};

/// Applicant details, typed in or auto-filled from a scanned form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ApplicantDetails {
    /// Overwrite fields from extracted annotations. Unrecognised labels are
    /// ignored; recognised labels without a value leave the field alone, so
    /// a partial scan never blanks what the user already typed.
    pub fn apply_extracted(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            let Some(value) = annotation.value.as_deref() else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match annotation.label.as_str() {
                "First Name" => self.first_name = value.to_string(),
                "Middle Name" => self.middle_name = value.to_string(),
                "Last Name" => self.last_name = value.to_string(),
                "Gender" => self.gender = value.to_string(),
                "DOB" | "Date of Birth" => self.date_of_birth = value.to_string(),
                "Phone" | "Phone Number" => self.phone = value.to_string(),
                "Email" => self.email = value.to_string(),
                "Address" => self.address_line = value.to_string(),
                "City" => self.city = value.to_string(),
                "State" => self.state = value.to_string(),
                "Pincode" => self.pincode = value.to_string(),
                other => debug!(label = other, "no applicant field for extracted label"),
            }
        }
    }

    /// Display name assembled from the name parts.
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One registration form: per-category document slots plus applicant data.
pub struct RegistrationForm {
    slots: HashMap<DocumentCategory, SlotController>,
    pub applicant: ApplicantDetails,
}

/// Categories whose slot must be `Ready` before submission.
const REQUIRED: [DocumentCategory; 3] = [
    DocumentCategory::Identity,
    DocumentCategory::DateOfBirth,
    DocumentCategory::Address,
];

impl RegistrationForm {
    /// Create a form with one slot per category, all sharing `backend`
    /// and `config`.
    pub fn new(backend: Arc<dyn VerificationBackend>, config: ValidationConfig) -> Self {
        let slots = DocumentCategory::all()
            .into_iter()
            .map(|category| {
                (
                    category,
                    SlotController::new(category, Arc::clone(&backend), config.clone()),
                )
            })
            .collect();
        Self {
            slots,
            applicant: ApplicantDetails::default(),
        }
    }

    /// The slot for a category. Every category has one by construction.
    pub fn slot(&self, category: DocumentCategory) -> &SlotController {
        &self.slots[&category]
    }

    /// Snapshots of every slot, in category order.
    pub fn snapshots(&self) -> Vec<(DocumentCategory, SlotSnapshot)> {
        DocumentCategory::all()
            .into_iter()
            .map(|category| (category, self.slot(category).snapshot()))
            .collect()
    }

    /// May the form be submitted? True when all required proofs are
    /// `Ready`; the auto-fill slot is optional.
    pub fn ready_for_submission(&self) -> bool {
        REQUIRED
            .iter()
            .all(|category| self.slot(*category).snapshot().state == SlotState::Ready)
    }

    /// Populate applicant fields from the uploaded application form.
    ///
    /// Extracts fields from the auto-fill slot (refreshing its preview on
    /// the way), then maps recognised labels onto [`ApplicantDetails`].
    /// The slot must be `Ready`.
    pub async fn auto_fill(&mut self) -> Result<(), SlotError> {
        let slot = self.slots[&DocumentCategory::AutoFillSource].clone();
        slot.extract_and_annotate().await?;
        let annotations = slot.annotations();
        self.applicant.apply_extracted(&annotations);
        info!(fields = annotations.len(), "applicant details auto-filled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn annotation(label: &str, value: &str) -> Annotation {
        Annotation::new(label, Rect::new(0.0, 0.0, 1.0, 1.0), 0.9).with_value(value)
    }

    #[test]
    fn extracted_labels_map_onto_fields() {
        let mut details = ApplicantDetails::default();
        details.apply_extracted(&[
            annotation("First Name", "Asha"),
            annotation("Last Name", "Rao"),
            annotation("DOB", "2001-04-12"),
            annotation("Pincode", "560001"),
            annotation("Blood Group", "O+"),
        ]);
        assert_eq!(details.first_name, "Asha");
        assert_eq!(details.date_of_birth, "2001-04-12");
        assert_eq!(details.pincode, "560001");
        assert_eq!(details.full_name(), "Asha Rao");
    }

    #[test]
    fn valueless_annotation_keeps_typed_input() {
        let mut details = ApplicantDetails {
            phone: "9999999999".into(),
            ..Default::default()
        };
        let mut a = annotation("Phone", "ignored");
        a.value = None;
        details.apply_extracted(&[a, annotation("City", "  ")]);
        assert_eq!(details.phone, "9999999999");
        assert_eq!(details.city, "");
    }

    #[test]
    fn full_name_skips_empty_middle() {
        let details = ApplicantDetails {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            ..Default::default()
        };
        assert_eq!(details.full_name(), "Asha Rao");
    }
}
