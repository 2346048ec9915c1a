use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use shared_database::DocumentSlice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    /// ISO timestamp.
    #[serde(default)]
    pub diagnosed: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    pub allergen: String,
    #[serde(default)]
    pub reaction: String,
    #[serde(default)]
    pub severity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub medication: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub prescribed: String,
    #[serde(default)]
    pub prescriber: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalDocument {
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `data:` URL of an uploaded image.
    #[serde(default)]
    pub image_data: Option<String>,
}

/// The medical history page's share of the user document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub documents: Vec<MedicalDocument>,
}

impl DocumentSlice for MedicalHistory {
    const CACHE_KEY: &'static str = "medical_history_state";
    const COLLECTION: &'static str = "users";
}

impl MedicalHistory {
    pub fn len_of(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Conditions => self.conditions.len(),
            RecordKind::Allergies => self.allergies.len(),
            RecordKind::Prescriptions => self.prescriptions.len(),
            RecordKind::Documents => self.documents.len(),
        }
    }

    /// Removes the record at `index`; returns false when it is out of range.
    pub fn remove(&mut self, kind: RecordKind, index: usize) -> bool {
        if index >= self.len_of(kind) {
            return false;
        }

        match kind {
            RecordKind::Conditions => { self.conditions.remove(index); }
            RecordKind::Allergies => { self.allergies.remove(index); }
            RecordKind::Prescriptions => { self.prescriptions.remove(index); }
            RecordKind::Documents => { self.documents.remove(index); }
        }
        true
    }
}

/// The four record lists, as named in URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Conditions,
    Allergies,
    Prescriptions,
    Documents,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Conditions => "conditions",
            RecordKind::Allergies => "allergies",
            RecordKind::Prescriptions => "prescriptions",
            RecordKind::Documents => "documents",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "conditions" => Ok(RecordKind::Conditions),
            "allergies" => Ok(RecordKind::Allergies),
            "prescriptions" => Ok(RecordKind::Prescriptions),
            "documents" => Ok(RecordKind::Documents),
            other => Err(format!("Unknown record kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordType {
    #[default]
    #[serde(rename = "Medical Condition")]
    MedicalCondition,
    Allergy,
    Prescription,
    Document,
}

impl RecordType {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordType::MedicalCondition => RecordKind::Conditions,
            RecordType::Allergy => RecordKind::Allergies,
            RecordType::Prescription => RecordKind::Prescriptions,
            RecordType::Document => RecordKind::Documents,
        }
    }
}

/// Add-record form. `details` means reaction, dosage or document type
/// depending on the record type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordForm {
    #[serde(default)]
    pub record_type: RecordType,
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl RecordForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Record name cannot be empty".to_string());
        }
        Ok(())
    }

    fn details_or(&self, default: &str) -> String {
        self.details
            .as_deref()
            .map(str::trim)
            .filter(|details| !details.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Prepends the record described by this form to `history`.
    pub fn apply(self, history: &mut MedicalHistory, now_iso: &str) -> Result<RecordKind, String> {
        self.validate()?;
        let name = self.name.trim().to_string();

        match self.record_type {
            RecordType::MedicalCondition => history.conditions.insert(0, Condition {
                name,
                diagnosed: now_iso.to_string(),
                status: "Active".to_string(),
                severity: "Mild".to_string(),
            }),
            RecordType::Allergy => history.allergies.insert(0, Allergy {
                allergen: name,
                reaction: self.details_or("Unknown"),
                severity: "Moderate".to_string(),
            }),
            RecordType::Prescription => history.prescriptions.insert(0, Prescription {
                medication: name,
                dosage: self.details_or("As directed"),
                prescribed: now_iso.to_string(),
                prescriber: "Self".to_string(),
            }),
            RecordType::Document => history.documents.insert(0, MedicalDocument {
                name,
                date: now_iso.to_string(),
                kind: self.details_or("General"),
                image_data: None,
            }),
        }

        Ok(self.record_type.kind())
    }
}

pub const UPLOADED_IMAGE_TYPE: &str = "Uploaded Image";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    /// Base64 payload, with or without a `data:...;base64,` prefix.
    pub data: String,
}

impl ImageUpload {
    /// Checks the upload and turns it into a document carrying a `data:` URL.
    pub fn into_document(self, now_iso: &str) -> Result<MedicalDocument, String> {
        let content_type = self.content_type.trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err("Please select an image file".to_string());
        }

        let name = self.file_name.trim();
        if name.is_empty() {
            return Err("File name cannot be empty".to_string());
        }

        let payload = match self.data.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => self.data.as_str(),
        };
        let payload = payload.trim();

        if payload.is_empty() {
            return Err("Image data cannot be empty".to_string());
        }
        BASE64
            .decode(payload)
            .map_err(|e| format!("Failed to decode base64 data: {}", e))?;

        Ok(MedicalDocument {
            name: name.to_string(),
            date: now_iso.to_string(),
            kind: UPLOADED_IMAGE_TYPE.to_string(),
            image_data: Some(format!("data:{};base64,{}", content_type, payload)),
        })
    }
}
