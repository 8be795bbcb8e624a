use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle of a document row: `uploading → processing → {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploading" => Some(DocumentStatus::Uploading),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }

    /// Whether a processing run may take this document.
    /// A run in flight or a finished result blocks the claim; a failed run may be retried.
    pub fn is_claimable(&self) -> bool {
        matches!(self, DocumentStatus::Uploading | DocumentStatus::Failed)
    }

    /// States a claim may start from, as stored strings.
    pub fn claimable() -> [&'static str; 2] {
        [
            DocumentStatus::Uploading.as_str(),
            DocumentStatus::Failed.as_str(),
        ]
    }
}

/// A named entity value. The model is asked for strings or numbers only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    Number(serde_json::Number),
    Text(String),
}

/// Structured result of AI analysis of one document. Built wholesale from one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub document_type: String,
    pub key_entities: BTreeMap<String, EntityValue>,
    pub summary: String,
    pub tags: Vec<String>,
    /// 0.0 – 1.0
    pub confidence: f64,
    pub risk_flags: Vec<String>,
}

impl ExtractedData {
    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.document_type.trim().is_empty() {
            return Err("documentType is empty".to_string());
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} is outside [0, 1]", self.confidence));
        }
        Ok(())
    }
}

/// Metadata recorded with the `document_processed` analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub file_type: String,
    pub file_size: i64,
    pub processing_time_ms: i64,
    pub confidence_score: f64,
    pub document_type: String,
}

pub const DOCUMENT_PROCESSED_ACTION: &str = "document_processed";
