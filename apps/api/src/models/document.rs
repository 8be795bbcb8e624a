use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One uploaded file. `extracted_data` is the AI payload persisted verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: String,
    pub extracted_data: Option<Value>,
    pub processing_time_ms: Option<i64>,
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentTagRow {
    pub document_id: Uuid,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagView {
    pub tag: String,
}

/// A document joined with its tags, as returned by the list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithTags {
    #[serde(flatten)]
    pub document: DocumentRow,
    pub document_tags: Vec<TagView>,
}

impl DocumentWithTags {
    /// The AI summary, if the document has been processed.
    pub fn summary(&self) -> Option<&str> {
        self.document
            .extracted_data
            .as_ref()
            .and_then(|d| d.get("summary"))
            .and_then(Value::as_str)
    }
}
