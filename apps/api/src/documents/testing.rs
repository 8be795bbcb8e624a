//! In-memory fakes of the pipeline's collaborators for unit and router tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::documents::models::{DocumentStatus, ProcessingMetadata, DOCUMENT_PROCESSED_ACTION};
use crate::documents::store::{attach_tags, CompletedDocument, DocumentRepository};
use crate::llm_client::{CompletionModel, ImageInput, LlmError};
use crate::models::document::{DocumentRow, DocumentTagRow, DocumentWithTags};
use crate::storage::{ObjectStore, StorageError};

pub type AnalyticsRecord = (Uuid, Uuid, String, ProcessingMetadata);

pub fn uploaded_document(user_id: Uuid, file_path: &str, file_type: &str) -> DocumentRow {
    let now = Utc::now();
    DocumentRow {
        id: Uuid::new_v4(),
        user_id,
        name: file_path.rsplit('/').next().unwrap_or(file_path).to_string(),
        file_path: file_path.to_string(),
        file_size: 31,
        file_type: file_type.to_string(),
        status: DocumentStatus::Uploading.as_str().to_string(),
        extracted_data: None,
        processing_time_ms: None,
        confidence_score: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn completed_document(user_id: Uuid, name: &str, summary: &str) -> DocumentRow {
    let mut document = uploaded_document(user_id, &format!("uploads/{name}"), "text/plain");
    document.name = name.to_string();
    document.status = DocumentStatus::Completed.as_str().to_string();
    document.extracted_data = Some(json!({
        "documentType": "other",
        "keyEntities": {},
        "summary": summary,
        "tags": [],
        "confidence": 0.5,
        "riskFlags": []
    }));
    document.confidence_score = Some(0.5);
    document.processing_time_ms = Some(10);
    document
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<Uuid, DocumentRow>,
    tags: Vec<DocumentTagRow>,
    analytics: Vec<AnalyticsRecord>,
    processed: HashMap<Uuid, i32>,
    fail_complete: bool,
}

#[derive(Default)]
pub struct MemoryDocumentRepository {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentRepository {
    pub fn insert(&self, document: DocumentRow) {
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(document.id, document);
    }

    pub fn document(&self, id: Uuid) -> DocumentRow {
        self.state.lock().unwrap().documents[&id].clone()
    }

    pub fn set_status(&self, id: Uuid, status: DocumentStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(document) = state.documents.get_mut(&id) {
            document.status = status.as_str().to_string();
        }
    }

    pub fn tags_for(&self, id: Uuid) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .tags
            .iter()
            .filter(|t| t.document_id == id)
            .map(|t| t.tag.clone())
            .collect()
    }

    pub fn analytics(&self) -> Vec<AnalyticsRecord> {
        self.state.lock().unwrap().analytics.clone()
    }

    pub fn processed_count(&self, user_id: Uuid) -> i32 {
        self.state
            .lock()
            .unwrap()
            .processed
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    /// Makes every later `complete` fail, as a dropped connection would.
    pub fn fail_on_complete(&self) {
        self.state.lock().unwrap().fail_complete = true;
    }

    fn status_of(document: &DocumentRow) -> Option<DocumentStatus> {
        DocumentStatus::parse(&document.status)
    }
}

#[async_trait]
impl DocumentRepository for MemoryDocumentRepository {
    async fn find_owned(&self, document_id: Uuid, user_id: Uuid) -> Result<Option<DocumentRow>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .documents
            .get(&document_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn claim(&self, document_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.documents.get_mut(&document_id) {
            Some(document) if Self::status_of(document).is_some_and(|s| s.is_claimable()) => {
                document.status = DocumentStatus::Processing.as_str().to_string();
                document.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, document_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(document) = state.documents.get_mut(&document_id) {
            if Self::status_of(document) == Some(DocumentStatus::Processing) {
                document.status = DocumentStatus::Failed.as_str().to_string();
                document.extracted_data = None;
                document.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn complete(&self, outcome: &CompletedDocument<'_>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_complete {
            bail!("connection reset");
        }

        let id = outcome.document.id;
        let user_id = outcome.document.user_id;
        let Some(document) = state.documents.get_mut(&id) else {
            bail!("document {id} vanished");
        };
        if Self::status_of(document) != Some(DocumentStatus::Processing) {
            bail!("document {id} is no longer processing");
        }
        document.status = DocumentStatus::Completed.as_str().to_string();
        document.extracted_data = Some(serde_json::to_value(outcome.data)?);
        document.processing_time_ms = Some(outcome.processing_time_ms);
        document.confidence_score = Some(outcome.data.confidence);
        document.updated_at = Utc::now();

        for tag in &outcome.data.tags {
            state.tags.push(DocumentTagRow {
                document_id: id,
                tag: tag.clone(),
            });
        }
        *state.processed.entry(user_id).or_insert(0) += 1;
        state.analytics.push((
            user_id,
            id,
            DOCUMENT_PROCESSED_ACTION.to_string(),
            outcome.analytics_metadata(),
        ));
        Ok(())
    }

    async fn list_with_tags(&self, user_id: Uuid) -> Result<Vec<DocumentWithTags>> {
        let state = self.state.lock().unwrap();
        let mut documents: Vec<DocumentRow> = state
            .documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(attach_tags(documents, state.tags.clone()))
    }
}

/// Shifts a document's creation time, for ordering tests.
pub fn aged(mut document: DocumentRow, minutes: i64) -> DocumentRow {
    document.created_at -= Duration::minutes(minutes);
    document
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: HashMap<String, Bytes>,
}

impl FakeObjectStore {
    pub fn with_object(mut self, path: &str, contents: &[u8]) -> Self {
        self.objects
            .insert(path.to_string(), Bytes::copy_from_slice(contents));
        self
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        self.objects
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

/// Replies to calls in order; `Err` entries become API errors.
/// Runs out of script → `EmptyContent`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    images: Mutex<Vec<ImageInput>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn images(&self) -> Vec<ImageInput> {
        self.images.lock().unwrap().clone()
    }

    fn next_reply(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(LlmError::Api {
                status: 500,
                message,
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.next_reply(prompt)
    }

    async fn complete_with_image(
        &self,
        prompt: &str,
        _system: &str,
        image: &ImageInput,
    ) -> Result<String, LlmError> {
        self.images.lock().unwrap().push(image.clone());
        self.next_reply(prompt)
    }
}
