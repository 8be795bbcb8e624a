//! Document Record Store: every read and write the pipeline makes against Postgres.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::documents::models::{
    DocumentStatus, ExtractedData, ProcessingMetadata, DOCUMENT_PROCESSED_ACTION,
};
use crate::models::document::{DocumentRow, DocumentTagRow, DocumentWithTags, TagView};

/// Everything written when a processing run succeeds.
pub struct CompletedDocument<'a> {
    pub document: &'a DocumentRow,
    pub data: &'a ExtractedData,
    pub processing_time_ms: i64,
}

impl CompletedDocument<'_> {
    pub fn analytics_metadata(&self) -> ProcessingMetadata {
        ProcessingMetadata {
            file_type: self.document.file_type.clone(),
            file_size: self.document.file_size,
            processing_time_ms: self.processing_time_ms,
            confidence_score: self.data.confidence,
            document_type: self.data.document_type.clone(),
        }
    }
}

/// Record store seam. Carried in `AppState` as `Arc<dyn DocumentRepository>`.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// The document with this id, if it belongs to `user_id`.
    async fn find_owned(&self, document_id: Uuid, user_id: Uuid) -> Result<Option<DocumentRow>>;

    /// Atomically moves the document to `processing` if no other run holds it
    /// and it has no result yet. Returns false when the claim lost.
    async fn claim(&self, document_id: Uuid) -> Result<bool>;

    /// Moves a claimed document to `failed` with no payload.
    async fn mark_failed(&self, document_id: Uuid) -> Result<()>;

    /// Persists a successful run: payload and status, tags, the owner's
    /// processed counter, and the analytics event, as one unit.
    async fn complete(&self, outcome: &CompletedDocument<'_>) -> Result<()>;

    /// All of a user's documents, newest first, each with its tags.
    async fn list_with_tags(&self, user_id: Uuid) -> Result<Vec<DocumentWithTags>>;
}

#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn find_owned(&self, document_id: Uuid, user_id: Uuid) -> Result<Option<DocumentRow>> {
        Ok(sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE id = $1 AND user_id = $2",
        )
        .bind(document_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn claim(&self, document_id: Uuid) -> Result<bool> {
        let claimable = DocumentStatus::claimable();
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = $2, updated_at = now()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(document_id)
        .bind(DocumentStatus::Processing.as_str())
        .bind(&claimable[..])
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_failed(&self, document_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE documents
            SET status = $2, extracted_data = NULL, updated_at = now()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(document_id)
        .bind(DocumentStatus::Failed.as_str())
        .bind(DocumentStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        info!("Document {document_id} marked failed");
        Ok(())
    }

    async fn complete(&self, outcome: &CompletedDocument<'_>) -> Result<()> {
        let document = outcome.document;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE documents
            SET status = $2,
                extracted_data = $3,
                processing_time_ms = $4,
                confidence_score = $5,
                updated_at = now()
            WHERE id = $1 AND status = $6
            "#,
        )
        .bind(document.id)
        .bind(DocumentStatus::Completed.as_str())
        .bind(Json(outcome.data))
        .bind(outcome.processing_time_ms)
        .bind(outcome.data.confidence)
        .bind(DocumentStatus::Processing.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            bail!("document {} is no longer processing", document.id);
        }

        // One row per tag exactly as the model returned it; `position` keeps its order.
        let tags = &outcome.data.tags;
        if !tags.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO document_tags (document_id, tag, position)
                SELECT $1, t.tag, t.position
                FROM UNNEST($2::text[]) WITH ORDINALITY AS t(tag, position)
                "#,
            )
            .bind(document.id)
            .bind(tags)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE users SET documents_processed = documents_processed + 1 WHERE id = $1",
        )
        .bind(document.user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO analytics (user_id, document_id, action, metadata) VALUES ($1, $2, $3, $4)",
        )
        .bind(document.user_id)
        .bind(document.id)
        .bind(DOCUMENT_PROCESSED_ACTION)
        .bind(Json(outcome.analytics_metadata()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Document {} completed with {} tag(s)",
            document.id,
            tags.len()
        );
        Ok(())
    }

    async fn list_with_tags(&self, user_id: Uuid) -> Result<Vec<DocumentWithTags>> {
        let documents = sqlx::query_as::<_, DocumentRow>(
            "SELECT * FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        let tags = sqlx::query_as::<_, DocumentTagRow>(
            "SELECT document_id, tag FROM document_tags WHERE document_id = ANY($1) ORDER BY document_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_tags(documents, tags))
    }
}

/// Nests tag rows under their documents, preserving document order.
pub fn attach_tags(documents: Vec<DocumentRow>, tags: Vec<DocumentTagRow>) -> Vec<DocumentWithTags> {
    let mut by_document: HashMap<Uuid, Vec<TagView>> = HashMap::new();
    for row in tags {
        by_document
            .entry(row.document_id)
            .or_default()
            .push(TagView { tag: row.tag });
    }

    documents
        .into_iter()
        .map(|document| DocumentWithTags {
            document_tags: by_document.remove(&document.id).unwrap_or_default(),
            document,
        })
        .collect()
}
