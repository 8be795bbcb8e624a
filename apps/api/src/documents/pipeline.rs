//! Processing pipeline: orchestrates one document from stored file to persisted result.
//!
//! Flow: find_owned → claim → download → extract_text → extract_document_data →
//!       complete (payload, tags, counter, analytics) → return response.
//!
//! Download and AI failures write `failed` before returning. A failed `complete`
//! leaves the document in `processing`; nothing retries it.

use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::extraction::{extract_document_data, ExtractionError};
use crate::documents::models::{DocumentStatus, ExtractedData};
use crate::documents::store::{CompletedDocument, DocumentRepository};
use crate::documents::text::extract_text;
use crate::errors::{AppError, AI_FAILURE_MESSAGE};
use crate::llm_client::CompletionModel;
use crate::storage::ObjectStore;

pub const DOWNLOAD_FAILURE_MESSAGE: &str = "Failed to download file";

/// Result of one successful processing run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub extracted_data: ExtractedData,
    pub processing_time_ms: i64,
}

/// Runs the full processing pipeline for a document owned by `user_id`.
///
/// Steps:
/// 1. find_owned() → DocumentRow (NotFound when absent or owned by someone else)
/// 2. claim() → status `processing` (Conflict when another run holds it or it already completed)
/// 3. download() → file bytes (failure → `failed`, Upstream)
/// 4. extract_text() → raw text (failure → `failed`, Upstream/Parse)
/// 5. extract_document_data() → ExtractedData, timed (failure → `failed`, Upstream/Parse)
/// 6. complete() → `completed` with payload, tags, counter, analytics (failure → Internal)
pub async fn process_document(
    documents: &dyn DocumentRepository,
    storage: &dyn ObjectStore,
    model: &dyn CompletionModel,
    document_id: Uuid,
    user_id: Uuid,
) -> Result<ProcessOutcome, AppError> {
    // Step 1: Load the owned record
    let document = documents
        .find_owned(document_id, user_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    // Step 2: Claim. The status read above is only a fast path; the claim decides.
    let claimable = DocumentStatus::parse(&document.status).is_some_and(|s| s.is_claimable());
    if !claimable
        || !documents
            .claim(document_id)
            .await
            .map_err(AppError::Internal)?
    {
        return Err(AppError::Conflict(
            "Document is already processing or completed".to_string(),
        ));
    }
    info!("Processing document {document_id} ({})", document.file_type);

    // Step 3: Download
    let bytes = match storage.download(&document.file_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Download of {} failed: {e}", document.file_path);
            fail_document(documents, document_id).await;
            return Err(AppError::Upstream(DOWNLOAD_FAILURE_MESSAGE.to_string()));
        }
    };

    // Steps 4–5: Text extraction and AI extraction
    let (extracted_data, processing_time_ms) =
        match analyze(model, &bytes, &document.file_type).await {
            Ok(result) => result,
            Err(e) => {
                error!("AI processing of document {document_id} failed: {e}");
                fail_document(documents, document_id).await;
                return Err(if e.is_parse_failure() {
                    AppError::Parse(e.to_string())
                } else {
                    AppError::Upstream(AI_FAILURE_MESSAGE.to_string())
                });
            }
        };

    // Step 6: Persist
    documents
        .complete(&CompletedDocument {
            document: &document,
            data: &extracted_data,
            processing_time_ms,
        })
        .await
        .map_err(|e| AppError::Internal(e.context("Failed to update document")))?;

    info!(
        "Document {document_id} completed: type={}, confidence={:.2}, {}ms",
        extracted_data.document_type, extracted_data.confidence, processing_time_ms
    );

    Ok(ProcessOutcome {
        extracted_data,
        processing_time_ms,
    })
}

/// Extracts text, then structured data; only the structured extraction is timed.
async fn analyze(
    model: &dyn CompletionModel,
    bytes: &[u8],
    file_type: &str,
) -> Result<(ExtractedData, i64), ExtractionError> {
    let text = extract_text(model, bytes, file_type).await?;

    let started = Instant::now();
    let data = extract_document_data(model, &text, None).await?;
    let elapsed_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    Ok((data, elapsed_ms))
}

/// The caller is already returning an error; a failed status write is only logged.
async fn fail_document(documents: &dyn DocumentRepository, document_id: Uuid) {
    if let Err(e) = documents.mark_failed(document_id).await {
        warn!("Could not mark document {document_id} failed: {e:?}");
    }
}
