//! Axum route handlers for the Documents API.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::documents::models::ExtractedData;
use crate::documents::pipeline::process_document;
use crate::documents::search::rank_by_relevance;
use crate::errors::AppError;
use crate::models::document::DocumentWithTags;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub document_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub extracted_data: ExtractedData,
    pub processing_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub user_id: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentWithTags>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /documents/process
///
/// Runs the processing pipeline for one owned document and returns its extracted data.
pub async fn handle_process(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(document_id), Some(user_id)) = (
        required(request.document_id),
        required(request.user_id),
    ) else {
        return Err(AppError::Validation(
            "Document ID and User ID are required".to_string(),
        ));
    };

    // An id that is not a UUID cannot name any stored document.
    let (Some(document_id), Some(user_id)) = (parse_id(&document_id), parse_id(&user_id)) else {
        return Err(AppError::NotFound("Document not found".to_string()));
    };

    let outcome = process_document(
        state.documents.as_ref(),
        state.storage.as_ref(),
        state.model.as_ref(),
        document_id,
        user_id,
    )
    .await?;

    Ok(Json(ProcessResponse {
        success: true,
        extracted_data: outcome.extracted_data,
        processing_time: outcome.processing_time_ms,
    }))
}

/// GET /documents/process?userId=...
///
/// Lists the user's documents newest-first, each with its tags.
pub async fn handle_list(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::Validation(format!("Invalid query: {}", e.body_text())))?;
    let user_id = required(params.user_id)
        .ok_or_else(|| AppError::Validation("User ID is required".to_string()))?;

    let documents = match parse_id(&user_id) {
        Some(user_id) => state
            .documents
            .list_with_tags(user_id)
            .await
            .map_err(|e| AppError::Internal(e.context("Failed to fetch documents")))?,
        None => Vec::new(),
    };

    Ok(Json(DocumentListResponse { documents }))
}

/// POST /documents/search
///
/// Ranks the user's documents against a free-text query. Falls back to list order
/// when ranking is unavailable.
pub async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let Json(request) = payload.map_err(invalid_body)?;

    let (Some(user_id), Some(query)) = (required(request.user_id), required(request.query)) else {
        return Err(AppError::Validation(
            "User ID and query are required".to_string(),
        ));
    };

    let Some(user_id) = parse_id(&user_id) else {
        return Ok(Json(DocumentListResponse { documents: vec![] }));
    };

    let documents = state
        .documents
        .list_with_tags(user_id)
        .await
        .map_err(|e| AppError::Internal(e.context("Failed to fetch documents")))?;

    info!("Ranking {} document(s) for user {user_id}", documents.len());
    let documents = rank_by_relevance(state.model.as_ref(), &query, documents).await;

    Ok(Json(DocumentListResponse { documents }))
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_id(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}
