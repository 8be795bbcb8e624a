use std::sync::Arc;

use crate::documents::store::DocumentRepository;
use crate::llm_client::CompletionModel;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Record store for documents, tags, counters and analytics.
    pub documents: Arc<dyn DocumentRepository>,
    /// Object store holding uploaded files.
    pub storage: Arc<dyn ObjectStore>,
    /// Hosted model used for transcription, extraction and ranking.
    pub model: Arc<dyn CompletionModel>,
}
