//! Relevance ranking of a user's documents against a free-text query.
//!
//! Any failure degrades to the input order; ranking never fails a request.

use tracing::warn;

use crate::documents::prompts::SEARCH_PROMPT_TEMPLATE;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::CompletionModel;
use crate::models::document::DocumentWithTags;

pub async fn rank_by_relevance(
    model: &dyn CompletionModel,
    query: &str,
    documents: Vec<DocumentWithTags>,
) -> Vec<DocumentWithTags> {
    if documents.is_empty() {
        return documents;
    }

    let prompt = build_search_prompt(query, &documents);
    let response = match model.complete(&prompt, JSON_ONLY_SYSTEM).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Relevance ranking failed, returning unranked documents: {e}");
            return documents;
        }
    };

    match parse_ranking(&response) {
        Some(indices) => reorder(documents, &indices),
        None => {
            warn!("Relevance ranking response had no index list, returning unranked documents");
            documents
        }
    }
}

fn build_search_prompt(query: &str, documents: &[DocumentWithTags]) -> String {
    let listing = documents
        .iter()
        .enumerate()
        .map(|(idx, doc)| {
            format!(
                "{idx}: {} - {}",
                doc.document.name,
                doc.summary().unwrap_or("No summary")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    SEARCH_PROMPT_TEMPLATE
        .replace("{documents}", &listing)
        .replace("{query}", query)
}

/// Parses the first `[...]` span of the response as a list of indices.
fn parse_ranking(response: &str) -> Option<Vec<usize>> {
    let start = response.find('[')?;
    let end = start + response[start..].find(']')?;
    serde_json::from_str(&response[start..=end]).ok()
}

/// Keeps documents in ranked order; out-of-range and repeated indices are skipped.
fn reorder(documents: Vec<DocumentWithTags>, indices: &[usize]) -> Vec<DocumentWithTags> {
    let mut slots: Vec<Option<DocumentWithTags>> = documents.into_iter().map(Some).collect();
    indices
        .iter()
        .filter_map(|&idx| slots.get_mut(idx).and_then(Option::take))
        .collect()
}
