// Document intake: storage fetch → text extraction → AI extraction → persistence.
// All LLM calls go through llm_client: no direct Anthropic calls here.

pub mod extraction;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod search;
pub mod store;
pub mod text;

#[cfg(test)]
pub mod testing;
