//! AI Extraction Client: structured extraction and image transcription over a `CompletionModel`.

use thiserror::Error;
use tracing::debug;

use crate::documents::models::ExtractedData;
use crate::documents::prompts::{
    EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM, TRANSCRIBE_PROMPT, TRANSCRIBE_SYSTEM,
    TYPE_HINT_TEMPLATE,
};
use crate::llm_client::{CompletionModel, ImageInput, LlmError};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("no JSON object found in model response")]
    NoJsonObject,

    #[error("invalid JSON in model response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model response failed validation: {0}")]
    Schema(String),
}

impl ExtractionError {
    /// True when the model answered but its answer was unusable.
    pub fn is_parse_failure(&self) -> bool {
        !matches!(self, ExtractionError::Model(_))
    }
}

/// Asks the model to classify `text` and pull structured fields out of it.
pub async fn extract_document_data(
    model: &dyn CompletionModel,
    text: &str,
    document_type_hint: Option<&str>,
) -> Result<ExtractedData, ExtractionError> {
    let prompt = build_extraction_prompt(text, document_type_hint);
    let response = model.complete(&prompt, EXTRACTION_SYSTEM).await?;
    debug!("Extraction response: {} chars", response.len());
    parse_extracted_data(&response)
}

/// Returns the model's transcription of all visible text in the image, verbatim.
pub async fn transcribe_image(
    model: &dyn CompletionModel,
    image: &ImageInput,
) -> Result<String, ExtractionError> {
    Ok(model
        .complete_with_image(TRANSCRIBE_PROMPT, TRANSCRIBE_SYSTEM, image)
        .await?)
}

fn build_extraction_prompt(text: &str, document_type_hint: Option<&str>) -> String {
    let hint = document_type_hint
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| TYPE_HINT_TEMPLATE.replace("{document_type}", h))
        .unwrap_or_default();
    // Hint first so document text can never be mistaken for a placeholder.
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{type_hint}", &hint)
        .replace("{document_text}", text)
}

/// Parses the first balanced JSON object in a free-text model response.
pub fn parse_extracted_data(response: &str) -> Result<ExtractedData, ExtractionError> {
    let span = find_json_object(response).ok_or(ExtractionError::NoJsonObject)?;
    let data: ExtractedData = serde_json::from_str(span)?;
    data.validate().map_err(ExtractionError::Schema)?;
    Ok(data)
}

/// Locates the first balanced `{...}` span, ignoring braces inside string literals.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::testing::ScriptedModel;

    const INVOICE_JSON: &str = r#"{"documentType":"invoice","keyEntities":{"amount":"$500","date":"2024-03-01"},"summary":"Invoice for $500 due 2024-03-01.","tags":["invoice"],"confidence":0.9,"riskFlags":[]}"#;

    #[test]
    fn test_find_json_object_in_prose() {
        let text = format!("Here is the analysis:\n{INVOICE_JSON}\nLet me know if you need more.");
        assert_eq!(find_json_object(&text), Some(INVOICE_JSON));
    }

    #[test]
    fn test_find_json_object_inside_code_fence() {
        let text = format!("```json\n{INVOICE_JSON}\n```");
        assert_eq!(find_json_object(&text), Some(INVOICE_JSON));
    }

    #[test]
    fn test_find_json_object_stops_at_first_balanced_span() {
        let text = r#"{"a": {"b": 1}} trailing {"c": 2}"#;
        assert_eq!(find_json_object(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn test_find_json_object_ignores_braces_in_strings() {
        let text = r#"{"summary": "uses } and { and \" quotes"} tail"#;
        assert_eq!(
            find_json_object(text),
            Some(r#"{"summary": "uses } and { and \" quotes"}"#)
        );
    }

    #[test]
    fn test_find_json_object_none_without_braces() {
        assert_eq!(find_json_object("I could not read this document."), None);
    }

    #[test]
    fn test_find_json_object_none_when_unbalanced() {
        assert_eq!(find_json_object(r#"{"documentType": "invoice""#), None);
    }

    #[test]
    fn test_parse_extracted_data_accepts_valid_object() {
        let data = parse_extracted_data(&format!("Sure! {INVOICE_JSON}")).unwrap();
        assert_eq!(data.document_type, "invoice");
        assert_eq!(data.tags, vec!["invoice"]);
        assert!((data.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_extracted_data_no_object() {
        let err = parse_extracted_data("no structured data here").unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonObject));
        assert!(err.is_parse_failure());
    }

    #[test]
    fn test_parse_extracted_data_invalid_json() {
        let err = parse_extracted_data("{documentType: invoice}").unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));
    }

    #[test]
    fn test_parse_extracted_data_missing_field() {
        let err = parse_extracted_data(r#"{"documentType":"invoice","summary":"x"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));
    }

    #[test]
    fn test_parse_extracted_data_rejects_confidence_out_of_range() {
        let text = INVOICE_JSON.replace("0.9", "9");
        let err = parse_extracted_data(&text).unwrap_err();
        assert!(matches!(err, ExtractionError::Schema(_)));
    }

    #[test]
    fn test_prompt_embeds_text_and_hint() {
        let prompt = build_extraction_prompt("Invoice for $500", Some("invoice"));
        assert!(prompt.contains("Invoice for $500"));
        assert!(prompt.contains("EXPECTED DOCUMENT TYPE: invoice"));
        assert!(!prompt.contains("{type_hint}"));
        assert!(!prompt.contains("{document_text}"));
    }

    #[test]
    fn test_prompt_without_hint_leaves_no_placeholder() {
        let prompt = build_extraction_prompt("text", None);
        assert!(!prompt.contains("EXPECTED DOCUMENT TYPE"));
        assert!(!prompt.contains("{type_hint}"));
    }

    #[test]
    fn test_document_text_containing_placeholder_is_not_expanded() {
        let prompt = build_extraction_prompt("literal {type_hint} in body", Some("memo"));
        assert!(prompt.contains("literal {type_hint} in body"));
    }

    #[tokio::test]
    async fn test_extract_document_data_uses_model_reply() {
        let model = ScriptedModel::new(vec![Ok(format!("Result: {INVOICE_JSON}"))]);
        let data = extract_document_data(&model, "Invoice for $500 due 2024-03-01", None)
            .await
            .unwrap();
        assert_eq!(data.document_type, "invoice");
        assert!(model.prompts()[0].contains("Invoice for $500 due 2024-03-01"));
    }

    #[tokio::test]
    async fn test_extract_document_data_model_failure_is_not_parse_failure() {
        let model = ScriptedModel::new(vec![Err("overloaded".to_string())]);
        let err = extract_document_data(&model, "text", None).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Model(_)));
        assert!(!err.is_parse_failure());
    }

    #[tokio::test]
    async fn test_transcribe_image_returns_text_verbatim() {
        let model = ScriptedModel::new(vec![Ok("  RECEIPT\nTotal: $12 ".to_string())]);
        let image = ImageInput {
            media_type: "image/jpeg".to_string(),
            data_base64: "AAEC".to_string(),
        };
        let text = transcribe_image(&model, &image).await.unwrap();
        assert_eq!(text, "  RECEIPT\nTotal: $12 ");
        assert_eq!(model.images(), vec![image]);
    }
}
