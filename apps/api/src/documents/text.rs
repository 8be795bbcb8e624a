//! Text Extractor: turns stored file bytes into text the extraction prompt can embed.
//!
//! Images are transcribed by the model. Everything else is decoded as UTF-8;
//! structural parsing of PDF or office formats belongs upstream of this service.

use base64::Engine as _;

use crate::documents::extraction::{transcribe_image, ExtractionError};
use crate::llm_client::{CompletionModel, ImageInput};

pub fn is_image(file_type: &str) -> bool {
    file_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

pub async fn extract_text(
    model: &dyn CompletionModel,
    bytes: &[u8],
    file_type: &str,
) -> Result<String, ExtractionError> {
    if is_image(file_type) {
        let image = ImageInput {
            media_type: file_type.to_string(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        };
        return transcribe_image(model, &image).await;
    }

    // Invalid sequences become U+FFFD rather than failing the run.
    Ok(String::from_utf8_lossy(bytes).into_owned())
}
