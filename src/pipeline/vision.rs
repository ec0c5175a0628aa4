//! Page transcription: one rendered page → one vision call → one [`PageResult`].
//!
//! PNG is used over JPEG because it is lossless: compression artefacts on
//! rendered glyphs degrade transcription far more than the larger payload
//! costs. `detail: "high"` lets GPT-4-class models tile the full image so
//! fine print and small tables survive.
//!
//! This stage never retries and never returns an error. Every failure
//! becomes [`PageResult::Failed`] tagged with its page number, so one bad
//! page cannot abort its siblings.

use crate::config::NarrationConfig;
use crate::error::{CompletionError, PageError};
use crate::output::PageResult;
use crate::pipeline::clean::clean_model_text;
use crate::prompts::VISION_PAGE_PROMPT;
use crate::service::{CompletionService, TextRequest};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use std::time::Instant;
use tracing::debug;

/// System turn for page transcription.
const VISION_SYSTEM_PROMPT: &str =
    "You are a meticulous document transcriber. Reproduce the page text faithfully.";

/// Encode a rendered page as a base64 PNG ready for the vision call.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Transcribe one page.
pub async fn process_page(
    service: &dyn CompletionService,
    page_num: usize,
    image: &DynamicImage,
    config: &NarrationConfig,
) -> PageResult {
    let start = Instant::now();

    let image_data = match encode_page(image) {
        Ok(data) => data,
        Err(e) => {
            return PageResult::Failed {
                page_num,
                error: PageError::EncodeFailed {
                    page: page_num,
                    detail: e.to_string(),
                },
            }
        }
    };

    let request = TextRequest::new(VISION_SYSTEM_PROMPT, VISION_PAGE_PROMPT)
        .with_image(image_data)
        .with_temperature(config.text_temperature);

    match service.complete_text(&request).await {
        Ok(completion) => {
            let text = clean_model_text(&completion.content);
            debug!(
                "Page {}: {} input tokens, {} output tokens, {:?}",
                page_num,
                completion.input_tokens,
                completion.output_tokens,
                start.elapsed()
            );
            if text.is_empty() {
                PageResult::Failed {
                    page_num,
                    error: PageError::EmptyResponse { page: page_num },
                }
            } else {
                PageResult::Extracted {
                    page_num,
                    text,
                    input_tokens: completion.input_tokens,
                    output_tokens: completion.output_tokens,
                }
            }
        }
        Err(CompletionError::Timeout { secs }) => PageResult::Failed {
            page_num,
            error: PageError::Timeout {
                page: page_num,
                secs,
            },
        },
        Err(e) => PageResult::Failed {
            page_num,
            error: PageError::LlmFailed {
                page: page_num,
                detail: e.to_string(),
            },
        },
    }
}
