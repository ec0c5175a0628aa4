//! Bounded fan-out of page transcription.
//!
//! Every page becomes one vision call; at most `config.concurrency` are in
//! flight at once (`buffer_unordered`) and the rest wait their turn. Results
//! come back in completion order, so the page number is the only ordering
//! key: survivors are sorted by it before they are joined.

use crate::config::NarrationConfig;
use crate::error::{NarrationError, PageError};
use crate::output::PageResult;
use crate::pipeline::vision;
use crate::progress::ProgressCallback;
use crate::prompts::CHUNK_BREAK;
use crate::service::CompletionService;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use tracing::{info, warn};

/// Joined text of the pages that survived.
#[derive(Debug, Clone)]
pub struct VisionText {
    pub text: String,
    pub pages_extracted: usize,
    pub failed_pages: Vec<PageError>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Separator placed between transcribed pages.
pub fn page_separator() -> String {
    format!("\n\n{CHUNK_BREAK}\n\n")
}

/// Transcribe every page and join the survivors in page order.
///
/// # Errors
/// [`NarrationError::Extraction`] when `images` is empty or every page failed.
pub async fn extract_via_vision(
    service: &dyn CompletionService,
    images: &[DynamicImage],
    config: &NarrationConfig,
    progress: &ProgressCallback,
) -> Result<VisionText, NarrationError> {
    if images.is_empty() {
        return Err(NarrationError::Extraction {
            detail: "document has no pages".into(),
        });
    }

    let total_pages = images.len();
    progress.on_pages_start(total_pages);
    info!(
        "Transcribing {} pages, up to {} in flight",
        total_pages, config.concurrency
    );

    let results: Vec<PageResult> = stream::iter(images.iter().enumerate().map(|(idx, img)| {
        let page_num = idx + 1;
        async move {
            progress.on_page_start(page_num, total_pages);
            let result = vision::process_page(service, page_num, img, config).await;
            match &result {
                PageResult::Extracted { text, .. } => {
                    progress.on_page_complete(page_num, total_pages, text.len())
                }
                PageResult::Failed { error, .. } => {
                    progress.on_page_error(page_num, total_pages, &error.to_string())
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    collect_pages(results)
}

/// Drop failures, restore page order and join.
pub fn collect_pages(mut results: Vec<PageResult>) -> Result<VisionText, NarrationError> {
    results.sort_by_key(|r| r.page_num());

    let mut texts = Vec::with_capacity(results.len());
    let mut failed_pages = Vec::new();
    let mut input_tokens = 0;
    let mut output_tokens = 0;

    for result in results {
        match result {
            PageResult::Extracted {
                text,
                input_tokens: i,
                output_tokens: o,
                ..
            } => {
                texts.push(text);
                input_tokens += i;
                output_tokens += o;
            }
            PageResult::Failed { page_num, error } => {
                warn!("Skipping page {}: {}", page_num, error);
                failed_pages.push(error);
            }
        }
    }

    if texts.is_empty() {
        let first = failed_pages
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no results".to_string());
        let detail = format!("no pages could be processed ({first})");
        let provider_down = !failed_pages.is_empty()
            && failed_pages
                .iter()
                .all(|e| matches!(e, PageError::LlmFailed { .. } | PageError::Timeout { .. }));
        return Err(if provider_down {
            NarrationError::VisionUnavailable { detail }
        } else {
            NarrationError::Extraction { detail }
        });
    }

    Ok(VisionText {
        pages_extracted: texts.len(),
        text: texts.join(&page_separator()),
        failed_pages,
        input_tokens,
        output_tokens,
    })
}
