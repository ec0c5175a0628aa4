//! Text extraction: document bytes → [`ExtractedText`].
//!
//! Text files are decoded as UTF-8. PDFs go through two tiers:
//!
//! 1. **Structured** — the PDF's own text layer, blank pages skipped, the
//!    rest joined with `\n`. Accepted when the trimmed result is longer than
//!    `config.vision_threshold_chars` (500).
//! 2. **Vision** — every page rendered and transcribed by the vision model
//!    through the page scheduler. Taken when tier 1 comes up short or the
//!    text layer cannot be read.
//!
//! The threshold is a cheap proxy for "this PDF is scanned". Short
//! born-digital PDFs also fall through to tier 2; they cost vision tokens
//! but still narrate correctly.

use crate::config::ExtractionStrategy;
use crate::context::PipelineContext;
use crate::error::NarrationError;
use crate::output::{ExtractedText, TextSource};
use crate::pipeline::input::{Document, DocumentKind};
use crate::pipeline::scheduler;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Recover narratable text from a document.
///
/// # Errors
/// [`NarrationError::Extraction`] when neither tier yields usable text.
pub async fn extract(
    ctx: &PipelineContext,
    document: &Document,
) -> Result<ExtractedText, NarrationError> {
    match document.kind() {
        DocumentKind::Text => decode_text(document.bytes()),
        DocumentKind::Pdf => extract_pdf(ctx, document).await,
    }
}

fn decode_text(bytes: &[u8]) -> Result<ExtractedText, NarrationError> {
    let text = std::str::from_utf8(bytes).map_err(|e| NarrationError::Extraction {
        detail: format!("text file is not valid UTF-8: {e}"),
    })?;
    if text.trim().is_empty() {
        return Err(NarrationError::Extraction {
            detail: "text file is empty".into(),
        });
    }
    Ok(ExtractedText::plain(text.to_string(), TextSource::TextFile))
}

async fn extract_pdf(
    ctx: &PipelineContext,
    document: &Document,
) -> Result<ExtractedText, NarrationError> {
    let bytes: Arc<[u8]> = Arc::from(document.bytes());
    let password = ctx.config.password.clone();

    if ctx.config.extraction == ExtractionStrategy::Hybrid {
        let parser = Arc::clone(&ctx.parser);
        let pdf = Arc::clone(&bytes);
        let pwd = password.clone();
        let parsed = tokio::task::spawn_blocking(move || parser.page_texts(&pdf, pwd.as_deref()))
            .await
            .map_err(|e| NarrationError::Internal(format!("Parse task panicked: {}", e)))?;

        match parsed {
            Ok(pages) => {
                let page_count = pages.len();
                if let Some(text) = structured_text(&pages, ctx.config.vision_threshold_chars) {
                    info!(
                        "Using text layer: {} chars from {} pages",
                        text.chars().count(),
                        page_count
                    );
                    return Ok(ExtractedText {
                        page_count,
                        ..ExtractedText::plain(text, TextSource::Structured)
                    });
                }
                info!(
                    "Text layer has ≤ {} chars; falling back to vision",
                    ctx.config.vision_threshold_chars
                );
            }
            Err(e) => warn!("Text layer unreadable ({}); falling back to vision", e),
        }
    }

    let renderer = Arc::clone(&ctx.renderer);
    let pdf = Arc::clone(&bytes);
    let max_pixels = ctx.config.max_rendered_pixels;
    let images = tokio::task::spawn_blocking(move || {
        renderer.render_pages(&pdf, password.as_deref(), max_pixels)
    })
    .await
    .map_err(|e| NarrationError::Internal(format!("Render task panicked: {}", e)))??;
    debug!("Rendered {} pages for vision", images.len());

    let vision = scheduler::extract_via_vision(
        ctx.completion.as_ref(),
        &images,
        &ctx.config,
        &ctx.progress,
    )
    .await?;

    Ok(ExtractedText {
        text: vision.text,
        source: TextSource::Vision,
        page_count: images.len(),
        failed_pages: vision.failed_pages,
        input_tokens: vision.input_tokens,
        output_tokens: vision.output_tokens,
    })
}

/// Join non-blank page texts; `None` unless the result beats the threshold.
pub fn structured_text(pages: &[String], threshold_chars: usize) -> Option<String> {
    let joined = pages
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = joined.trim();
    if trimmed.chars().count() > threshold_chars {
        Some(trimmed.to_string())
    } else {
        None
    }
}
