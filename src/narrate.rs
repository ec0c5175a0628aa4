//! Run orchestration: document (or earlier text) + profile → narration.
//!
//! A run walks a fixed sequence of stages:
//!
//! ```text
//! Received → Extracting → Summarizing → Formatting → Synthesizing
//!          → Assembling → Persisting → Completed
//! ```
//!
//! Any stage may abort the run; the error carries the stage it came from
//! (see [`NarrationError::stage`]). Reruns skip extraction and start at
//! `Summarizing` with text from an earlier run. Formatting is the one stage
//! that cannot fail a run: a failed card degrades to the plain card.
//!
//! Nothing here retries. Transport retries live in
//! [`crate::service::ResilientService`].

use crate::context::PipelineContext;
use crate::error::NarrationError;
use crate::history::{NewHistoryEntry, ProcessingMethod, SettingsSnapshot};
use crate::output::{ExtractedText, NarrationOutput, NarrationStats, TextSource};
use crate::pipeline::input::{self, Document};
use crate::pipeline::{assemble, extract, format, summarize, synthesize};
use crate::profile::RequestProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Stage of a narration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Extracting,
    Summarizing,
    Formatting,
    Synthesizing,
    Assembling,
    Persisting,
    Completed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Extracting => "extracting",
            Stage::Summarizing => "summarizing",
            Stage::Formatting => "formatting",
            Stage::Synthesizing => "synthesizing",
            Stage::Assembling => "assembling",
            Stage::Persisting => "persisting",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a run starts from.
#[derive(Debug, Clone)]
pub enum RunInput {
    Document(Document),
    /// Text extracted by an earlier run, narrated again with a new profile.
    Rerun {
        text: String,
        original_filename: String,
    },
}

impl RunInput {
    fn filename(&self) -> &str {
        match self {
            RunInput::Document(doc) => doc.filename(),
            RunInput::Rerun {
                original_filename, ..
            } => original_filename,
        }
    }
}

fn enter(ctx: &PipelineContext, current: &mut Stage, next: Stage) {
    *current = next;
    info!("Stage: {}", next);
    ctx.progress.on_stage(next);
}

/// Narrate a document or rerun text.
///
/// # Errors
/// The first stage error, or a validation error raised before any remote call.
pub async fn run(
    ctx: &PipelineContext,
    input: RunInput,
    profile: &RequestProfile,
) -> Result<NarrationOutput, NarrationError> {
    let mut stage = Stage::Received;
    ctx.progress.on_stage(stage);

    let result = run_stages(ctx, input, profile, &mut stage).await;
    match &result {
        Ok(output) => {
            enter(ctx, &mut stage, Stage::Completed);
            ctx.progress.on_run_complete(output.audio.duration_secs);
        }
        Err(e) => {
            let failed_in = e.stage().unwrap_or(stage);
            warn!("Run failed while {}: {}", failed_in, e);
            ctx.progress.on_run_failed(failed_in, &e.to_string());
        }
    }
    result
}

async fn run_stages(
    ctx: &PipelineContext,
    input: RunInput,
    profile: &RequestProfile,
    stage: &mut Stage,
) -> Result<NarrationOutput, NarrationError> {
    let total_start = Instant::now();

    // ── Received ────────────────────────────────────────────────────────
    profile.validate()?;
    let filename = input.filename().to_string();
    info!(
        "Narrating '{}': goal={}, {} min, voice={}",
        filename,
        profile.goal.key(),
        profile.target_minutes,
        profile.voice
    );

    // ── Extracting ──────────────────────────────────────────────────────
    let extract_start = Instant::now();
    let extracted = match input {
        RunInput::Document(document) => {
            document.check_size(ctx.config.max_document_bytes)?;
            enter(ctx, stage, Stage::Extracting);
            extract::extract(ctx, &document).await?
        }
        RunInput::Rerun { text, .. } => {
            if text.trim().is_empty() {
                return Err(NarrationError::Validation(
                    "rerun text must not be empty".into(),
                ));
            }
            ExtractedText::plain(text, TextSource::Rerun)
        }
    };
    let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

    // ── Summarizing ─────────────────────────────────────────────────────
    enter(ctx, stage, Stage::Summarizing);
    let summary_start = Instant::now();
    let summary = summarize::summarize(
        ctx.completion.as_ref(),
        &extracted.text,
        profile,
        &ctx.config,
    )
    .await?;
    let summary_duration_ms = summary_start.elapsed().as_millis() as u64;

    // ── Formatting ──────────────────────────────────────────────────────
    enter(ctx, stage, Stage::Formatting);
    let formatted_summary = match ctx.formatter.format(&summary.text, profile).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Summary card unavailable, using plain card: {}", e);
            format::plain_card(&summary.text)
        }
    };

    // ── Synthesizing ────────────────────────────────────────────────────
    enter(ctx, stage, Stage::Synthesizing);
    let synthesis_start = Instant::now();
    let chunks = synthesize::synthesize(
        ctx.completion.as_ref(),
        &summary.text,
        profile,
        &ctx.config,
        &ctx.progress,
    )
    .await?;
    let synthesis_duration_ms = synthesis_start.elapsed().as_millis() as u64;

    // ── Assembling ──────────────────────────────────────────────────────
    enter(ctx, stage, Stage::Assembling);
    let audio = assemble::assemble(ctx.codec.as_ref(), &chunks)?;

    // ── Persisting ──────────────────────────────────────────────────────
    let entry_id = match &ctx.history {
        Some(history) => {
            enter(ctx, stage, Stage::Persisting);
            let method = ProcessingMethod::from_run(extracted.source, ctx.config.extraction);
            let saved = history
                .save(NewHistoryEntry {
                    original_filename: filename,
                    formatted_summary: formatted_summary.clone(),
                    extracted_text: extracted.text.clone(),
                    settings: SettingsSnapshot::new(profile, method),
                    audio: audio.bytes.clone(),
                    duration_secs: audio.duration_secs,
                })
                .await?;
            Some(saved.id)
        }
        None => None,
    };

    let stats = NarrationStats {
        page_count: extracted.page_count,
        failed_pages: extracted.failed_pages.len(),
        chunk_count: audio.chunk_count,
        script_words: summary.text.split_whitespace().count(),
        audio_duration_secs: audio.duration_secs,
        total_input_tokens: (extracted.input_tokens + summary.input_tokens) as u64,
        total_output_tokens: (extracted.output_tokens + summary.output_tokens) as u64,
        extraction_duration_ms,
        summary_duration_ms,
        synthesis_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Narration complete: {} chunks, {:.1}s of audio, {}ms total",
        stats.chunk_count, stats.audio_duration_secs, stats.total_duration_ms
    );

    Ok(NarrationOutput {
        audio,
        formatted_summary,
        summary,
        extracted,
        entry_id,
        stats,
    })
}

/// Narrate the text of a saved history entry with a new profile.
///
/// # Errors
/// [`NarrationError::Validation`] when no history store is configured or
/// the entry has no text; otherwise as [`run`].
pub async fn rerun_from_history(
    ctx: &PipelineContext,
    id: &str,
    profile: &RequestProfile,
) -> Result<NarrationOutput, NarrationError> {
    let history = ctx
        .history
        .as_ref()
        .ok_or_else(|| NarrationError::Validation("no history store configured".into()))?;
    let entry = history
        .get(id)
        .await?
        .ok_or_else(|| NarrationError::Validation(format!("history entry '{id}' not found")))?;
    let text = entry
        .extracted_text
        .ok_or_else(|| NarrationError::Validation(format!("history entry '{id}' has no text")))?;

    run(
        ctx,
        RunInput::Rerun {
            text,
            original_filename: entry.original_filename,
        },
        profile,
    )
    .await
}

/// Narrate a local file or URL and write the WAV to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn narrate_file(
    ctx: &PipelineContext,
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    profile: &RequestProfile,
) -> Result<NarrationOutput, NarrationError> {
    let document = input::load_document(
        input_str.as_ref(),
        ctx.config.max_document_bytes,
        ctx.config.download_timeout_secs,
    )
    .await?;
    let output = run(ctx, RunInput::Document(document), profile).await?;
    write_atomic(output_path.as_ref(), &output.audio.bytes).await?;
    Ok(output)
}

/// Write `bytes` to `path` through a sibling temp file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), NarrationError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| NarrationError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| NarrationError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| NarrationError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
