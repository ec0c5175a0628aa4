//! # edgequake-doc2audio
//!
//! Turn a document (plain text or PDF) into a spoken narration, shaped by a
//! target length, tone, goal and language, or into a two-voice podcast.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document
//!  │
//!  ├─ 1. Extract     UTF-8 text, the PDF text layer, or (scanned PDFs)
//!  │                 rasterised pages read by a vision model, ≤ 10 in flight
//!  ├─ 2. Summarize   one call → script segmented by "=== Page Break ==="
//!  ├─ 3. Format      summary card (HTML) for the script
//!  ├─ 4. Synthesize  one audio call per segment, strictly in order
//!  ├─ 5. Assemble    sample-exact WAV concatenation
//!  └─ 6. Persist     optional history entry (card, text, audio, settings)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doc2audio::{
//!     narrate_file, Goal, LlmCompletionService, PipelineContext, RequestProfile,
//!     ResilientService, Tone, TransportOptions,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Text provider and audio endpoint from OPENAI_API_KEY / AZURE_OPENAI_*.
//!     let service = LlmCompletionService::from_env(None, None, None)?;
//!     let service = ResilientService::new(Arc::new(service), TransportOptions::default());
//!     let ctx = PipelineContext::builder(Arc::new(service)).build()?;
//!
//!     let profile = RequestProfile {
//!         target_minutes: 3,
//!         tone: Tone::Enthusiastic,
//!         goal: Goal::KeyInsights,
//!         ..Default::default()
//!     };
//!     let output = narrate_file(&ctx, "report.pdf", "report.wav", &profile).await?;
//!     eprintln!("{:.0}s of audio in {} chunks",
//!         output.audio.duration_secs, output.audio.chunk_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2audio` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doc2audio = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod narrate;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod progress;
pub mod prompts;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AudioFormat, ExtractionStrategy, NarrationConfig, NarrationConfigBuilder};
pub use context::{PipelineContext, PipelineContextBuilder};
pub use error::{CompletionError, NarrationError, PageError};
pub use history::{
    FsHistoryStore, HistoryEntry, HistoryStore, NewHistoryEntry, ProcessingMethod,
    SettingsSnapshot,
};
pub use narrate::{narrate_file, rerun_from_history, run, RunInput, Stage};
pub use output::{
    AssembledAudio, AudioChunk, ExtractedText, NarrationOutput, NarrationStats, PageResult,
    SummaryScript, TextSource,
};
pub use pipeline::assemble::{AudioCodec, PcmClip, Samples, WavCodec};
pub use pipeline::format::{CardFormatter, PlainFormatter, SummaryFormatter};
pub use pipeline::input::{load_document, Document, DocumentKind};
pub use pipeline::render::{DocumentParser, PageRenderer, PdfiumEngine};
pub use profile::{Goal, Language, PersonaStyle, RequestProfile, Tone};
pub use progress::{NarrationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use service::{
    AudioCompletion, AudioEndpoint, AudioRequest, CompletionService, LlmCompletionService,
    ResilientService, TextCompletion, TextRequest, ToolCompletion, ToolRequest, TransportOptions,
};
