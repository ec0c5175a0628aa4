//! Error types for the edgequake-doc2audio library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`NarrationError`] — **Fatal**: the run cannot produce audio (bad
//!   input, invalid profile, summarization or synthesis failed). Returned as
//!   `Err(NarrationError)` from [`crate::narrate::run`] and friends.
//!
//! * [`PageError`] — **Non-fatal**: one page of a scanned PDF could not be
//!   transcribed. Carried inside [`crate::output::PageResult::Failed`] and
//!   absorbed by the page scheduler unless *every* page fails.
//!
//! * [`CompletionError`] — a single remote call failed. The transport layer
//!   may retry it; the pipeline stages only see "call failed".

use crate::narrate::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2audio library.
#[derive(Debug, Error)]
pub enum NarrationError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// File extension / content is neither plain text nor PDF.
    #[error("Unsupported document '{name}': only .txt and .pdf files are accepted")]
    UnsupportedDocument { name: String },

    /// Document exceeds the configured size limit.
    #[error("Document '{name}' is {size} bytes, above the {limit}-byte limit")]
    DocumentTooLarge { name: String, size: usize, limit: usize },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// The request profile is malformed (e.g. custom goal without instruction).
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No usable text could be recovered from the document.
    #[error("Text extraction failed: {detail}")]
    Extraction { detail: String },

    /// Every page of a scanned PDF failed at the vision provider (call
    /// errors or timeouts), so nothing is wrong with the document itself.
    #[error("Vision provider unavailable: {detail}")]
    VisionUnavailable { detail: String },

    /// The summarization call failed or returned nothing.
    #[error("Summarization failed: {detail}")]
    Summarization { detail: String },

    /// One narration chunk could not be synthesized; the run is aborted.
    #[error("Audio synthesis failed on chunk {chunk}/{total}: {detail}")]
    Synthesis {
        chunk: usize,
        total: usize,
        detail: String,
    },

    /// A synthesized chunk is not valid audio in the expected codec.
    #[error("Audio assembly failed: {detail}")]
    Assembly { detail: String },

    /// The history collaborator could not save or read an entry.
    #[error("History store error: {detail}")]
    Persistence { detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Scanned-PDF support needs libpdfium. You can:\n\
  • Install pdfium system-wide so the dynamic loader finds it.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NarrationError {
    /// The pipeline stage this error aborted, if it came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            NarrationError::Validation(_) => Some(Stage::Received),
            NarrationError::Extraction { .. }
            | NarrationError::VisionUnavailable { .. }
            | NarrationError::PdfiumBindingFailed(_) => Some(Stage::Extracting),
            NarrationError::Summarization { .. } => Some(Stage::Summarizing),
            NarrationError::Synthesis { .. } => Some(Stage::Synthesizing),
            NarrationError::Assembly { .. } => Some(Stage::Assembling),
            NarrationError::Persistence { .. } => Some(Stage::Persisting),
            _ => None,
        }
    }

    /// HTTP status a routing layer should answer with.
    ///
    /// Problems with what the caller sent map to 400. A vision provider
    /// outage maps to 502; anything else that went wrong on our side (or at
    /// the model provider) maps to 500.
    pub fn http_status(&self) -> u16 {
        match self {
            NarrationError::FileNotFound { .. }
            | NarrationError::InvalidInput { .. }
            | NarrationError::UnsupportedDocument { .. }
            | NarrationError::Validation(_)
            | NarrationError::Extraction { .. } => 400,
            NarrationError::PermissionDenied { .. } => 403,
            NarrationError::DocumentTooLarge { .. } => 413,
            NarrationError::VisionUnavailable { .. } => 502,
            _ => 500,
        }
    }
}

/// A non-fatal error for a single page on the vision path.
///
/// Stored in [`crate::output::PageResult::Failed`]. The extraction stage
/// continues unless ALL pages fail.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The rendered page could not be encoded as PNG.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The vision call failed.
    #[error("Page {page}: vision call failed: {detail}")]
    LlmFailed { page: usize, detail: String },

    /// The vision call returned no text.
    #[error("Page {page}: vision model returned no text")]
    EmptyResponse { page: usize },

    /// The vision call timed out.
    #[error("Page {page}: vision call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl PageError {
    /// 1-based page number this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::EncodeFailed { page, .. }
            | PageError::LlmFailed { page, .. }
            | PageError::EmptyResponse { page }
            | PageError::Timeout { page, .. } => *page,
        }
    }
}

/// Failure of one remote completion call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompletionError {
    /// The provider answered with an error status or refused the request.
    #[error("API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// The call did not complete within the transport timeout.
    #[error("call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response arrived but did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Network-level failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),
}

impl CompletionError {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate limits, server errors, timeouts and connection failures are
    /// transient; other 4xx answers and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Api {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            CompletionError::Api { status: None, .. } => true,
            CompletionError::Timeout { .. } | CompletionError::Transport(_) => true,
            CompletionError::Malformed(_) => false,
        }
    }
}
