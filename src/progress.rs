//! Progress-callback trait for narration events.
//!
//! Inject an [`Arc<dyn NarrationProgressCallback>`] via
//! [`crate::context::PipelineContextBuilder::progress`] to receive events as
//! a run moves through its stages, its pages and its chunks. Events are
//! informational only and never change what the pipeline does.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2audio::{NarrationProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ChunkCounter {
//!     done: AtomicUsize,
//! }
//!
//! impl NarrationProgressCallback for ChunkCounter {
//!     fn on_chunk_complete(&self, chunk: usize, total: usize, _bytes: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("chunk {}/{} narrated", chunk, total);
//!     }
//! }
//!
//! let counter: Arc<dyn NarrationProgressCallback> = Arc::new(ChunkCounter {
//!     done: AtomicUsize::new(0),
//! });
//! counter.on_stage(Stage::Synthesizing);
//! ```

use crate::narrate::Stage;
use std::sync::Arc;

/// Called by the pipeline as a run progresses.
///
/// Page events come from concurrent vision calls, so implementations must
/// protect shared mutable state (`Mutex`, atomics). All methods default to
/// no-ops.
pub trait NarrationProgressCallback: Send + Sync {
    /// A run entered `stage`.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// The vision path is about to transcribe `total_pages` pages.
    fn on_pages_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Just before the vision call for a page is sent.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// A page was transcribed; `text_len` is the byte length of its text.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// A page failed and will be left out.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Just before chunk `chunk` (1-indexed) of `total` is sent for narration.
    fn on_chunk_start(&self, chunk: usize, total: usize) {
        let _ = (chunk, total);
    }

    /// Chunk narrated; `audio_bytes` is the decoded payload size.
    fn on_chunk_complete(&self, chunk: usize, total: usize, audio_bytes: usize) {
        let _ = (chunk, total, audio_bytes);
    }

    /// The run finished with audio of `duration_secs`.
    fn on_run_complete(&self, duration_secs: f64) {
        let _ = duration_secs;
    }

    /// The run was aborted in `stage`.
    fn on_run_failed(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl NarrationProgressCallback for NoopProgressCallback {}

/// Shared handle stored in [`crate::context::PipelineContext`].
pub type ProgressCallback = Arc<dyn NarrationProgressCallback>;
