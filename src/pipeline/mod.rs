//! Pipeline stages for document-to-audio narration.
//!
//! Each submodule implements one transformation step and is testable on its
//! own against fake collaborators.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──────────────────▶ summarize ──▶ format
//! (path/URL)  │ text file / text layer      (script)     (card)
//!             └─▶ render ──▶ scheduler ──▶ vision            │
//!                 (pdfium)   (≤ N in flight)  (per page)      ▼
//!                                         synthesize ──▶ assemble
//!                                         (per chunk)     (one WAV)
//! ```
//!
//! 1. [`input`]      — read a local file or download a URL into a [`input::Document`]
//! 2. [`extract`]    — text files, then the PDF text layer, then the vision path
//! 3. [`render`]     — pdfium parsing and rasterisation, run in `spawn_blocking`
//! 4. [`scheduler`]  — bounded concurrent page transcription, order restored by page number
//! 5. [`vision`]     — PNG + base64 + one vision call per page
//! 6. [`summarize`]  — one call producing the segmented narration script
//! 7. [`format`]     — summary card for the script
//! 8. [`synthesize`] — one audio call per script segment, sequentially
//! 9. [`assemble`]   — sample-exact WAV concatenation
//!
//! [`clean`] holds the deterministic text cleanup shared by several stages.

pub mod assemble;
pub mod clean;
pub mod extract;
pub mod format;
pub mod input;
pub mod render;
pub mod scheduler;
pub mod summarize;
pub mod synthesize;
pub mod vision;
