//! Result types produced by the narration pipeline.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Outcome of transcribing one page on the vision path.
///
/// Exactly one is produced per page; results arrive in completion order and
/// are put back in page order by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageResult {
    Extracted {
        /// 1-indexed page number.
        page_num: usize,
        text: String,
        input_tokens: usize,
        output_tokens: usize,
    },
    Failed {
        page_num: usize,
        error: PageError,
    },
}

impl PageResult {
    pub fn page_num(&self) -> usize {
        match self {
            PageResult::Extracted { page_num, .. } | PageResult::Failed { page_num, .. } => {
                *page_num
            }
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, PageResult::Extracted { .. })
    }
}

/// How the text handed to the summarizer was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Plain-text upload, decoded as UTF-8.
    TextFile,
    /// Tier 1: the PDF's own text layer.
    Structured,
    /// Tier 2: rendered pages transcribed by the vision model.
    Vision,
    /// Text reused from an earlier run.
    Rerun,
}

/// Text recovered from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Never empty. Pages from the vision path are separated by the
    /// `=== Page Break ===` marker.
    pub text: String,
    pub source: TextSource,
    /// Pages seen in the document (0 for text files and reruns).
    pub page_count: usize,
    /// Vision pages that failed and were left out.
    pub failed_pages: Vec<PageError>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl ExtractedText {
    pub(crate) fn plain(text: String, source: TextSource) -> Self {
        Self {
            text,
            source,
            page_count: 0,
            failed_pages: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// Narration script returned by the summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryScript {
    /// Segments separated by the chunk-break marker, in narration order.
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Decoded audio for one script segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// 0-based position in the narration.
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// The final narration: all chunk samples, concatenated in order, in one WAV.
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_count: usize,
}

/// Everything a completed run hands back to the caller.
#[derive(Debug, Clone)]
pub struct NarrationOutput {
    pub audio: AssembledAudio,
    /// HTML summary card.
    pub formatted_summary: String,
    pub summary: SummaryScript,
    pub extracted: ExtractedText,
    /// History entry id when a history store is configured.
    pub entry_id: Option<String>,
    pub stats: NarrationStats,
}

/// Statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrationStats {
    pub page_count: usize,
    pub failed_pages: usize,
    pub chunk_count: usize,
    pub script_words: usize,
    pub audio_duration_secs: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extraction_duration_ms: u64,
    pub summary_duration_ms: u64,
    pub synthesis_duration_ms: u64,
    pub total_duration_ms: u64,
}
