//! Configuration types for document-to-audio narration.
//!
//! Every pipeline knob lives in [`NarrationConfig`], built via
//! [`NarrationConfigBuilder`]. The per-request choices (length, tone, goal,
//! language, voice) are not here; they travel in
//! [`crate::profile::RequestProfile`] so one config can serve many runs.

use crate::error::NarrationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration shared by every run of a [`crate::context::PipelineContext`].
///
/// # Example
/// ```rust
/// use edgequake_doc2audio::{ExtractionStrategy, NarrationConfig};
///
/// let config = NarrationConfig::builder()
///     .concurrency(4)
///     .extraction(ExtractionStrategy::Vision)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct NarrationConfig {
    /// Maximum vision calls in flight while transcribing a scanned PDF. Default: 10.
    ///
    /// The ceiling protects the provider from bursts; it has no effect on the
    /// final page order, which is always restored from page numbers.
    pub concurrency: usize,

    /// How PDFs are turned into text. Default: [`ExtractionStrategy::Hybrid`].
    pub extraction: ExtractionStrategy,

    /// Tier-1 text must be longer than this many characters to skip the
    /// vision path. Default: 500.
    ///
    /// A heuristic for "this PDF is scanned". A short born-digital PDF will
    /// also take the vision path; that costs tokens but not correctness.
    pub vision_threshold_chars: usize,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Largest accepted document in bytes. Default: 64 MiB.
    pub max_document_bytes: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Sampling temperature for summarization and card formatting.
    /// `None` keeps the provider default.
    pub text_temperature: Option<f32>,

    /// Output token cap for summarization. `None` keeps the provider default.
    pub text_max_tokens: Option<usize>,

    /// Container requested from the audio model. Default: WAV.
    pub audio_format: AudioFormat,

    /// Sampling temperature for narration. Default: 1.2.
    ///
    /// Higher than usual on purpose: a lively read sounds less robotic, and
    /// the words themselves are pinned by the "read verbatim" instruction.
    pub audio_temperature: f32,

    /// Nucleus sampling for narration. Default: 1.0.
    pub audio_top_p: f32,

    /// Frequency penalty for narration. Default: 0.0.
    pub audio_frequency_penalty: f32,

    /// Presence penalty for narration. Default: 0.0.
    pub audio_presence_penalty: f32,

    /// Split script chunks longer than this many words before synthesis.
    /// Default: `None` (chunks are narrated exactly as the model wrote them).
    pub rechunk_words: Option<usize>,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            extraction: ExtractionStrategy::default(),
            vision_threshold_chars: 500,
            max_rendered_pixels: 2000,
            password: None,
            max_document_bytes: 64 * 1024 * 1024,
            download_timeout_secs: 120,
            text_temperature: None,
            text_max_tokens: None,
            audio_format: AudioFormat::default(),
            audio_temperature: 1.2,
            audio_top_p: 1.0,
            audio_frequency_penalty: 0.0,
            audio_presence_penalty: 0.0,
            rechunk_words: None,
        }
    }
}

impl fmt::Debug for NarrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationConfig")
            .field("concurrency", &self.concurrency)
            .field("extraction", &self.extraction)
            .field("vision_threshold_chars", &self.vision_threshold_chars)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_document_bytes", &self.max_document_bytes)
            .field("audio_format", &self.audio_format)
            .field("audio_temperature", &self.audio_temperature)
            .field("rechunk_words", &self.rechunk_words)
            .finish()
    }
}

impl NarrationConfig {
    /// Create a new builder for `NarrationConfig`.
    pub fn builder() -> NarrationConfigBuilder {
        NarrationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`NarrationConfig`].
#[derive(Debug)]
pub struct NarrationConfigBuilder {
    config: NarrationConfig,
}

impl NarrationConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn extraction(mut self, strategy: ExtractionStrategy) -> Self {
        self.config.extraction = strategy;
        self
    }

    pub fn vision_threshold_chars(mut self, chars: usize) -> Self {
        self.config.vision_threshold_chars = chars;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_document_bytes(mut self, bytes: usize) -> Self {
        self.config.max_document_bytes = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn text_temperature(mut self, t: f32) -> Self {
        self.config.text_temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn text_max_tokens(mut self, n: usize) -> Self {
        self.config.text_max_tokens = Some(n);
        self
    }

    pub fn audio_format(mut self, format: AudioFormat) -> Self {
        self.config.audio_format = format;
        self
    }

    pub fn audio_temperature(mut self, t: f32) -> Self {
        self.config.audio_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn audio_top_p(mut self, p: f32) -> Self {
        self.config.audio_top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn rechunk_words(mut self, words: usize) -> Self {
        self.config.rechunk_words = Some(words);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NarrationConfig, NarrationError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(NarrationError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_document_bytes == 0 {
            return Err(NarrationError::InvalidConfig(
                "Maximum document size must be > 0".into(),
            ));
        }
        if c.rechunk_words == Some(0) {
            return Err(NarrationError::InvalidConfig(
                "Re-chunk word limit must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How text is recovered from a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Structured text first; rasterise + vision only when it comes up short. (default)
    #[default]
    Hybrid,
    /// Always rasterise and transcribe with the vision model.
    Vision,
}

impl ExtractionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStrategy::Hybrid => "hybrid",
            ExtractionStrategy::Vision => "vision",
        }
    }
}

/// Audio container requested from the audio model and produced by the assembler.
///
/// Only WAV is supported: chunks are concatenated sample-by-sample, which
/// needs an uncompressed container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    #[default]
    Wav,
}

impl AudioFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = NarrationConfig::default();
        assert_eq!(c.concurrency, 10);
        assert_eq!(c.vision_threshold_chars, 500);
        assert_eq!(c.extraction, ExtractionStrategy::Hybrid);
        assert_eq!(c.max_document_bytes, 64 * 1024 * 1024);
        assert!((c.audio_temperature - 1.2).abs() < f32::EPSILON);
        assert_eq!(c.rechunk_words, None);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = NarrationConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, NarrationError::InvalidConfig(_)));
    }

    #[test]
    fn zero_rechunk_is_rejected() {
        assert!(NarrationConfig::builder().rechunk_words(0).build().is_err());
        assert!(NarrationConfig::builder().rechunk_words(80).build().is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = NarrationConfig::builder()
            .password("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
