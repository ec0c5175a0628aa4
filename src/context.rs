//! The collaborators a run needs, gathered in one value.
//!
//! A [`PipelineContext`] is built once and passed by reference to every
//! operation. Nothing in the crate reaches for process-wide state, so two
//! contexts (or two concurrent runs on one context) never interfere.

use crate::config::NarrationConfig;
use crate::error::NarrationError;
use crate::history::HistoryStore;
use crate::pipeline::assemble::{AudioCodec, WavCodec};
use crate::pipeline::format::{CardFormatter, SummaryFormatter};
use crate::pipeline::render::{DocumentParser, PageRenderer, PdfiumEngine};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::service::CompletionService;
use std::fmt;
use std::sync::Arc;

/// Everything a narration run depends on.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: NarrationConfig,
    pub completion: Arc<dyn CompletionService>,
    pub renderer: Arc<dyn PageRenderer>,
    pub parser: Arc<dyn DocumentParser>,
    pub codec: Arc<dyn AudioCodec>,
    pub formatter: Arc<dyn SummaryFormatter>,
    /// Completed runs are saved here when set.
    pub history: Option<Arc<dyn HistoryStore>>,
    pub progress: ProgressCallback,
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .field("history", &self.history.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineContext {
    /// Start a builder around the one collaborator with no default.
    pub fn builder(completion: Arc<dyn CompletionService>) -> PipelineContextBuilder {
        PipelineContextBuilder {
            config: None,
            completion,
            renderer: None,
            parser: None,
            codec: None,
            formatter: None,
            history: None,
            progress: None,
        }
    }
}

/// Builder for [`PipelineContext`].
///
/// Defaults: pdfium for parsing and rendering, `hound` WAV codec, model-made
/// summary cards over the same completion service, no history, no progress.
pub struct PipelineContextBuilder {
    config: Option<NarrationConfig>,
    completion: Arc<dyn CompletionService>,
    renderer: Option<Arc<dyn PageRenderer>>,
    parser: Option<Arc<dyn DocumentParser>>,
    codec: Option<Arc<dyn AudioCodec>>,
    formatter: Option<Arc<dyn SummaryFormatter>>,
    history: Option<Arc<dyn HistoryStore>>,
    progress: Option<ProgressCallback>,
}

impl PipelineContextBuilder {
    pub fn config(mut self, config: NarrationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn AudioCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn formatter(mut self, formatter: Arc<dyn SummaryFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn build(self) -> Result<PipelineContext, NarrationError> {
        let config = match self.config {
            Some(c) => c,
            None => NarrationConfig::builder().build()?,
        };
        if config.concurrency == 0 {
            return Err(NarrationError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }

        let pdfium = Arc::new(PdfiumEngine::new());
        let formatter = self.formatter.unwrap_or_else(|| {
            Arc::new(
                CardFormatter::new(Arc::clone(&self.completion))
                    .with_temperature(config.text_temperature),
            )
        });

        Ok(PipelineContext {
            renderer: self.renderer.unwrap_or_else(|| pdfium.clone()),
            parser: self.parser.unwrap_or(pdfium),
            codec: self.codec.unwrap_or_else(|| Arc::new(WavCodec)),
            formatter,
            history: self.history,
            progress: self
                .progress
                .unwrap_or_else(|| Arc::new(NoopProgressCallback)),
            completion: self.completion,
            config,
        })
    }
}
