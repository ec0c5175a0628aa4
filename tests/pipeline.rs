//! Whole-pipeline tests against fake collaborators.
//!
//! No network, no pdfium: the completion service, the PDF parser and the
//! page renderer are all in-process fakes. Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_doc2audio::pipeline::format::plain_card;
use edgequake_doc2audio::{
    narrate_file, rerun_from_history, run, AudioCodec, AudioCompletion, AudioRequest,
    CompletionError, CompletionService, Document, DocumentParser, ExtractionStrategy,
    FsHistoryStore, Goal, HistoryStore, NarrationConfig, NarrationError,
    NarrationProgressCallback, PageRenderer, PipelineContext, PlainFormatter, RequestProfile,
    RunInput, Samples, Stage, TextCompletion, TextRequest, TextSource, Tone, ToolCompletion,
    ToolRequest, WavCodec,
};
use image::DynamicImage;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────────────

const SAMPLE_RATE: u32 = 24_000;
const SAMPLES_PER_CHUNK: usize = 2_400;

/// Mono 16-bit WAV holding `n` samples.
fn wav_bytes(n: usize, value: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(std::io::Cursor::new(&mut buf), spec).unwrap();
        for _ in 0..n {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf
}

/// Page `n` is rendered 8·n pixels wide so the fake service can tell pages apart.
fn page_image(n: usize) -> DynamicImage {
    DynamicImage::new_rgb8(8 * n as u32, 8)
}

fn page_of(request: &TextRequest) -> usize {
    let image = request.image.as_ref().unwrap();
    let png = STANDARD.decode(&image.data).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    (decoded.width() / 8) as usize
}

#[derive(Default)]
struct FakeService {
    summary: String,
    /// Prose answer to summary-card calls.
    card: String,
    /// Function-call arguments for summary-card calls; wins over `card`.
    card_arguments: Option<String>,
    page_delays_ms: HashMap<usize, u64>,
    failing_pages: HashSet<usize>,
    /// 1-based chunk whose audio call fails.
    failing_chunk: Option<usize>,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    vision_calls: AtomicUsize,
    summary_calls: AtomicUsize,
    card_calls: AtomicUsize,
    audio_calls: AtomicUsize,
    summary_inputs: Mutex<Vec<String>>,
    audio_texts: Mutex<Vec<String>>,
}

impl FakeService {
    fn new(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            card: "no card".to_string(),
            ..Default::default()
        }
    }

    fn total_calls(&self) -> usize {
        self.vision_calls.load(Ordering::SeqCst)
            + self.summary_calls.load(Ordering::SeqCst)
            + self.card_calls.load(Ordering::SeqCst)
            + self.audio_calls.load(Ordering::SeqCst)
    }

    async fn transcribe(&self, request: &TextRequest) -> Result<TextCompletion, CompletionError> {
        let page = page_of(request);
        self.vision_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.page_delays_ms.get(&page).copied().unwrap_or(10);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_pages.contains(&page) {
            return Err(CompletionError::Malformed(format!("page {page} refused")));
        }
        Ok(TextCompletion {
            content: format!("Page {page} text"),
            input_tokens: 100,
            output_tokens: 10,
        })
    }
}

#[async_trait]
impl CompletionService for FakeService {
    async fn complete_text(&self, request: &TextRequest) -> Result<TextCompletion, CompletionError> {
        if request.image.is_some() {
            return self.transcribe(request).await;
        }
        if request.system.starts_with("You are a content formatter") {
            self.card_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(TextCompletion {
                content: self.card.clone(),
                ..Default::default()
            });
        }
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.summary_inputs
            .lock()
            .unwrap()
            .push(request.user.clone());
        Ok(TextCompletion {
            content: self.summary.clone(),
            input_tokens: 1_000,
            output_tokens: 200,
        })
    }

    async fn complete_tool(&self, request: &ToolRequest) -> Result<ToolCompletion, CompletionError> {
        match &self.card_arguments {
            Some(arguments) => {
                self.card_calls.fetch_add(1, Ordering::SeqCst);
                Ok(ToolCompletion {
                    arguments: Some(arguments.clone()),
                    ..Default::default()
                })
            }
            None => {
                let text = self.complete_text(&request.text).await?;
                Ok(ToolCompletion {
                    content: text.content,
                    ..Default::default()
                })
            }
        }
    }

    async fn complete_audio(
        &self,
        request: &AudioRequest,
    ) -> Result<AudioCompletion, CompletionError> {
        let chunk = self.audio_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.audio_texts.lock().unwrap().push(request.text.clone());
        if self.failing_chunk == Some(chunk) {
            return Err(CompletionError::Api {
                status: Some(400),
                message: "voice unavailable".into(),
            });
        }
        Ok(AudioCompletion {
            data_base64: STANDARD.encode(wav_bytes(SAMPLES_PER_CHUNK, chunk as i16)),
            transcript: None,
        })
    }
}

struct FakeRenderer {
    pages: usize,
}

impl PageRenderer for FakeRenderer {
    fn render_pages(
        &self,
        _pdf: &[u8],
        _password: Option<&str>,
        _max_pixels: u32,
    ) -> Result<Vec<DynamicImage>, NarrationError> {
        Ok((1..=self.pages).map(page_image).collect())
    }
}

/// `None` simulates an unreadable text layer.
struct FakeParser {
    pages: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeParser {
    fn new(pages: Option<Vec<String>>) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DocumentParser for FakeParser {
    fn page_texts(&self, _pdf: &[u8], _password: Option<&str>) -> Result<Vec<String>, NarrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.clone().ok_or_else(|| NarrationError::Extraction {
            detail: "no text layer".into(),
        })
    }
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<Stage>>,
    pages_done: Mutex<Vec<usize>>,
    page_errors: Mutex<Vec<usize>>,
    chunks_done: Mutex<Vec<usize>>,
    failed_in: Mutex<Option<Stage>>,
}

impl NarrationProgressCallback for Recorder {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, _len: usize) {
        self.pages_done.lock().unwrap().push(page_num);
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.page_errors.lock().unwrap().push(page_num);
    }
    fn on_chunk_complete(&self, chunk: usize, _total: usize, _bytes: usize) {
        self.chunks_done.lock().unwrap().push(chunk);
    }
    fn on_run_failed(&self, stage: Stage, _error: &str) {
        *self.failed_in.lock().unwrap() = Some(stage);
    }
}

struct Harness {
    service: Arc<FakeService>,
    parser: Arc<FakeParser>,
    recorder: Arc<Recorder>,
    ctx: PipelineContext,
}

fn harness(
    service: FakeService,
    pages: usize,
    text_layer: Option<Vec<String>>,
    config: NarrationConfig,
) -> Harness {
    let service = Arc::new(service);
    let parser = Arc::new(FakeParser::new(text_layer));
    let recorder = Arc::new(Recorder::default());
    let ctx = PipelineContext::builder(service.clone() as Arc<dyn CompletionService>)
        .config(config)
        .renderer(Arc::new(FakeRenderer { pages }))
        .parser(parser.clone() as Arc<dyn DocumentParser>)
        .formatter(Arc::new(PlainFormatter))
        .progress(recorder.clone() as Arc<dyn NarrationProgressCallback>)
        .build()
        .unwrap();
    Harness {
        service,
        parser,
        recorder,
        ctx,
    }
}

fn scanned_pdf() -> RunInput {
    RunInput::Document(Document::pdf(b"%PDF-1.7 scanned".to_vec(), "scan.pdf"))
}

const TWO_SEGMENTS: &str = "Opening segment. === Page Break === Closing segment.";

// ── Scanned document, end to end ────────────────────────────────────────────

#[tokio::test]
async fn scanned_pdf_is_transcribed_summarized_and_narrated_in_order() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.page_delays_ms = HashMap::from([(1, 120), (2, 5), (3, 60)]);
    let h = harness(
        service,
        3,
        Some(vec![String::new(), " ".into(), String::new()]),
        NarrationConfig::default(),
    );

    let output = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    // Page 2 finishes first, page 1 last; the text is still in page order.
    assert_eq!(*h.recorder.pages_done.lock().unwrap(), vec![2, 3, 1]);
    let text = &output.extracted.text;
    let p1 = text.find("Page 1 text").unwrap();
    let p2 = text.find("Page 2 text").unwrap();
    let p3 = text.find("Page 3 text").unwrap();
    assert!(p1 < p2 && p2 < p3);
    assert!(text.contains("=== Page Break ==="));
    assert_eq!(output.extracted.source, TextSource::Vision);
    assert_eq!(output.extracted.page_count, 3);

    // The summarizer saw the transcript.
    let inputs = h.service.summary_inputs.lock().unwrap().clone();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].contains("Page 2 text"));

    // One audio call per segment, in script order.
    assert_eq!(
        *h.service.audio_texts.lock().unwrap(),
        vec!["Opening segment.".to_string(), "Closing segment.".to_string()]
    );
    assert_eq!(*h.recorder.chunks_done.lock().unwrap(), vec![1, 2]);

    // Assembled audio is both chunks back to back.
    assert_eq!(output.audio.chunk_count, 2);
    assert!((output.audio.duration_secs - 0.2).abs() < 1e-6);
    let clip = WavCodec.decode(&output.audio.bytes).unwrap();
    match clip.samples {
        Samples::Int(samples) => {
            assert_eq!(samples.len(), 2 * SAMPLES_PER_CHUNK);
            assert_eq!(samples[0], 1);
            assert_eq!(samples[SAMPLES_PER_CHUNK], 2);
        }
        Samples::Float(_) => panic!("expected integer samples"),
    }

    assert_eq!(output.stats.page_count, 3);
    assert_eq!(output.stats.failed_pages, 0);
    assert_eq!(output.stats.chunk_count, 2);
    assert_eq!(output.stats.total_input_tokens, 3 * 100 + 1_000);
    assert_eq!(output.entry_id, None);
    assert_eq!(output.formatted_summary, plain_card(&output.summary.text));

    assert_eq!(
        *h.recorder.stages.lock().unwrap(),
        vec![
            Stage::Received,
            Stage::Extracting,
            Stage::Summarizing,
            Stage::Formatting,
            Stage::Synthesizing,
            Stage::Assembling,
            Stage::Completed,
        ]
    );
}

#[tokio::test]
async fn vision_calls_never_exceed_the_concurrency_limit() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.page_delays_ms = (1..=15).map(|p| (p, 30)).collect();
    let config = NarrationConfig::builder()
        .extraction(ExtractionStrategy::Vision)
        .build()
        .unwrap();
    let h = harness(service, 15, None, config);

    let output = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    let max = h.service.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 10, "{max} calls in flight");
    assert!(max > 1, "pages were not transcribed concurrently");
    assert_eq!(h.service.vision_calls.load(Ordering::SeqCst), 15);
    assert_eq!(output.extracted.page_count, 15);
}

#[tokio::test]
async fn lower_concurrency_is_honoured() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.page_delays_ms = (1..=8).map(|p| (p, 20)).collect();
    let config = NarrationConfig::builder()
        .extraction(ExtractionStrategy::Vision)
        .concurrency(3)
        .build()
        .unwrap();
    let h = harness(service, 8, None, config);

    run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    assert!(h.service.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn failed_pages_are_left_out_and_reported() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.failing_pages = HashSet::from([2]);
    let config = NarrationConfig::builder()
        .extraction(ExtractionStrategy::Vision)
        .build()
        .unwrap();
    let h = harness(service, 3, None, config);

    let output = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    assert!(output.extracted.text.contains("Page 1 text"));
    assert!(!output.extracted.text.contains("Page 2 text"));
    assert!(output.extracted.text.contains("Page 3 text"));
    assert_eq!(output.extracted.failed_pages.len(), 1);
    assert_eq!(output.extracted.failed_pages[0].page(), 2);
    assert_eq!(output.stats.failed_pages, 1);
    assert_eq!(*h.recorder.page_errors.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn all_pages_failing_aborts_during_extraction() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.failing_pages = HashSet::from([1, 2]);
    let config = NarrationConfig::builder()
        .extraction(ExtractionStrategy::Vision)
        .build()
        .unwrap();
    let h = harness(service, 2, None, config);

    let err = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NarrationError::VisionUnavailable { .. }), "{err}");
    assert_eq!(err.http_status(), 502);
    assert_eq!(h.service.summary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(*h.recorder.failed_in.lock().unwrap(), Some(Stage::Extracting));
}

// ── Tier selection ───────────────────────────────────────────────────────────

#[tokio::test]
async fn long_text_layer_skips_the_vision_path() {
    let layer = vec!["word ".repeat(60), String::new(), "more ".repeat(60)];
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        3,
        Some(layer),
        NarrationConfig::default(),
    );

    let output = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    assert_eq!(output.extracted.source, TextSource::Structured);
    assert_eq!(output.extracted.page_count, 3);
    assert_eq!(h.service.vision_calls.load(Ordering::SeqCst), 0);
    assert!(output.extracted.text.starts_with("word word"));
}

#[tokio::test]
async fn text_layer_at_the_threshold_falls_back_to_vision() {
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        2,
        Some(vec!["x".repeat(500)]),
        NarrationConfig::default(),
    );

    let output = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    assert_eq!(output.extracted.source, TextSource::Vision);
    assert_eq!(h.service.vision_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreadable_text_layer_falls_back_to_vision() {
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        2,
        None,
        NarrationConfig::default(),
    );

    let output = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 1);
    assert_eq!(output.extracted.source, TextSource::Vision);
    assert_eq!(h.service.vision_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn vision_strategy_never_reads_the_text_layer() {
    let config = NarrationConfig::builder()
        .extraction(ExtractionStrategy::Vision)
        .build()
        .unwrap();
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        2,
        Some(vec!["y".repeat(2_000)]),
        config,
    );

    run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap();

    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.service.vision_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn text_documents_go_straight_to_the_summarizer() {
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        0,
        None,
        NarrationConfig::default(),
    );
    let doc = Document::text("Rivers carry sediment to the sea.", "rivers.txt");

    let output = run(&h.ctx, RunInput::Document(doc), &RequestProfile::default())
        .await
        .unwrap();

    assert_eq!(output.extracted.source, TextSource::TextFile);
    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.service.vision_calls.load(Ordering::SeqCst), 0);
    assert!(h.service.summary_inputs.lock().unwrap()[0].contains("Rivers carry sediment"));
}

// ── Validation ───────────────────────────────────────────────────────────────

#[test]
fn custom_goal_without_instruction_fails_before_any_call() {
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        3,
        None,
        NarrationConfig::default(),
    );
    let profile = RequestProfile {
        goal: Goal::Custom {
            instruction: "   ".into(),
        },
        ..Default::default()
    };

    let err = tokio_test::block_on(run(&h.ctx, scanned_pdf(), &profile)).unwrap_err();

    assert!(matches!(err, NarrationError::Validation(_)), "{err}");
    assert_eq!(h.service.total_calls(), 0);
    assert_eq!(h.parser.calls.load(Ordering::SeqCst), 0);
    assert_eq!(*h.recorder.failed_in.lock().unwrap(), Some(Stage::Received));
}

#[tokio::test]
async fn oversized_documents_are_rejected_before_extraction() {
    let config = NarrationConfig::builder()
        .max_document_bytes(8)
        .build()
        .unwrap();
    let h = harness(FakeService::new(TWO_SEGMENTS), 1, None, config);

    let err = run(&h.ctx, scanned_pdf(), &RequestProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NarrationError::DocumentTooLarge { .. }), "{err}");
    assert_eq!(h.service.total_calls(), 0);
}

// ── Synthesis failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn a_failed_chunk_aborts_the_run_without_audio_or_history() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.failing_chunk = Some(2);
    let service = Arc::new(service);
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsHistoryStore::open(dir.path()).await.unwrap());
    let recorder = Arc::new(Recorder::default());
    let ctx = PipelineContext::builder(service.clone() as Arc<dyn CompletionService>)
        .formatter(Arc::new(PlainFormatter))
        .history(store.clone() as Arc<dyn HistoryStore>)
        .progress(recorder.clone() as Arc<dyn NarrationProgressCallback>)
        .build()
        .unwrap();
    let doc = Document::text("Some text worth narrating.", "notes.txt");

    let err = run(&ctx, RunInput::Document(doc), &RequestProfile::default())
        .await
        .unwrap_err();

    match err {
        NarrationError::Synthesis { chunk, total, .. } => {
            assert_eq!(chunk, 2);
            assert_eq!(total, 2);
        }
        other => panic!("expected a synthesis error, got {other}"),
    }
    assert_eq!(*recorder.chunks_done.lock().unwrap(), vec![1]);
    assert_eq!(*recorder.failed_in.lock().unwrap(), Some(Stage::Synthesizing));
    assert!(store.list(10, 0, false).await.unwrap().is_empty());
}

// ── Summary card ─────────────────────────────────────────────────────────────

fn card_context(service: Arc<FakeService>) -> PipelineContext {
    PipelineContext::builder(service as Arc<dyn CompletionService>)
        .build()
        .unwrap()
}

#[tokio::test]
async fn unusable_card_answer_degrades_to_the_plain_card() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.card = "Sorry, I cannot format this.".into();
    let service = Arc::new(service);
    let ctx = card_context(service.clone());
    let doc = Document::text("Some text worth narrating.", "notes.txt");

    let output = run(&ctx, RunInput::Document(doc), &RequestProfile::default())
        .await
        .unwrap();

    assert_eq!(service.card_calls.load(Ordering::SeqCst), 1);
    assert_eq!(output.formatted_summary, plain_card(&output.summary.text));
    assert!(output.formatted_summary.contains("Opening segment."));
    assert_eq!(output.audio.chunk_count, 2);
}

#[tokio::test]
async fn card_answer_is_rendered_for_the_goal() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.card = r#"```json
{"title": "Quarterly <Report>", "main_points": ["Revenue grew"],
 "key_highlights": [{"highlight": "Margins", "details": "up 2 points"}]}
```"#
        .into();
    let service = Arc::new(service);
    let ctx = card_context(service.clone());
    let doc = Document::text("Some text worth narrating.", "notes.txt");

    let output = run(&ctx, RunInput::Document(doc), &RequestProfile::default())
        .await
        .unwrap();

    assert!(output.formatted_summary.contains("Quarterly &lt;Report&gt;"));
    assert!(output.formatted_summary.contains("Revenue grew"));
    assert!(output.formatted_summary.contains("Margins"));
}

#[tokio::test]
async fn card_function_call_is_rendered() {
    let mut service = FakeService::new(TWO_SEGMENTS);
    service.card_arguments = Some(
        r#"{"title": "Themes", "key_themes": [{"theme": "Water", "analysis": "Scarce"}], "conclusion": "Act now."}"#
            .into(),
    );
    let service = Arc::new(service);
    let ctx = card_context(service.clone());
    let doc = Document::text("Some text worth narrating.", "notes.txt");
    let profile = RequestProfile {
        goal: Goal::TopicAnalysis,
        ..Default::default()
    };

    let output = run(&ctx, RunInput::Document(doc), &profile).await.unwrap();

    assert_eq!(service.card_calls.load(Ordering::SeqCst), 1);
    assert!(output.formatted_summary.contains("Key Themes"));
    assert!(output.formatted_summary.contains("Water"));
    assert!(output.formatted_summary.contains("Act now."));
}

// ── History and reruns ───────────────────────────────────────────────────────

#[tokio::test]
async fn completed_runs_are_saved_and_can_be_rerun() {
    let service = Arc::new(FakeService::new(TWO_SEGMENTS));
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsHistoryStore::open(dir.path()).await.unwrap());
    let ctx = PipelineContext::builder(service.clone() as Arc<dyn CompletionService>)
        .formatter(Arc::new(PlainFormatter))
        .history(store.clone() as Arc<dyn HistoryStore>)
        .build()
        .unwrap();
    let doc = Document::text("Glaciers shape valleys over millennia.", "glaciers.txt");

    let first = run(&ctx, RunInput::Document(doc), &RequestProfile::default())
        .await
        .unwrap();
    let id = first.entry_id.clone().unwrap();

    let entry = store.get(&id).await.unwrap().unwrap();
    assert_eq!(entry.original_filename, "glaciers.txt");
    assert_eq!(
        entry.extracted_text.as_deref(),
        Some("Glaciers shape valleys over millennia.")
    );
    assert_eq!(entry.audio_bytes, first.audio.bytes.len());
    assert_eq!(
        store.get_audio(&id).await.unwrap().unwrap(),
        first.audio.bytes
    );

    let formal = RequestProfile {
        tone: Tone::Formal,
        target_minutes: 4,
        ..Default::default()
    };
    let second = rerun_from_history(&ctx, &id, &formal).await.unwrap();

    assert_eq!(second.extracted.source, TextSource::Rerun);
    let inputs = service.summary_inputs.lock().unwrap().clone();
    assert_eq!(inputs.len(), 2);
    assert!(inputs[1].contains("Glaciers shape valleys"));

    let entries = store.list(10, 0, false).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.extracted_text.is_none()));
    let rerun_entry = store
        .get(second.entry_id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rerun_entry.settings.tone, Tone::Formal);
    assert_eq!(rerun_entry.settings.summary_length, 4);
    assert_eq!(rerun_entry.original_filename, "glaciers.txt");
}

#[tokio::test]
async fn rerun_of_unknown_entry_is_a_validation_error() {
    let service = Arc::new(FakeService::new(TWO_SEGMENTS));
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsHistoryStore::open(dir.path()).await.unwrap());
    let ctx = PipelineContext::builder(service.clone() as Arc<dyn CompletionService>)
        .history(store as Arc<dyn HistoryStore>)
        .build()
        .unwrap();

    let err = rerun_from_history(&ctx, "20240101_000000", &RequestProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NarrationError::Validation(_)), "{err}");
    assert_eq!(service.total_calls(), 0);
}

#[tokio::test]
async fn empty_rerun_text_is_rejected() {
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        0,
        None,
        NarrationConfig::default(),
    );
    let input = RunInput::Rerun {
        text: "  \n ".into(),
        original_filename: "old.pdf".into(),
    };

    let err = run(&h.ctx, input, &RequestProfile::default())
        .await
        .unwrap_err();

    assert!(matches!(err, NarrationError::Validation(_)), "{err}");
    assert_eq!(h.service.total_calls(), 0);
}

// ── File in, file out ────────────────────────────────────────────────────────

#[tokio::test]
async fn narrate_file_writes_the_assembled_wav() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("memo.txt");
    std::fs::write(&input, "The launch moves to March.").unwrap();
    let output_path = dir.path().join("audio/memo.wav");
    let h = harness(
        FakeService::new(TWO_SEGMENTS),
        0,
        None,
        NarrationConfig::default(),
    );

    let output = narrate_file(
        &h.ctx,
        input.to_str().unwrap(),
        &output_path,
        &RequestProfile::default(),
    )
    .await
    .unwrap();

    let written = std::fs::read(&output_path).unwrap();
    assert_eq!(written, output.audio.bytes);
    let clip = WavCodec.decode(&written).unwrap();
    assert_eq!(clip.spec.sample_rate, SAMPLE_RATE);
    assert_eq!(clip.samples.len(), 2 * SAMPLES_PER_CHUNK);
}
