//! CLI binary for edgequake-doc2audio.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `RequestProfile` + `PipelineContext` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_doc2audio::{
    narrate_file, rerun_from_history, ExtractionStrategy, FsHistoryStore, Goal, HistoryStore,
    Language, LlmCompletionService, NarrationConfig, NarrationOutput, NarrationProgressCallback,
    PersonaStyle, PipelineContext, ProgressCallback, RequestProfile, ResilientService, Stage, Tone,
    TransportOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that follows the run's stages and
/// turns into a bar while pages are transcribed or chunks are narrated.
/// Page events may arrive out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Start of the chunk currently being narrated.
    chunk_start: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            chunk_start: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, prefix: &'static str, total: usize, unit: &str) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);

        self.bar.set_position(0);
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
        self.bar.reset_eta();
    }

    fn elapsed_secs(start: Option<Instant>) -> f64 {
        start.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0)
    }
}

impl NarrationProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        let (prefix, msg) = match stage {
            Stage::Received => ("Preparing", "Checking request…"),
            Stage::Extracting => ("Extracting", "Reading text…"),
            Stage::Summarizing => ("Summarizing", "Writing the script…"),
            Stage::Formatting => ("Formatting", "Building the summary card…"),
            Stage::Synthesizing => ("Narrating", "Starting narration…"),
            Stage::Assembling => ("Assembling", "Joining audio…"),
            Stage::Persisting => ("Saving", "Writing history entry…"),
            Stage::Completed => return,
        };
        self.bar.set_style(Self::spinner_style());
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
    }

    fn on_pages_start(&self, total_pages: usize) {
        self.activate_bar("Transcribing", total_pages, "pages");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanned document: transcribing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let start = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&page_num));

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{:.1}s", Self::elapsed_secs(start))),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let start = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&page_num));
        self.errors.fetch_add(1, Ordering::SeqCst);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&clip(error, 80)),
            dim(&format!("{:.1}s", Self::elapsed_secs(start))),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_start(&self, chunk: usize, total: usize) {
        if chunk == 1 {
            self.activate_bar("Narrating", total, "chunks");
        }
        if let Ok(mut start) = self.chunk_start.lock() {
            *start = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {chunk}"));
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize, audio_bytes: usize) {
        let start = self.chunk_start.lock().ok().and_then(|mut s| s.take());
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            chunk,
            total,
            dim(&format!("{:>6} KiB", audio_bytes / 1024)),
            dim(&format!("{:.1}s", Self::elapsed_secs(start))),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, duration_secs: f64) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} of audio narrated",
                green("✔"),
                bold(&format_duration(duration_secs))
            );
        } else {
            eprintln!(
                "{} {} of audio narrated  ({} pages skipped)",
                cyan("⚠"),
                bold(&format_duration(duration_secs)),
                red(&failed.to_string()),
            );
        }
    }

    fn on_run_failed(&self, stage: Stage, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} failed while {}: {}", red("✘"), stage, clip(error, 160));
    }
}

fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

fn format_duration(secs: f64) -> String {
    let total = secs.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Two-minute conversational summary of a PDF
  doc2audio report.pdf -o report.wav

  # Five minutes of key insights, in French, with another voice
  doc2audio report.pdf -o insights.wav --minutes 5 --goal key_insights \
      --language french --voice nova

  # Custom goal
  doc2audio notes.txt -o notes.wav --goal custom \
      --goal-instruction "Explain the budget changes to a new team member"

  # Two-voice podcast
  doc2audio paper.pdf -o podcast.wav --goal podcast \
      --voice1-style curious_american --voice2-style passionate_expert

  # Scanned document: skip the text layer and read pages with the vision model
  doc2audio scan.pdf -o scan.wav --extraction vision

  # From a URL, saving the run to history and the summary card to HTML
  doc2audio https://arxiv.org/pdf/1706.03762 -o attention.wav \
      --history-dir ./history --card attention.html

  # History
  doc2audio --history-dir ./history --list-history
  doc2audio --history-dir ./history --rerun 20250101_120000 -o again.wav --tone formal
  doc2audio --history-dir ./history --delete-history 20250101_120000

GOALS:
  general_summary (default), key_insights, action_items, topic_analysis,
  recommendations, custom (needs --goal-instruction), podcast

TONES:
  professional, conversational (default), enthusiastic, formal, casual, empathetic

PODCAST PERSONAS:
  contemplating_british (host default), curious_american, energetic_host,
  thoughtful_journalist, friendly_interviewer, authoritative_professor
  (guest default), passionate_expert, analytical_researcher,
  experienced_practitioner, industry_veteran, pirate_interviewer, vampire_expert

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY             OpenAI key (text, vision and audio)
  OPENAI_BASE_URL            OpenAI-compatible base URL for audio calls
  AZURE_OPENAI_ENDPOINT      Azure OpenAI endpoint (audio calls)
  AZURE_OPENAI_API_KEY       Azure OpenAI key
  AZURE_OPENAI_AUDIO_DEPLOYMENT  Azure deployment serving the audio model
  EDGEQUAKE_LLM_PROVIDER     Override text provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL            Override text model ID
  PDFIUM_LIB_PATH            Path to libpdfium (file or directory)

  Variables are also read from ./keys.env and ./.env when present.
"#;

/// Turn documents into narrated audio summaries and podcasts.
#[derive(Parser, Debug)]
#[command(
    name = "doc2audio",
    version,
    about = "Turn PDF and text documents into narrated audio summaries",
    long_about = "Turn a document (plain text or PDF, local or by URL) into a spoken summary \
shaped by length, tone, goal and language, or into a two-voice podcast. Scanned PDFs are \
transcribed page by page with a vision model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path (PDF or UTF-8 text) or HTTP/HTTPS URL.
    input: Option<String>,

    /// Write the WAV narration here. Default: <input stem>.wav
    #[arg(short, long, env = "DOC2AUDIO_OUTPUT")]
    output: Option<PathBuf>,

    /// Target narration length in minutes.
    #[arg(short, long, env = "DOC2AUDIO_MINUTES", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=60))]
    minutes: u32,

    /// Narrator tone (ignored for podcasts).
    #[arg(long, env = "DOC2AUDIO_TONE", default_value = "conversational", value_parser = parse_tone)]
    tone: Tone,

    /// Output language (unknown values fall back to english).
    #[arg(long, env = "DOC2AUDIO_LANGUAGE", default_value = "english")]
    language: String,

    /// Narration goal: general_summary, key_insights, action_items,
    /// topic_analysis, recommendations, custom, podcast.
    #[arg(long, env = "DOC2AUDIO_GOAL", default_value = "general_summary")]
    goal: String,

    /// Instruction for `--goal custom`.
    #[arg(long, env = "DOC2AUDIO_GOAL_INSTRUCTION")]
    goal_instruction: Option<String>,

    /// Persona of the first (questioning) podcast speaker.
    #[arg(long, env = "DOC2AUDIO_VOICE1_STYLE", value_parser = parse_persona)]
    voice1_style: Option<PersonaStyle>,

    /// Persona of the second (answering) podcast speaker.
    #[arg(long, env = "DOC2AUDIO_VOICE2_STYLE", value_parser = parse_persona)]
    voice2_style: Option<PersonaStyle>,

    /// Synthesis voice passed to the audio model (alloy, echo, fable, onyx, nova, shimmer…).
    #[arg(long, env = "DOC2AUDIO_VOICE", default_value = "alloy")]
    voice: String,

    /// PDF text recovery: hybrid (text layer first) or vision (always rasterise).
    #[arg(long, env = "DOC2AUDIO_EXTRACTION", value_enum, default_value = "hybrid")]
    extraction: ExtractionArg,

    /// Number of concurrent vision calls for scanned pages.
    #[arg(short, long, env = "DOC2AUDIO_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Split narration segments longer than this many words at sentence ends.
    #[arg(long, env = "DOC2AUDIO_RECHUNK_WORDS")]
    rechunk_words: Option<usize>,

    /// Text LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Text/vision model ID (default: gpt-4o).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Audio-capable chat model or Azure deployment (default: gpt-4o-audio-preview).
    #[arg(long, env = "DOC2AUDIO_AUDIO_MODEL")]
    audio_model: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2AUDIO_PASSWORD")]
    password: Option<String>,

    /// Save completed runs in this directory (required for the history flags).
    #[arg(long, env = "DOC2AUDIO_HISTORY_DIR")]
    history_dir: Option<PathBuf>,

    /// Narrate the text of a saved history entry again with the given settings.
    #[arg(long, value_name = "ID", conflicts_with = "input")]
    rerun: Option<String>,

    /// List saved history entries, newest first.
    #[arg(long)]
    list_history: bool,

    /// Print one history entry (settings and extracted text).
    #[arg(long, value_name = "ID")]
    show_history: Option<String>,

    /// Delete one history entry.
    #[arg(long, value_name = "ID")]
    delete_history: Option<String>,

    /// Delete every history entry.
    #[arg(long)]
    clear_history: bool,

    /// Also write the HTML summary card to this file.
    #[arg(long, env = "DOC2AUDIO_CARD")]
    card: Option<PathBuf>,

    /// Print a JSON run report on stdout.
    #[arg(long, env = "DOC2AUDIO_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2AUDIO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2AUDIO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2AUDIO_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2AUDIO_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "DOC2AUDIO_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Retries per model call on transient failure.
    #[arg(long, env = "DOC2AUDIO_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ExtractionArg {
    Hybrid,
    Vision,
}

impl From<ExtractionArg> for ExtractionStrategy {
    fn from(v: ExtractionArg) -> Self {
        match v {
            ExtractionArg::Hybrid => ExtractionStrategy::Hybrid,
            ExtractionArg::Vision => ExtractionStrategy::Vision,
        }
    }
}

fn parse_tone(s: &str) -> std::result::Result<Tone, String> {
    let key = s.trim().to_lowercase();
    Tone::ALL
        .into_iter()
        .find(|t| t.as_str() == key)
        .ok_or_else(|| format!("unknown tone '{s}'"))
}

fn parse_persona(s: &str) -> std::result::Result<PersonaStyle, String> {
    let key = s.trim().to_lowercase();
    PersonaStyle::ALL
        .into_iter()
        .find(|p| p.key() == key)
        .ok_or_else(|| format!("unknown persona '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keys may live next to the binary's working directory.
    dotenvy::from_filename("keys.env").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── History management (no API key needed) ───────────────────────────
    if cli.list_history
        || cli.show_history.is_some()
        || cli.delete_history.is_some()
        || cli.clear_history
    {
        let store = open_history(&cli).await?;
        return manage_history(&cli, &store).await;
    }

    // ── Build the narration stack ────────────────────────────────────────
    let profile = build_profile(&cli)?;
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn NarrationProgressCallback>)
    } else {
        None
    };
    let ctx = build_context(&cli, progress).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let (output, output_path) = if let Some(ref id) = cli.rerun {
        let output = rerun_from_history(&ctx, id, &profile)
            .await
            .context("Rerun failed")?;
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{id}_rerun.wav")));
        edgequake_doc2audio::narrate::write_atomic(&path, &output.audio.bytes)
            .await
            .context("Failed to write narration")?;
        (output, path)
    } else {
        let Some(ref input) = cli.input else {
            bail!("an input file or URL is required (or --rerun <ID>)");
        };
        let path = cli.output.clone().unwrap_or_else(|| default_output(input));
        let output = narrate_file(&ctx, input, &path, &profile)
            .await
            .context("Narration failed")?;
        (output, path)
    };

    if let Some(ref card_path) = cli.card {
        edgequake_doc2audio::narrate::write_atomic(card_path, output.formatted_summary.as_bytes())
            .await
            .context("Failed to write summary card")?;
    }

    report(&cli, &output, &output_path)
}

/// Map CLI args to a `RequestProfile`.
fn build_profile(cli: &Cli) -> Result<RequestProfile> {
    let goal = Goal::from_parts(
        &cli.goal,
        cli.goal_instruction.clone(),
        cli.voice1_style,
        cli.voice2_style,
    )
    .context("Invalid goal")?;

    let profile = RequestProfile {
        target_minutes: cli.minutes,
        tone: cli.tone,
        language: Language::from_key(&cli.language),
        goal,
        voice: cli.voice.clone(),
    };
    profile.validate().context("Invalid request")?;
    Ok(profile)
}

/// Map CLI args to `NarrationConfig` and wire the collaborators.
async fn build_context(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineContext> {
    let mut builder = NarrationConfig::builder()
        .concurrency(cli.concurrency)
        .extraction(cli.extraction.clone().into())
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(words) = cli.rechunk_words {
        builder = builder.rechunk_words(words);
    }
    let config = builder.build().context("Invalid configuration")?;

    let service = LlmCompletionService::from_env(
        cli.provider.as_deref(),
        cli.model.as_deref(),
        cli.audio_model.as_deref(),
    )
    .context("Failed to configure model providers")?;
    let service = ResilientService::new(
        Arc::new(service),
        TransportOptions {
            api_timeout_secs: cli.api_timeout,
            max_retries: cli.max_retries,
            ..Default::default()
        },
    );

    let mut ctx = PipelineContext::builder(Arc::new(service)).config(config);
    if let Some(cb) = progress {
        ctx = ctx.progress(cb);
    }
    if cli.history_dir.is_some() {
        ctx = ctx.history(Arc::new(open_history(cli).await?));
    }
    ctx.build().context("Invalid pipeline setup")
}

async fn open_history(cli: &Cli) -> Result<FsHistoryStore> {
    let Some(ref dir) = cli.history_dir else {
        bail!("--history-dir is required for history operations");
    };
    FsHistoryStore::open(dir)
        .await
        .with_context(|| format!("Failed to open history at {}", dir.display()))
}

async fn manage_history(cli: &Cli, store: &FsHistoryStore) -> Result<()> {
    if cli.clear_history {
        let removed = store.clear().await?;
        if !cli.quiet {
            eprintln!("{} removed {} entries", green("✔"), removed);
        }
        return Ok(());
    }

    if let Some(ref id) = cli.delete_history {
        if !store.delete(id).await? {
            bail!("history entry '{id}' not found");
        }
        if !cli.quiet {
            eprintln!("{} deleted {}", green("✔"), id);
        }
        return Ok(());
    }

    if let Some(ref id) = cli.show_history {
        let Some(entry) = store.get(id).await? else {
            bail!("history entry '{id}' not found");
        };
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&entry)?);
        } else {
            println!("Id:           {}", entry.id);
            println!("Created:      {}", entry.created_at.to_rfc3339());
            println!("File:         {}", entry.original_filename);
            println!("Goal:         {}", entry.settings.goal.key());
            println!("Tone:         {}", entry.settings.tone.as_str());
            println!("Language:     {}", entry.settings.language.display_name());
            println!("Voice:        {}", entry.settings.voice);
            println!("Length:       {} min", entry.settings.summary_length);
            println!("Duration:     {}", format_duration(entry.duration_secs));
            if let Some(text) = entry.extracted_text {
                println!();
                println!("{text}");
            }
        }
        return Ok(());
    }

    let entries = store.list(usize::MAX, 0, false).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("{}", dim("no history entries"));
    } else {
        for e in entries {
            println!(
                "{}  {:<16}  {:>6}  {}",
                bold(&e.id),
                e.settings.goal.key(),
                format_duration(e.duration_secs),
                e.original_filename,
            );
        }
    }
    Ok(())
}

/// `report.pdf` → `report.wav`; URLs use their last path segment.
fn default_output(input: &str) -> PathBuf {
    let name = input
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("narration");
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("narration");
    PathBuf::from(format!("{stem}.wav"))
}

fn report(cli: &Cli, output: &NarrationOutput, path: &Path) -> Result<()> {
    let stats = &output.stats;
    if cli.json {
        let report = serde_json::json!({
            "output": path.display().to_string(),
            "entry_id": output.entry_id,
            "source": output.extracted.source,
            "failed_pages": output.extracted.failed_pages,
            "stats": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    eprintln!(
        "{}  {} in {} chunks  {}ms  →  {}",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        format_duration(stats.audio_duration_secs),
        stats.chunk_count,
        stats.total_duration_ms,
        bold(&path.display().to_string()),
    );
    eprintln!(
        "   {} words  /  {} tokens in  /  {} tokens out",
        dim(&stats.script_words.to_string()),
        dim(&stats.total_input_tokens.to_string()),
        dim(&stats.total_output_tokens.to_string()),
    );
    if let Some(ref id) = output.entry_id {
        eprintln!("   saved to history as {}", bold(id));
    }
    Ok(())
}
