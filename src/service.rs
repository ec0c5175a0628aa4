//! Remote completion calls: the one seam through which the pipeline talks to models.
//!
//! The pipeline stages depend only on the [`CompletionService`] trait. Two
//! roles are used:
//!
//! * **text** — transcription of page images, summarization and summary
//!   cards, served by any `edgequake-llm` provider (cards go through a
//!   forced function call so the answer follows a JSON Schema);
//! * **audio** — per-chunk narration through an OpenAI-compatible chat
//!   completions endpoint that accepts `modalities: ["text", "audio"]` and
//!   returns inline base64 audio.
//!
//! [`LlmCompletionService`] is the production implementation.
//! [`ResilientService`] wraps any implementation with a per-call timeout and
//! exponential-backoff retries, so retry policy lives beneath the pipeline
//! and the stages only ever see "call failed" or "call succeeded".

use crate::config::AudioFormat;
use crate::error::{CompletionError, NarrationError};
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory, ToolChoice,
    ToolDefinition,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Default text/vision model when none is configured.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o";

/// Default audio-capable model when none is configured.
pub const DEFAULT_AUDIO_MODEL: &str = "gpt-4o-audio-preview";

/// Azure OpenAI API version that exposes audio output on chat completions.
pub const AZURE_API_VERSION: &str = "2025-01-01-preview";

// ── Requests & responses ─────────────────────────────────────────────────

/// A call to the text/vision model: one system turn, one user turn, and an
/// optional image attached to the user turn.
#[derive(Clone)]
pub struct TextRequest {
    pub system: String,
    pub user: String,
    pub image: Option<ImageData>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl TextRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            image: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl fmt::Debug for TextRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextRequest")
            .field("system_len", &self.system.len())
            .field("user_len", &self.user.len())
            .field("image", &self.image.as_ref().map(|_| "<base64 image>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Text returned by the text/vision model.
#[derive(Debug, Clone, Default)]
pub struct TextCompletion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A text call answered through one forced function call whose arguments
/// follow `parameters`, a JSON Schema.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub text: TextRequest,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolRequest {
    pub fn new(
        text: TextRequest,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            text,
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Answer to a [`ToolRequest`].
#[derive(Debug, Clone, Default)]
pub struct ToolCompletion {
    /// Raw JSON arguments of the call, `None` when the model answered in prose.
    pub arguments: Option<String>,
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A call to the audio model narrating one chunk.
#[derive(Debug, Clone)]
pub struct AudioRequest {
    /// Narrator instructions (language, voice, tone or personas).
    pub system: String,
    /// The chunk to read verbatim.
    pub text: String,
    /// Synthesis voice identifier, e.g. `alloy`.
    pub voice: String,
    pub format: AudioFormat,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// Audio returned by the audio model, still base64-encoded.
#[derive(Debug, Clone)]
pub struct AudioCompletion {
    pub data_base64: String,
    pub transcript: Option<String>,
}

/// The completion service consumed by every pipeline stage.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Text/vision completion.
    async fn complete_text(&self, request: &TextRequest) -> Result<TextCompletion, CompletionError>;

    /// Text completion forced through the function described by `request`.
    ///
    /// Services without tool calling answer in prose; the caller then
    /// parses [`ToolCompletion::content`].
    async fn complete_tool(&self, request: &ToolRequest) -> Result<ToolCompletion, CompletionError> {
        let text = self.complete_text(&request.text).await?;
        Ok(ToolCompletion {
            arguments: None,
            content: text.content,
            input_tokens: text.input_tokens,
            output_tokens: text.output_tokens,
        })
    }

    /// Audio completion for one narration chunk.
    async fn complete_audio(
        &self,
        request: &AudioRequest,
    ) -> Result<AudioCompletion, CompletionError>;
}

// ── Production implementation ────────────────────────────────────────────

/// [`CompletionService`] backed by an `edgequake-llm` provider for text and
/// an [`AudioEndpoint`] for narration.
pub struct LlmCompletionService {
    text: Arc<dyn LLMProvider>,
    audio: AudioEndpoint,
}

impl LlmCompletionService {
    pub fn new(text: Arc<dyn LLMProvider>, audio: AudioEndpoint) -> Self {
        Self { text, audio }
    }

    /// Resolve both roles from the environment.
    ///
    /// See [`resolve_text_provider`] and [`AudioEndpoint::from_env`].
    pub fn from_env(
        provider_name: Option<&str>,
        text_model: Option<&str>,
        audio_model: Option<&str>,
    ) -> Result<Self, NarrationError> {
        let text = resolve_text_provider(provider_name, text_model)?;
        let audio = AudioEndpoint::from_env(audio_model)?;
        Ok(Self::new(text, audio))
    }
}

fn chat_messages(request: &TextRequest) -> Vec<ChatMessage> {
    let user = match &request.image {
        Some(image) => ChatMessage::user_with_images(request.user.as_str(), vec![image.clone()]),
        None => ChatMessage::user(request.user.as_str()),
    };
    vec![ChatMessage::system(request.system.as_str()), user]
}

fn chat_options(request: &TextRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        ..Default::default()
    }
}

fn api_error(e: impl fmt::Display) -> CompletionError {
    CompletionError::Api {
        status: None,
        message: e.to_string(),
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn complete_text(&self, request: &TextRequest) -> Result<TextCompletion, CompletionError> {
        let response = self
            .text
            .chat(&chat_messages(request), Some(&chat_options(request)))
            .await
            .map_err(api_error)?;

        debug!(
            "text completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(TextCompletion {
            content: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }

    async fn complete_tool(&self, request: &ToolRequest) -> Result<ToolCompletion, CompletionError> {
        let tool = ToolDefinition::function(
            request.name.as_str(),
            request.description.as_str(),
            request.parameters.clone(),
        );
        // Providers without function calling ignore the tool and answer in prose.
        let response = self
            .text
            .chat_with_tools(
                &chat_messages(&request.text),
                &[tool],
                Some(ToolChoice::required()),
                Some(&chat_options(&request.text)),
            )
            .await
            .map_err(api_error)?;

        let arguments = response
            .tool_calls
            .iter()
            .find(|call| call.name() == request.name)
            .map(|call| call.arguments().to_string());
        debug!(
            "tool completion '{}': called={}, {} input tokens, {} output tokens",
            request.name,
            arguments.is_some(),
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(ToolCompletion {
            arguments,
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }

    async fn complete_audio(
        &self,
        request: &AudioRequest,
    ) -> Result<AudioCompletion, CompletionError> {
        self.audio.complete(request).await
    }
}

// ── Audio endpoint ───────────────────────────────────────────────────────

#[derive(Clone)]
enum AudioAuth {
    Bearer(String),
    AzureKey(String),
}

/// OpenAI-compatible chat-completions endpoint that can answer with audio.
#[derive(Clone)]
pub struct AudioEndpoint {
    client: reqwest::Client,
    url: String,
    auth: AudioAuth,
    /// Sent in the body for OpenAI; Azure routes by deployment in the URL.
    model: Option<String>,
}

impl fmt::Debug for AudioEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioEndpoint")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish()
    }
}

impl AudioEndpoint {
    /// OpenAI (or any compatible server) at `base_url`, default `https://api.openai.com/v1`.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>, base_url: Option<&str>) -> Self {
        let base = base_url
            .unwrap_or("https://api.openai.com/v1")
            .trim_end_matches('/');
        Self {
            client: reqwest::Client::new(),
            url: format!("{base}/chat/completions"),
            auth: AudioAuth::Bearer(api_key.into()),
            model: Some(model.into()),
        }
    }

    /// Azure OpenAI deployment.
    pub fn azure(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: &str,
        api_version: &str,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!(
                "{}/openai/deployments/{deployment}/chat/completions?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
            auth: AudioAuth::AzureKey(api_key.into()),
            model: None,
        }
    }

    /// Resolve the audio endpoint from the environment.
    ///
    /// Azure wins when `AZURE_OPENAI_ENDPOINT` and `AZURE_OPENAI_API_KEY` are
    /// both set (deployment from `AZURE_OPENAI_AUDIO_DEPLOYMENT`, else the
    /// model name). Otherwise `OPENAI_API_KEY` with optional `OPENAI_BASE_URL`.
    pub fn from_env(model: Option<&str>) -> Result<Self, NarrationError> {
        let model = model.unwrap_or(DEFAULT_AUDIO_MODEL);

        if let (Some(endpoint), Some(key)) = (
            non_empty_env("AZURE_OPENAI_ENDPOINT"),
            non_empty_env("AZURE_OPENAI_API_KEY"),
        ) {
            let deployment =
                non_empty_env("AZURE_OPENAI_AUDIO_DEPLOYMENT").unwrap_or_else(|| model.to_string());
            return Ok(Self::azure(&endpoint, key, &deployment, AZURE_API_VERSION));
        }

        if let Some(key) = non_empty_env("OPENAI_API_KEY") {
            let base = non_empty_env("OPENAI_BASE_URL");
            return Ok(Self::openai(key, model, base.as_deref()));
        }

        Err(NarrationError::ProviderNotConfigured {
            provider: "audio".to_string(),
            hint: "Set OPENAI_API_KEY, or AZURE_OPENAI_ENDPOINT + AZURE_OPENAI_API_KEY \
                   (+ AZURE_OPENAI_AUDIO_DEPLOYMENT) for narration."
                .to_string(),
        })
    }

    async fn complete(&self, request: &AudioRequest) -> Result<AudioCompletion, CompletionError> {
        let body = AudioChatBody {
            model: self.model.as_deref(),
            modalities: ["text", "audio"],
            audio: AudioParams {
                voice: &request.voice,
                format: request.format.as_str(),
            },
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            temperature: request.temperature,
            top_p: request.top_p,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        };

        let builder = self.client.post(&self.url).json(&body);
        let builder = match &self.auth {
            AudioAuth::Bearer(key) => builder.bearer_auth(key),
            AudioAuth::AzureKey(key) => builder.header("api-key", key),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: Some(status.as_u16()),
                message: truncate(&detail, 300),
            });
        }

        let parsed: AudioChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.audio)
            .map(|a| AudioCompletion {
                data_base64: a.data,
                transcript: a.transcript,
            })
            .ok_or_else(|| CompletionError::Malformed("response carried no audio".into()))
    }
}

#[derive(Serialize)]
struct AudioChatBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    modalities: [&'a str; 2],
    audio: AudioParams<'a>,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Serialize)]
struct AudioParams<'a> {
    voice: &'a str,
    format: &'a str,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AudioChatResponse {
    #[serde(default)]
    choices: Vec<AudioChoice>,
}

#[derive(Deserialize)]
struct AudioChoice {
    message: AudioMessage,
}

#[derive(Deserialize)]
struct AudioMessage {
    #[serde(default)]
    audio: Option<WireAudio>,
}

#[derive(Deserialize)]
struct WireAudio {
    data: String,
    #[serde(default)]
    transcript: Option<String>,
}

// ── Transport resilience ─────────────────────────────────────────────────

/// Timeout and retry policy applied beneath the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Retries after a transient failure. Default: 3.
    ///
    /// Permanent failures (4xx other than 429, malformed payloads) are
    /// returned immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            api_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

/// Decorator adding a per-call timeout and exponential-backoff retries to
/// any [`CompletionService`].
///
/// With 500 ms base and 3 retries the waits are 500 ms → 1 s → 2 s.
pub struct ResilientService {
    inner: Arc<dyn CompletionService>,
    options: TransportOptions,
}

impl ResilientService {
    pub fn new(inner: Arc<dyn CompletionService>, options: TransportOptions) -> Self {
        Self { inner, options }
    }

    async fn call<T, F, Fut>(&self, what: &str, mut f: F) -> Result<T, CompletionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let limit = Duration::from_secs(self.options.api_timeout_secs);
        let mut attempt = 0u32;
        loop {
            let outcome = match timeout(limit, f()).await {
                Ok(result) => result,
                Err(_) => Err(CompletionError::Timeout {
                    secs: self.options.api_timeout_secs,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.options.max_retries => {
                    attempt += 1;
                    let backoff = self.options.retry_backoff_ms * 2u64.pow(attempt - 1);
                    warn!(
                        "{}: attempt {} failed — {}; retry {}/{} after {}ms",
                        what, attempt, e, attempt, self.options.max_retries, backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl CompletionService for ResilientService {
    async fn complete_text(&self, request: &TextRequest) -> Result<TextCompletion, CompletionError> {
        let what = if request.image.is_some() {
            "vision call"
        } else {
            "text call"
        };
        self.call(what, || self.inner.complete_text(request)).await
    }

    async fn complete_tool(&self, request: &ToolRequest) -> Result<ToolCompletion, CompletionError> {
        self.call("tool call", || self.inner.complete_tool(request))
            .await
    }

    async fn complete_audio(
        &self,
        request: &AudioRequest,
    ) -> Result<AudioCompletion, CompletionError> {
        self.call("audio call", || self.inner.complete_audio(request))
            .await
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the text/vision provider, from most-specific to least-specific.
///
/// 1. **Named provider + model** — [`ProviderFactory::create_llm_provider`]
///    reads the matching API key from the environment.
/// 2. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 3. **OpenAI** when `OPENAI_API_KEY` is set, so users holding several keys
///    get the provider that also serves narration.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_text_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, NarrationError> {
    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or(DEFAULT_TEXT_MODEL));
    }

    if let (Some(prov), Some(env_model)) = (
        non_empty_env("EDGEQUAKE_LLM_PROVIDER"),
        non_empty_env("EDGEQUAKE_MODEL"),
    ) {
        return create_provider(&prov, model.unwrap_or(&env_model));
    }

    if non_empty_env("OPENAI_API_KEY").is_some() {
        return create_provider("openai", model.unwrap_or(DEFAULT_TEXT_MODEL));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| NarrationError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, NarrationError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        NarrationError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls with `error`, then succeeds.
    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        error: CompletionError,
    }

    #[async_trait]
    impl CompletionService for Flaky {
        async fn complete_text(
            &self,
            _request: &TextRequest,
        ) -> Result<TextCompletion, CompletionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(TextCompletion {
                    content: "ok".into(),
                    ..Default::default()
                })
            }
        }

        async fn complete_audio(
            &self,
            _request: &AudioRequest,
        ) -> Result<AudioCompletion, CompletionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(AudioCompletion {
                data_base64: String::new(),
                transcript: None,
            })
        }
    }

    fn fast_options(max_retries: u32) -> TransportOptions {
        TransportOptions {
            api_timeout_secs: 1,
            max_retries,
            retry_backoff_ms: 1,
        }
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures: 2,
            error: CompletionError::Api {
                status: Some(503),
                message: "busy".into(),
            },
        });
        let service = ResilientService::new(flaky.clone(), fast_options(3));
        let out = service
            .complete_text(&TextRequest::new("sys", "user"))
            .await
            .expect("third attempt succeeds");
        assert_eq!(out.content, "ok");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures: 5,
            error: CompletionError::Api {
                status: Some(401),
                message: "bad key".into(),
            },
        });
        let service = ResilientService::new(flaky.clone(), fast_options(3));
        let err = service
            .complete_text(&TextRequest::new("sys", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Api { status: Some(401), .. }));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures: 0,
            error: CompletionError::Transport("unused".into()),
        });
        let service = ResilientService::new(flaky, fast_options(0));
        let request = AudioRequest {
            system: "narrate".into(),
            text: "hello".into(),
            voice: "alloy".into(),
            format: AudioFormat::Wav,
            temperature: 1.2,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };
        let err = service.complete_audio(&request).await.unwrap_err();
        assert_eq!(err, CompletionError::Timeout { secs: 1 });
    }

    #[tokio::test]
    async fn tool_calls_fall_back_to_prose_and_retry() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures: 1,
            error: CompletionError::Transport("reset".into()),
        });
        let service = ResilientService::new(flaky.clone(), fast_options(2));
        let request = ToolRequest::new(
            TextRequest::new("sys", "user"),
            "record",
            "Record it.",
            serde_json::json!({"type": "object"}),
        );
        let out = service.complete_tool(&request).await.unwrap();
        assert_eq!(out.arguments, None);
        assert_eq!(out.content, "ok");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn audio_body_shape() {
        let body = AudioChatBody {
            model: Some("gpt-4o-audio-preview"),
            modalities: ["text", "audio"],
            audio: AudioParams {
                voice: "alloy",
                format: "wav",
            },
            messages: vec![WireMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 1.2,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["modalities"][1], "audio");
        assert_eq!(json["audio"]["voice"], "alloy");
        assert_eq!(json["audio"]["format"], "wav");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn azure_body_omits_model() {
        let endpoint = AudioEndpoint::azure("https://res.openai.azure.com/", "k", "audio", AZURE_API_VERSION);
        assert_eq!(
            endpoint.url,
            "https://res.openai.azure.com/openai/deployments/audio/chat/completions?api-version=2025-01-01-preview"
        );
        assert!(endpoint.model.is_none());
    }

    #[test]
    fn audio_response_parses() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null,
            "audio":{"id":"a1","data":"UklGRg==","transcript":"hello","expires_at":0}}}]}"#;
        let parsed: AudioChatResponse = serde_json::from_str(raw).unwrap();
        let audio = parsed.choices[0].message.audio.as_ref().unwrap();
        assert_eq!(audio.data, "UklGRg==");
        assert_eq!(audio.transcript.as_deref(), Some("hello"));
    }

    #[test]
    fn truncate_long_error_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
