//! Chunked synthesis: narration script → ordered [`AudioChunk`]s.
//!
//! The script is split on the `=== Page Break ===` marker and each non-empty
//! segment is narrated by one audio call. Calls are strictly sequential and
//! chunk `i` always lands at index `i`; the assembler relies on that order.
//! One failed chunk fails the run.

use crate::config::NarrationConfig;
use crate::error::NarrationError;
use crate::output::AudioChunk;
use crate::profile::RequestProfile;
use crate::progress::ProgressCallback;
use crate::prompts::{narration_prompt, CHUNK_BREAK};
use crate::service::{AudioRequest, CompletionService};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

/// Split a script into narration segments: trimmed, empties dropped.
pub fn split_script(script: &str) -> Vec<String> {
    script
        .split(CHUNK_BREAK)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Break segments longer than `max_words` at sentence ends.
///
/// A single sentence longer than the limit is cut at the limit.
pub fn rechunk(segments: Vec<String>, max_words: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.split_whitespace().count() <= max_words {
            out.push(segment);
            continue;
        }

        let mut current: Vec<&str> = Vec::new();
        for sentence in sentences(&segment) {
            if !current.is_empty() && current.len() + sentence.len() > max_words {
                out.push(current.join(" "));
                current.clear();
            }
            for word in sentence {
                current.push(word);
                if current.len() == max_words {
                    out.push(current.join(" "));
                    current.clear();
                }
            }
        }
        if !current.is_empty() {
            out.push(current.join(" "));
        }
    }
    out
}

fn sentences(text: &str) -> Vec<Vec<&str>> {
    let mut all = Vec::new();
    let mut current = Vec::new();
    for word in text.split_whitespace() {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            all.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        all.push(current);
    }
    all
}

/// Narrate every segment of `script`, in order.
///
/// # Errors
/// [`NarrationError::Synthesis`] naming the first chunk that failed.
pub async fn synthesize(
    service: &dyn CompletionService,
    script: &str,
    profile: &RequestProfile,
    config: &NarrationConfig,
    progress: &ProgressCallback,
) -> Result<Vec<AudioChunk>, NarrationError> {
    let mut segments = split_script(script);
    if let Some(max_words) = config.rechunk_words {
        segments = rechunk(segments, max_words);
    }

    let total = segments.len();
    if total == 0 {
        return Err(NarrationError::Synthesis {
            chunk: 0,
            total: 0,
            detail: "script has no narratable text".into(),
        });
    }
    info!("Narrating {} chunks with voice '{}'", total, profile.voice);

    let system = narration_prompt(profile);
    let mut chunks = Vec::with_capacity(total);

    for (index, segment) in segments.into_iter().enumerate() {
        let chunk_num = index + 1;
        progress.on_chunk_start(chunk_num, total);

        let request = AudioRequest {
            system: system.clone(),
            text: segment,
            voice: profile.voice.clone(),
            format: config.audio_format,
            temperature: config.audio_temperature,
            top_p: config.audio_top_p,
            frequency_penalty: config.audio_frequency_penalty,
            presence_penalty: config.audio_presence_penalty,
        };

        let fail = |detail: String| NarrationError::Synthesis {
            chunk: chunk_num,
            total,
            detail,
        };

        let completion = service
            .complete_audio(&request)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let bytes = STANDARD
            .decode(completion.data_base64.trim())
            .map_err(|e| fail(format!("audio payload is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(fail("audio payload is empty".into()));
        }

        debug!("Chunk {}/{}: {} bytes of audio", chunk_num, total, bytes.len());
        progress.on_chunk_complete(chunk_num, total, bytes.len());
        chunks.push(AudioChunk { index, bytes });
    }

    Ok(chunks)
}
