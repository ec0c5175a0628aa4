//! Summarization: extracted text + profile → narration script.
//!
//! One text-model call. The word budget (`target_minutes × 110`) is a soft
//! target handed to the model, not enforced afterwards. The model is asked
//! to drop a `=== Page Break ===` marker every ~100 words; downstream code
//! accepts any segmentation, including none.

use crate::config::NarrationConfig;
use crate::error::NarrationError;
use crate::output::SummaryScript;
use crate::pipeline::clean::clean_script;
use crate::profile::RequestProfile;
use crate::prompts::{summary_system_prompt, summary_user_prompt};
use crate::service::{CompletionService, TextRequest};
use tracing::{debug, info};

/// Write the narration script for `text`.
///
/// # Errors
/// [`NarrationError::Summarization`] when the call fails or the answer is empty.
pub async fn summarize(
    service: &dyn CompletionService,
    text: &str,
    profile: &RequestProfile,
    config: &NarrationConfig,
) -> Result<SummaryScript, NarrationError> {
    let request = TextRequest::new(
        summary_system_prompt(profile),
        summary_user_prompt(profile, text),
    )
    .with_temperature(config.text_temperature)
    .with_max_tokens(config.text_max_tokens);

    info!(
        "Summarizing {} chars: goal={}, ~{} words, {}",
        text.len(),
        profile.goal.key(),
        profile.target_words(),
        profile.language
    );

    let completion = service
        .complete_text(&request)
        .await
        .map_err(|e| NarrationError::Summarization {
            detail: e.to_string(),
        })?;

    let script = clean_script(&completion.content);
    if script.is_empty() {
        return Err(NarrationError::Summarization {
            detail: "model returned an empty summary".into(),
        });
    }

    debug!(
        "Script: {} words, {} output tokens",
        script.split_whitespace().count(),
        completion.output_tokens
    );

    Ok(SummaryScript {
        text: script,
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
    })
}
