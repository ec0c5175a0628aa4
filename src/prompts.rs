//! Prompts for every model call the pipeline makes.
//!
//! Centralising prompts keeps prompt wording out of the stage modules and
//! lets unit tests inspect exactly what the models are told without
//! spinning up a provider.

use crate::profile::{Goal, PersonaStyle, RequestProfile};

/// Marker separating pages in extracted text and chunks in a summary script.
pub const CHUNK_BREAK: &str = "=== Page Break ===";

/// Approximate words per narration chunk the summarizer is asked for.
pub const WORDS_PER_CHUNK: u32 = 100;

/// Instruction sent with each rendered page image.
pub const VISION_PAGE_PROMPT: &str = "Please read this document and extract all the text you see in a clear format. Also describe graphs, images, and tables in a clear format.";

/// Voice-acting directive for one persona archetype.
pub fn persona_directive(archetype: &str) -> String {
    format!(
        "You are an expert voice actor specializing in silly voices. Respond and vocalize to the user \
the EXACT same input text, but in your voice response you MUST express EACH of the vocal cadence, \
inflection, and tone of {archetype}."
    )
}

/// Goal instruction for the two-speaker podcast format.
pub fn podcast_instruction(voice1: PersonaStyle, voice2: PersonaStyle) -> String {
    format!(
        "Create an engaging conversation about the document between two people:\n\
Speaker 1 ({}): Ask insightful questions about the content.\n\
Speaker 2 ({}): Provide detailed, informative answers.\n\
Make it feel like a natural podcast discussion while covering the key points from the document. \
Put emphasis on each speaker's tone of voice.",
        voice1.directive(),
        voice2.directive()
    )
}

/// System prompt for the summarization call.
pub fn summary_system_prompt(profile: &RequestProfile) -> String {
    let language = profile.language.display_name();
    let tone_instruction = if profile.goal.is_podcast() {
        ""
    } else {
        profile.tone.instruction()
    };
    format!(
        "You are a specialized document analyzer. The summary must be written entirely in {language}. \
Do not use any other language.\n\n\
Your task: {goal}\n\n\
Format your response as a clear, engaging summary that takes approximately {minutes} minute(s) \
to read aloud (about {words} words). {tone_instruction}\n\n\
Focus on delivering content that precisely matches the specified goal while maintaining a natural \
speaking flow. The summary should be like a script for audiobook narrator.\n\
For every {chunk} words, make a page break, write out {CHUNK_BREAK}",
        goal = profile.goal.instruction(),
        minutes = profile.target_minutes,
        words = profile.target_words(),
        chunk = WORDS_PER_CHUNK,
    )
}

/// User turn for the summarization call.
pub fn summary_user_prompt(profile: &RequestProfile, text: &str) -> String {
    format!(
        "Please analyze this text in {}, focusing on the specified goal and aiming for approximately {} words:\n\n{}",
        profile.language.display_name(),
        profile.target_words(),
        text
    )
}

/// System prompt for narrating one chunk with the audio model.
pub fn narration_prompt(profile: &RequestProfile) -> String {
    let language = profile.language.display_name();
    match &profile.goal {
        Goal::Podcast {
            voice1_style,
            voice2_style,
        } => format!(
            "You are a professional audiobook reader. Your task is to read the provided text in {language}, \
ensuring it remains engaging throughout.\n\n\
- **Language**: {language}\n\
- **Voice**: {voice}\n\
- **Voice Style**: For Speaker 1 use: {v1}, For Speaker 2 use: {v2} this is VERY IMPORTANT\n\n\
# Output Format\n\
Produce an engaging podcast in {language}, maintaining the specified voice style but do not read \
speaker labels (SPEAKER 1, Speaker 2, etc.) out loud. It is VERY IMPORTANT you adhere to the voice \
styles for each speaker and read the text WORD for WORD.",
            voice = profile.voice,
            v1 = voice1_style.directive(),
            v2 = voice2_style.directive(),
        ),
        _ => format!(
            "You are a professional audiobook reader. Your task is to read the provided text in {language}, \
ensuring it remains engaging throughout.\n\n\
- **Language**: {language}\n\
- **Voice**: {voice}\n\
- **Tone**: {tone}\n\n\
# Output Format\n\
Produce an engaging audiobook narration in {language}, maintaining the specified tone and read \
the text WORD for WORD.",
            voice = profile.voice,
            tone = profile.tone,
        ),
    }
}

/// System prompt for the summary-card formatting call.
///
/// `schema` is the JSON shape the card renderer expects for this goal.
pub fn card_system_prompt(goal: &Goal, schema: &str) -> String {
    let focus = match goal {
        Goal::Custom { instruction } => instruction.clone(),
        other => other.key().replace('_', " "),
    };
    format!(
        "You are a content formatter. Turn the narration script you are given into a summary card. \
Format the content according to the goal: {focus}.\n\n\
Answer with a single JSON object and nothing else, using exactly this shape:\n{schema}"
    )
}
