//! Request profile: what kind of narration the caller wants.
//!
//! A [`RequestProfile`] fixes the length budget, tone, goal, language and
//! synthesis voice for one run. Goals are a closed enum: each variant owns
//! its summarization instruction (see [`Goal::instruction`]) and its summary
//! card layout (see [`crate::pipeline::format`]), so adding a goal is a
//! compile error everywhere it is not handled yet.

use crate::error::NarrationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speaking rate used to turn minutes into a word budget.
pub const WORDS_PER_MINUTE: u32 = 110;

/// Synthesis voice used when the caller does not pick one.
pub const DEFAULT_VOICE: &str = "alloy";

// ── Tone ─────────────────────────────────────────────────────────────────

/// Register of a single-narrator script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Professional,
    #[default]
    Conversational,
    Enthusiastic,
    Formal,
    Casual,
    Empathetic,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Professional,
        Tone::Conversational,
        Tone::Enthusiastic,
        Tone::Formal,
        Tone::Casual,
        Tone::Empathetic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Conversational => "conversational",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Empathetic => "empathetic",
        }
    }

    /// Style instruction handed to the summarizer.
    pub fn instruction(self) -> &'static str {
        match self {
            Tone::Professional => {
                "Use clear, precise language with business-appropriate terminology."
            }
            Tone::Conversational => "Use natural, friendly language as if speaking to a friend.",
            Tone::Enthusiastic => "Use energetic and engaging language with dynamic expressions.",
            Tone::Formal => "Use sophisticated vocabulary and academic language.",
            Tone::Casual => "Use relaxed, everyday language and a laid-back style.",
            Tone::Empathetic => "Use warm, understanding language that shows emotional awareness.",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = NarrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| NarrationError::Validation(format!("unknown tone '{s}'")))
    }
}

// ── Language ─────────────────────────────────────────────────────────────

/// Output language of the script and narration.
///
/// Parsing never fails: unknown keys resolve to [`Language::English`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Dutch,
    Polish,
    Japanese,
    Chinese,
    Korean,
    Swedish,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Portuguese,
        Language::Dutch,
        Language::Polish,
        Language::Japanese,
        Language::Chinese,
        Language::Korean,
        Language::Swedish,
    ];

    /// Resolve a caller-supplied key, falling back to English.
    pub fn from_key(key: &str) -> Self {
        let key = key.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.key() == key)
            .unwrap_or_default()
    }

    pub fn key(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "spanish",
            Language::French => "french",
            Language::German => "german",
            Language::Italian => "italian",
            Language::Portuguese => "portuguese",
            Language::Dutch => "dutch",
            Language::Polish => "polish",
            Language::Japanese => "japanese",
            Language::Chinese => "chinese",
            Language::Korean => "korean",
            Language::Swedish => "swedish",
        }
    }

    /// Canonical display name used inside prompts.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
            Language::Dutch => "Dutch",
            Language::Polish => "Polish",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
            Language::Korean => "Korean",
            Language::Swedish => "Swedish",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Persona styles ───────────────────────────────────────────────────────

/// Voice-acting persona for one side of a two-voice podcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaStyle {
    ContemplatingBritish,
    CuriousAmerican,
    EnergeticHost,
    ThoughtfulJournalist,
    FriendlyInterviewer,
    AuthoritativeProfessor,
    PassionateExpert,
    AnalyticalResearcher,
    ExperiencedPractitioner,
    IndustryVeteran,
    PirateInterviewer,
    VampireExpert,
}

impl PersonaStyle {
    /// Default persona for the questioning speaker.
    pub const DEFAULT_HOST: PersonaStyle = PersonaStyle::ContemplatingBritish;
    /// Default persona for the answering speaker.
    pub const DEFAULT_GUEST: PersonaStyle = PersonaStyle::AuthoritativeProfessor;

    pub const ALL: [PersonaStyle; 12] = [
        PersonaStyle::ContemplatingBritish,
        PersonaStyle::CuriousAmerican,
        PersonaStyle::EnergeticHost,
        PersonaStyle::ThoughtfulJournalist,
        PersonaStyle::FriendlyInterviewer,
        PersonaStyle::AuthoritativeProfessor,
        PersonaStyle::PassionateExpert,
        PersonaStyle::AnalyticalResearcher,
        PersonaStyle::ExperiencedPractitioner,
        PersonaStyle::IndustryVeteran,
        PersonaStyle::PirateInterviewer,
        PersonaStyle::VampireExpert,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PersonaStyle::ContemplatingBritish => "contemplating_british",
            PersonaStyle::CuriousAmerican => "curious_american",
            PersonaStyle::EnergeticHost => "energetic_host",
            PersonaStyle::ThoughtfulJournalist => "thoughtful_journalist",
            PersonaStyle::FriendlyInterviewer => "friendly_interviewer",
            PersonaStyle::AuthoritativeProfessor => "authoritative_professor",
            PersonaStyle::PassionateExpert => "passionate_expert",
            PersonaStyle::AnalyticalResearcher => "analytical_researcher",
            PersonaStyle::ExperiencedPractitioner => "experienced_practitioner",
            PersonaStyle::IndustryVeteran => "industry_veteran",
            PersonaStyle::PirateInterviewer => "pirate_interviewer",
            PersonaStyle::VampireExpert => "vampire_expert",
        }
    }

    /// The public figure whose cadence the persona imitates.
    pub fn archetype(self) -> &'static str {
        match self {
            PersonaStyle::ContemplatingBritish => "David Attenborough",
            PersonaStyle::CuriousAmerican => "Bill Nye the Science Guy",
            PersonaStyle::EnergeticHost => "Jimmy Fallon",
            PersonaStyle::ThoughtfulJournalist => "Morgan Freeman",
            PersonaStyle::FriendlyInterviewer => "Oprah Winfrey",
            PersonaStyle::AuthoritativeProfessor => "Neil deGrasse Tyson",
            PersonaStyle::PassionateExpert => "Tony Robbins",
            PersonaStyle::AnalyticalResearcher => "Carl Sagan",
            PersonaStyle::ExperiencedPractitioner => "Gordon Ramsay",
            PersonaStyle::IndustryVeteran => "Steve Jobs",
            PersonaStyle::PirateInterviewer => "Johnny Depp as Jack Sparrow",
            PersonaStyle::VampireExpert => "Christopher Lee as Count Dracula",
        }
    }

    /// Voice-acting directive sent to the summarizer and the audio model.
    pub fn directive(self) -> String {
        crate::prompts::persona_directive(self.archetype())
    }
}

impl fmt::Display for PersonaStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PersonaStyle {
    type Err = NarrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        PersonaStyle::ALL
            .into_iter()
            .find(|p| p.key() == key)
            .ok_or_else(|| NarrationError::Validation(format!("unknown voice style '{s}'")))
    }
}

// ── Goal ─────────────────────────────────────────────────────────────────

/// What the narration is for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "goal", rename_all = "snake_case")]
pub enum Goal {
    #[default]
    GeneralSummary,
    KeyInsights,
    ActionItems,
    TopicAnalysis,
    Recommendations,
    /// Free-form goal; the instruction is passed to the model verbatim.
    Custom { instruction: String },
    /// Two-speaker dialogue, each speaker voiced by a persona.
    Podcast {
        voice1_style: PersonaStyle,
        voice2_style: PersonaStyle,
    },
}

impl Goal {
    /// Build a goal from the loose fields a form or CLI provides.
    ///
    /// `instruction` is only read for `custom`; the voice styles only for
    /// `podcast`, where unset styles fall back to the default persona pair.
    pub fn from_parts(
        key: &str,
        instruction: Option<String>,
        voice1_style: Option<PersonaStyle>,
        voice2_style: Option<PersonaStyle>,
    ) -> Result<Self, NarrationError> {
        let goal = match key.trim().to_lowercase().as_str() {
            "general_summary" => Goal::GeneralSummary,
            "key_insights" => Goal::KeyInsights,
            "action_items" => Goal::ActionItems,
            "topic_analysis" => Goal::TopicAnalysis,
            "recommendations" => Goal::Recommendations,
            "custom" => Goal::Custom {
                instruction: instruction.unwrap_or_default(),
            },
            "podcast" => Goal::Podcast {
                voice1_style: voice1_style.unwrap_or(PersonaStyle::DEFAULT_HOST),
                voice2_style: voice2_style.unwrap_or(PersonaStyle::DEFAULT_GUEST),
            },
            other => {
                return Err(NarrationError::Validation(format!("unknown goal '{other}'")));
            }
        };
        Ok(goal)
    }

    pub fn key(&self) -> &'static str {
        match self {
            Goal::GeneralSummary => "general_summary",
            Goal::KeyInsights => "key_insights",
            Goal::ActionItems => "action_items",
            Goal::TopicAnalysis => "topic_analysis",
            Goal::Recommendations => "recommendations",
            Goal::Custom { .. } => "custom",
            Goal::Podcast { .. } => "podcast",
        }
    }

    pub fn is_podcast(&self) -> bool {
        matches!(self, Goal::Podcast { .. })
    }

    /// Task instruction handed to the summarizer.
    pub fn instruction(&self) -> String {
        match self {
            Goal::GeneralSummary => "Create a comprehensive overview of the main points and key takeaways from the document.".into(),
            Goal::KeyInsights => "Focus on extracting and highlighting the most important insights, findings, and key points from the document.".into(),
            Goal::ActionItems => "Identify and list the main action items, tasks, and next steps mentioned in the document.".into(),
            Goal::TopicAnalysis => "Analyze the document with a focus on the specific topic or aspect requested.".into(),
            Goal::Recommendations => "Extract and elaborate on the recommendations, suggestions, and proposed solutions from the document.".into(),
            Goal::Custom { instruction } => instruction.clone(),
            Goal::Podcast {
                voice1_style,
                voice2_style,
            } => crate::prompts::podcast_instruction(*voice1_style, *voice2_style),
        }
    }
}

// ── Profile ──────────────────────────────────────────────────────────────

/// Everything the caller chose for one narration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestProfile {
    /// Target narration length in minutes. Must be ≥ 1.
    pub target_minutes: u32,
    /// Narrator register. Ignored for podcasts.
    pub tone: Tone,
    pub language: Language,
    pub goal: Goal,
    /// Synthesis voice identifier passed to the audio model.
    pub voice: String,
}

impl Default for RequestProfile {
    fn default() -> Self {
        Self {
            target_minutes: 2,
            tone: Tone::default(),
            language: Language::default(),
            goal: Goal::default(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

impl RequestProfile {
    /// Soft word budget for the summary script.
    pub fn target_words(&self) -> u32 {
        self.target_minutes.saturating_mul(WORDS_PER_MINUTE)
    }

    /// Check the profile invariants. Called before any remote call.
    pub fn validate(&self) -> Result<(), NarrationError> {
        if self.target_minutes == 0 {
            return Err(NarrationError::Validation(
                "target length must be at least 1 minute".into(),
            ));
        }
        if let Goal::Custom { instruction } = &self.goal {
            if instruction.trim().is_empty() {
                return Err(NarrationError::Validation(
                    "a custom goal requires a non-empty goal instruction".into(),
                ));
            }
        }
        if self.voice.trim().is_empty() {
            return Err(NarrationError::Validation("voice must not be empty".into()));
        }
        Ok(())
    }
}
