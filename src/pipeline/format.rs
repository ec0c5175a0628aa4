//! Summary cards: narration script → HTML card shown next to the audio.
//!
//! [`CardFormatter`] asks the text model for a JSON card whose shape depends
//! on the goal, through a forced `record_summary_card` function call whose
//! parameters are [`card_parameters`]. Models that answer in prose instead
//! still work: the first JSON object in the text is used. The card is then
//! rendered to HTML. Every piece of model text is
//! HTML-escaped. A card with missing fields degrades to a title plus the raw
//! JSON; a failed call is reported to the orchestrator, which falls back to
//! [`plain_card`] rather than failing the run.

use crate::error::NarrationError;
use crate::pipeline::synthesize::split_script;
use crate::profile::{Goal, RequestProfile};
use crate::prompts::card_system_prompt;
use crate::service::{CompletionService, TextRequest, ToolRequest};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

/// Collaborator turning a script into the card shown to the user.
#[async_trait]
pub trait SummaryFormatter: Send + Sync {
    async fn format(&self, script: &str, profile: &RequestProfile) -> Result<String, NarrationError>;
}

/// Formatter that makes no call: the script itself, one paragraph per segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

#[async_trait]
impl SummaryFormatter for PlainFormatter {
    async fn format(&self, script: &str, _profile: &RequestProfile) -> Result<String, NarrationError> {
        Ok(plain_card(script))
    }
}

/// Function the card model is made to call.
pub const CARD_TOOL: &str = "record_summary_card";

/// Formatter backed by the text model.
pub struct CardFormatter {
    service: Arc<dyn CompletionService>,
    temperature: Option<f32>,
}

impl CardFormatter {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl SummaryFormatter for CardFormatter {
    async fn format(&self, script: &str, profile: &RequestProfile) -> Result<String, NarrationError> {
        let text = TextRequest::new(
            card_system_prompt(&profile.goal, card_schema(&profile.goal)),
            script,
        )
        .with_temperature(self.temperature);
        let request = ToolRequest::new(
            text,
            CARD_TOOL,
            "Record the summary card for the narration script.",
            card_parameters(&profile.goal),
        );

        let completion = self
            .service
            .complete_tool(&request)
            .await
            .map_err(|e| NarrationError::Internal(format!("summary card call failed: {e}")))?;

        let json = match completion.arguments.as_deref() {
            Some(arguments) => arguments,
            None => json_object(&completion.content).ok_or_else(|| {
                NarrationError::Internal("summary card answer holds no JSON object".into())
            })?,
        };
        let value: Value = serde_json::from_str(json)
            .map_err(|e| NarrationError::Internal(format!("summary card JSON: {e}")))?;

        debug!("Summary card fields: {:?}", value.as_object().map(|o| o.len()));
        Ok(render_card(&profile.goal, &value))
    }
}

// ── Schemas ──────────────────────────────────────────────────────────────

/// JSON shape requested from the model for `goal`.
pub fn card_schema(goal: &Goal) -> &'static str {
    match goal {
        Goal::GeneralSummary | Goal::Podcast { .. } => {
            r#"{"title": "string", "main_points": ["string"], "key_highlights": [{"highlight": "string", "details": "string"}], "conclusion": "string (optional)"}"#
        }
        Goal::KeyInsights => {
            r#"{"title": "string", "insights": [{"insight": "string", "impact": "string"}], "conclusion": "string (optional)"}"#
        }
        Goal::ActionItems => {
            r#"{"title": "string", "priority_actions": [{"action": "string", "priority": "High | Medium | Low", "timeline": "string"}], "conclusion": "string (optional)"}"#
        }
        Goal::TopicAnalysis => {
            r#"{"title": "string", "key_themes": [{"theme": "string", "analysis": "string"}], "conclusion": "string (optional)"}"#
        }
        Goal::Recommendations => {
            r#"{"title": "string", "recommendations": [{"recommendation": "string", "rationale": "string", "implementation": "string"}], "conclusion": "string (optional)"}"#
        }
        Goal::Custom { .. } => {
            r#"{"title": "string", "custom_analysis": [{"heading": "string", "content": "string"}], "conclusion": "string (optional)"}"#
        }
    }
}

/// JSON Schema of the card function's arguments for `goal`.
///
/// Strict-mode shape: every object closes its properties and lists all of
/// them as required; the optional conclusion is a nullable string.
pub fn card_parameters(goal: &Goal) -> Value {
    let string = || json!({"type": "string"});
    let list = |item: Value| json!({"type": "array", "items": item});

    let mut card = Map::new();
    card.insert("title".into(), string());
    match goal {
        Goal::GeneralSummary | Goal::Podcast { .. } => {
            card.insert("main_points".into(), list(string()));
            card.insert(
                "key_highlights".into(),
                list(closed_object(&[("highlight", string()), ("details", string())])),
            );
        }
        Goal::KeyInsights => {
            card.insert(
                "insights".into(),
                list(closed_object(&[("insight", string()), ("impact", string())])),
            );
        }
        Goal::ActionItems => {
            let priority = json!({"type": "string", "enum": ["High", "Medium", "Low"]});
            card.insert(
                "priority_actions".into(),
                list(closed_object(&[
                    ("action", string()),
                    ("priority", priority),
                    ("timeline", string()),
                ])),
            );
        }
        Goal::TopicAnalysis => {
            card.insert(
                "key_themes".into(),
                list(closed_object(&[("theme", string()), ("analysis", string())])),
            );
        }
        Goal::Recommendations => {
            card.insert(
                "recommendations".into(),
                list(closed_object(&[
                    ("recommendation", string()),
                    ("rationale", string()),
                    ("implementation", string()),
                ])),
            );
        }
        Goal::Custom { .. } => {
            card.insert(
                "custom_analysis".into(),
                list(closed_object(&[("heading", string()), ("content", string())])),
            );
        }
    }
    card.insert("conclusion".into(), json!({"type": ["string", "null"]}));

    let required: Vec<String> = card.keys().cloned().collect();
    json!({
        "type": "object",
        "properties": card,
        "required": required,
        "additionalProperties": false
    })
}

fn closed_object(fields: &[(&str, Value)]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, schema)| (name.to_string(), schema.clone()))
        .collect();
    let required: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

// ── Card shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GeneralCard {
    main_points: Vec<String>,
    key_highlights: Vec<Highlight>,
}

#[derive(Deserialize)]
struct Highlight {
    highlight: String,
    #[serde(default)]
    details: String,
}

#[derive(Deserialize)]
struct InsightsCard {
    insights: Vec<Insight>,
}

#[derive(Deserialize)]
struct Insight {
    insight: String,
    #[serde(default)]
    impact: String,
}

#[derive(Deserialize)]
struct ActionsCard {
    priority_actions: Vec<Action>,
}

#[derive(Deserialize)]
struct Action {
    action: String,
    #[serde(default)]
    priority: String,
    #[serde(default)]
    timeline: String,
}

#[derive(Deserialize)]
struct ThemesCard {
    key_themes: Vec<Theme>,
}

#[derive(Deserialize)]
struct Theme {
    theme: String,
    #[serde(default)]
    analysis: String,
}

#[derive(Deserialize)]
struct RecommendationsCard {
    recommendations: Vec<Recommendation>,
}

#[derive(Deserialize)]
struct Recommendation {
    recommendation: String,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    implementation: String,
}

#[derive(Deserialize)]
struct CustomCard {
    custom_analysis: Vec<Section>,
}

#[derive(Deserialize)]
struct Section {
    heading: String,
    content: String,
}

/// Priority of an action item, parsed leniently from model text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
    Unspecified,
}

impl Priority {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            "low" => Priority::Low,
            _ => Priority::Unspecified,
        }
    }

    /// Border colour class of the action card.
    pub fn border_class(self) -> &'static str {
        match self {
            Priority::High => "border-red-500",
            Priority::Medium => "border-yellow-500",
            Priority::Low => "border-green-500",
            Priority::Unspecified => "border-gray-500",
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Render a card for `goal`. Never fails: unusable JSON gives the fallback card.
pub fn render_card(goal: &Goal, value: &Value) -> String {
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty());

    let body = title.and_then(|_| render_body(goal, value));
    match (title, body) {
        (Some(title), Some(body)) => {
            let mut html = String::new();
            let _ = write!(
                html,
                "<div class=\"summary-card\">\n<h2 class=\"text-2xl font-bold mb-4\">{}</h2>\n{}",
                escape_html(title),
                body
            );
            if let Some(conclusion) = value.get("conclusion").and_then(Value::as_str) {
                let _ = write!(
                    html,
                    "<div class=\"conclusion mb-4\"><p class=\"italic text-gray-700\">{}</p></div>\n",
                    escape_html(conclusion)
                );
            }
            html.push_str("</div>\n");
            html
        }
        _ => fallback_card(title.unwrap_or("Summary"), value),
    }
}

fn parse<T: DeserializeOwned>(value: &Value) -> Option<T> {
    serde_json::from_value(value.clone()).ok()
}

fn render_body(goal: &Goal, value: &Value) -> Option<String> {
    let mut html = String::new();
    match goal {
        Goal::GeneralSummary | Goal::Podcast { .. } => {
            let card: GeneralCard = parse(value)?;
            html.push_str("<div class=\"main-points mb-6\">\n<h3 class=\"text-lg font-semibold mb-2\">Main Points</h3>\n<ul class=\"list-disc pl-5 space-y-2\">\n");
            for point in &card.main_points {
                let _ = writeln!(html, "<li>{}</li>", escape_html(point));
            }
            html.push_str("</ul>\n</div>\n");
            open_section(&mut html, "key-highlights", "Key Highlights");
            for h in &card.key_highlights {
                item(&mut html, "highlight-card", "", &h.highlight, &[&h.details]);
            }
            close_section(&mut html);
        }
        Goal::KeyInsights => {
            let card: InsightsCard = parse(value)?;
            open_section(&mut html, "insights", "Key Insights");
            for i in &card.insights {
                let impact = format!("Impact: {}", i.impact);
                item(&mut html, "insight-card", "", &i.insight, &[&impact]);
            }
            close_section(&mut html);
        }
        Goal::ActionItems => {
            let card: ActionsCard = parse(value)?;
            open_section(&mut html, "action-items", "Priority Actions");
            for a in &card.priority_actions {
                let border = format!(" border-l-4 {}", Priority::parse(&a.priority).border_class());
                let priority = format!("Priority: {}", a.priority);
                let timeline = format!("Timeline: {}", a.timeline);
                item(&mut html, "action-card", &border, &a.action, &[&priority, &timeline]);
            }
            close_section(&mut html);
        }
        Goal::TopicAnalysis => {
            let card: ThemesCard = parse(value)?;
            open_section(&mut html, "themes", "Key Themes");
            for t in &card.key_themes {
                item(&mut html, "theme-card", "", &t.theme, &[&t.analysis]);
            }
            close_section(&mut html);
        }
        Goal::Recommendations => {
            let card: RecommendationsCard = parse(value)?;
            open_section(&mut html, "recommendations", "Recommendations");
            for r in &card.recommendations {
                let rationale = format!("Rationale: {}", r.rationale);
                let implementation = format!("Implementation: {}", r.implementation);
                item(
                    &mut html,
                    "recommendation-card",
                    "",
                    &r.recommendation,
                    &[&rationale, &implementation],
                );
            }
            close_section(&mut html);
        }
        Goal::Custom { .. } => {
            let card: CustomCard = parse(value)?;
            html.push_str("<div class=\"custom-analysis\">\n");
            for s in &card.custom_analysis {
                let _ = write!(
                    html,
                    "<div class=\"mb-4\">\n<h3 class=\"text-lg font-semibold mb-2\">{}</h3>\n<p class=\"text-gray-700\">{}</p>\n</div>\n",
                    escape_html(&s.heading),
                    escape_html(&s.content)
                );
            }
            html.push_str("</div>\n");
        }
    }
    Some(html)
}

fn open_section(html: &mut String, class: &str, heading: &str) {
    let _ = write!(
        html,
        "<div class=\"{class} mb-6\">\n<h3 class=\"text-lg font-semibold mb-2\">{heading}</h3>\n<div class=\"space-y-4\">\n"
    );
}

fn close_section(html: &mut String) {
    html.push_str("</div>\n</div>\n");
}

fn item(html: &mut String, class: &str, extra_class: &str, lead: &str, lines: &[&str]) {
    let _ = write!(
        html,
        "<div class=\"{class} bg-gray-50 p-4 rounded-lg{extra_class}\">\n<p class=\"font-medium text-indigo-600\">{}</p>\n",
        escape_html(lead)
    );
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(html, "<p class=\"text-gray-600 mt-1\">{}</p>", escape_html(line));
    }
    html.push_str("</div>\n");
}

fn fallback_card(title: &str, value: &Value) -> String {
    format!(
        "<div class=\"summary-card\">\n<h2 class=\"text-2xl font-bold mb-4\">{}</h2>\n<div class=\"content mb-6\">\n<p class=\"text-gray-600\">{}</p>\n</div>\n</div>\n",
        escape_html(title),
        escape_html(&value.to_string())
    )
}

/// Card built from the script alone, one paragraph per segment.
pub fn plain_card(script: &str) -> String {
    let mut html = String::from(
        "<div class=\"summary-card\">\n<h2 class=\"text-2xl font-bold mb-4\">Summary</h2>\n<div class=\"content mb-6\">\n",
    );
    for segment in split_script(script) {
        let _ = writeln!(html, "<p class=\"text-gray-700 mb-2\">{}</p>", escape_html(&segment));
    }
    html.push_str("</div>\n</div>\n");
    html
}

/// Slice from the first `{` to the last `}`; tolerates fences and chatter.
fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::service::{AudioCompletion, AudioRequest, TextCompletion, ToolCompletion};
    use std::sync::Mutex;

    #[test]
    fn action_items_get_priority_colours() {
        let value = json!({
            "title": "Next steps",
            "priority_actions": [
                {"action": "Renew licence", "priority": "High", "timeline": "this week"},
                {"action": "Tidy wiki", "priority": "low", "timeline": "Q3"},
                {"action": "Think", "priority": "someday", "timeline": "?"}
            ]
        });
        let html = render_card(&Goal::ActionItems, &value);
        assert!(html.contains("border-red-500"));
        assert!(html.contains("border-green-500"));
        assert!(html.contains("border-gray-500"));
        assert!(html.contains("Timeline: this week"));
    }

    #[test]
    fn model_text_is_escaped() {
        let value = json!({
            "title": "<script>alert(1)</script>",
            "main_points": ["a & b"],
            "key_highlights": []
        });
        let html = render_card(&Goal::GeneralSummary, &value);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn missing_fields_fall_back() {
        let value = json!({"title": "Insights", "wrong_field": 1});
        let html = render_card(&Goal::KeyInsights, &value);
        assert!(html.contains("Insights"));
        assert!(html.contains("wrong_field"));
        assert!(!html.contains("Key Insights"));
    }

    #[test]
    fn conclusion_is_optional() {
        let with = json!({"title": "T", "key_themes": [], "conclusion": "Done."});
        let without = json!({"title": "T", "key_themes": []});
        assert!(render_card(&Goal::TopicAnalysis, &with).contains("Done."));
        assert!(!render_card(&Goal::TopicAnalysis, &without).contains("conclusion"));
    }

    #[test]
    fn custom_sections_render() {
        let goal = Goal::Custom {
            instruction: "Compare vendors".into(),
        };
        let value = json!({
            "title": "Vendors",
            "custom_analysis": [{"heading": "Pricing", "content": "A is cheaper."}]
        });
        let html = render_card(&goal, &value);
        assert!(html.contains("Pricing"));
        assert!(html.contains("A is cheaper."));
    }

    #[test]
    fn plain_card_has_one_paragraph_per_segment() {
        let html = plain_card("First. === Page Break === Second <b>.");
        assert_eq!(html.matches("<p ").count(), 2);
        assert!(html.contains("Second &lt;b&gt;."));
    }

    #[test]
    fn json_object_tolerates_fences() {
        assert_eq!(json_object("```json\n{\"a\": 1}\n```"), Some("{\"a\": 1}"));
        assert_eq!(json_object("no json here"), None);
    }

    struct CardModel(String);

    #[async_trait]
    impl CompletionService for CardModel {
        async fn complete_text(
            &self,
            request: &TextRequest,
        ) -> Result<TextCompletion, CompletionError> {
            assert!(request.system.contains("\"insights\""));
            Ok(TextCompletion {
                content: self.0.clone(),
                ..Default::default()
            })
        }

        async fn complete_audio(
            &self,
            _request: &AudioRequest,
        ) -> Result<AudioCompletion, CompletionError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn card_formatter_renders_model_json() {
        let model = CardModel(
            "Here you go:\n{\"title\": \"Findings\", \"insights\": [{\"insight\": \"Costs fell\", \"impact\": \"Margin up\"}]}"
                .into(),
        );
        let formatter = CardFormatter::new(Arc::new(model));
        let profile = RequestProfile {
            goal: Goal::KeyInsights,
            ..Default::default()
        };
        let html = formatter.format("script", &profile).await.unwrap();
        assert!(html.contains("Findings"));
        assert!(html.contains("Impact: Margin up"));
    }

    /// Answers card calls with a function call, as tool-capable models do.
    struct ToolModel {
        arguments: String,
        seen: Mutex<Option<ToolRequest>>,
    }

    #[async_trait]
    impl CompletionService for ToolModel {
        async fn complete_text(
            &self,
            _request: &TextRequest,
        ) -> Result<TextCompletion, CompletionError> {
            unreachable!("card calls go through the card function")
        }

        async fn complete_tool(
            &self,
            request: &ToolRequest,
        ) -> Result<ToolCompletion, CompletionError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(ToolCompletion {
                arguments: Some(self.arguments.clone()),
                content: String::new(),
                ..Default::default()
            })
        }

        async fn complete_audio(
            &self,
            _request: &AudioRequest,
        ) -> Result<AudioCompletion, CompletionError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn card_formatter_uses_function_call_arguments() {
        let model = Arc::new(ToolModel {
            arguments: r#"{"title": "Next steps", "priority_actions": [{"action": "Renew licence", "priority": "High", "timeline": "May"}], "conclusion": null}"#.into(),
            seen: Mutex::new(None),
        });
        let formatter = CardFormatter::new(model.clone());
        let profile = RequestProfile {
            goal: Goal::ActionItems,
            ..Default::default()
        };

        let html = formatter.format("script", &profile).await.unwrap();
        assert!(html.contains("Next steps"));
        assert!(html.contains("border-red-500"));
        assert!(!html.contains("conclusion"));

        let seen = model.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.name, CARD_TOOL);
        assert_eq!(seen.text.user, "script");
        assert_eq!(seen.parameters, card_parameters(&Goal::ActionItems));
    }

    #[test]
    fn card_parameters_are_closed_and_fully_required() {
        let schema = card_parameters(&Goal::ActionItems);
        assert_eq!(schema["additionalProperties"], false);
        let mut required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        required.sort_unstable();
        assert_eq!(required, ["conclusion", "priority_actions", "title"]);

        let action = &schema["properties"]["priority_actions"]["items"];
        assert_eq!(action["additionalProperties"], false);
        assert_eq!(action["required"], json!(["action", "priority", "timeline"]));
        assert_eq!(
            action["properties"]["priority"]["enum"],
            json!(["High", "Medium", "Low"])
        );
        assert_eq!(
            schema["properties"]["conclusion"]["type"],
            json!(["string", "null"])
        );
    }

    #[tokio::test]
    async fn card_formatter_reports_non_json() {
        let formatter = CardFormatter::new(Arc::new(CardModel("no card today".into())));
        let profile = RequestProfile {
            goal: Goal::KeyInsights,
            ..Default::default()
        };
        assert!(formatter.format("script", &profile).await.is_err());
    }
}
