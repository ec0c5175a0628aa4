//! Deterministic cleanup of model-generated text.
//!
//! Vision transcripts and narration scripts come back with the usual model
//! quirks: an outer code fence despite instructions, Windows line endings,
//! trailing spaces, runs of blank lines, placeholder image links and
//! invisible Unicode. The script additionally loses its Markdown emphasis
//! and heading markers, which the audio model would otherwise read aloud.
//!
//! Rules run in a fixed order: fences are stripped before line endings are
//! normalised, and blank lines are collapsed after trailing whitespace is
//! gone so whitespace-only lines count as blank. None of the rules touch the
//! `=== Page Break ===` marker.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cleanup applied to every page transcript from the vision model.
pub fn clean_model_text(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = replace_image_links(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

/// Cleanup applied to the narration script before it is split and read.
pub fn clean_script(input: &str) -> String {
    let s = clean_model_text(input);
    let s = strip_heading_markers(&s);
    strip_emphasis(&s)
}

// ── Fences ───────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Whitespace ───────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Images ───────────────────────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").unwrap());

/// `![alt](url)` becomes `alt`; nothing in a narration can show an image.
fn replace_image_links(input: &str) -> String {
    RE_IMAGE
        .replace_all(input, |caps: &regex::Captures<'_>| caps[1].trim().to_string())
        .to_string()
}

// ── Invisible characters ─────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Markdown markers ─────────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+").unwrap());

fn strip_heading_markers(input: &str) -> String {
    RE_HEADING.replace_all(input, "").to_string()
}

static RE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__").unwrap());

fn strip_emphasis(input: &str) -> String {
    RE_EMPHASIS
        .replace_all(input, |caps: &regex::Captures<'_>| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .to_string()
}
