//! Tolerant parsing of model output into script drafts.
//!
//! The model is asked for one fenced JSON block, but the block may be missing,
//! malformed, or only partly filled in. Parsing yields a [`ScriptDraft`] or a
//! [`ParseError`] that the generation stage turns into its fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static JSON_FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?i:json)[ \t]*\r?\n?(.*?)```").expect("json fence pattern is valid")
});
static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});
static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*").expect("fence marker pattern is valid"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is valid"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("italic pattern is valid"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#+[ \t]+").expect("heading pattern is valid"));
static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"));
static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("space pattern is valid"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("response contains no JSON")]
    NoJson,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("script has no body")]
    MissingBody,
    #[error("response has no usable videos")]
    NoVideos,
}

/// A script as read from the model, before defaults are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDraft {
    pub title: Option<String>,
    pub hashtags: Option<String>,
    pub description: Option<String>,
    /// Sanitized script body, never empty.
    pub body: String,
    /// Article ids the model claims the script draws on (batch mode only).
    pub source_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Hashtags {
    Text(String),
    List(Vec<String>),
}

impl Hashtags {
    fn into_text(self) -> String {
        match self {
            Hashtags::Text(s) => s.trim().to_string(),
            Hashtags::List(tags) => tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| {
                    if t.starts_with('#') {
                        t.to_string()
                    } else {
                        format!("#{t}")
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawScript {
    #[serde(default, alias = "judul")]
    title: Option<String>,
    #[serde(default, alias = "hashtag")]
    hashtags: Option<Hashtags>,
    #[serde(default, alias = "deskripsi")]
    description: Option<String>,
    #[serde(default, alias = "konten")]
    body: Option<String>,
    #[serde(default)]
    source_ids: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchPayload {
    Wrapped { videos: Vec<Value> },
    List(Vec<Value>),
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RawScript {
    fn into_draft(self) -> Result<ScriptDraft, ParseError> {
        let body = self.body.as_deref().map(sanitize_body).unwrap_or_default();
        if body.is_empty() {
            return Err(ParseError::MissingBody);
        }
        Ok(ScriptDraft {
            title: non_empty(self.title),
            hashtags: non_empty(self.hashtags.map(Hashtags::into_text)),
            description: non_empty(self.description),
            body,
            source_ids: self
                .source_ids
                .unwrap_or_default()
                .iter()
                .filter_map(|v| {
                    v.as_i64()
                        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                })
                .collect(),
        })
    }
}

/// Contents of the first ```` ```json ```` block, else of the first fenced block of
/// any language.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    JSON_FENCED
        .captures(text)
        .or_else(|| FENCED.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// JSON candidate: the fenced block, or the whole response when it looks like JSON.
fn json_candidate(text: &str) -> Result<&str, ParseError> {
    if let Some(block) = extract_fenced_block(text) {
        return Ok(block);
    }
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Ok(trimmed)
    } else {
        Err(ParseError::NoJson)
    }
}

/// Remove fence markers but keep everything between them.
pub fn strip_fences(text: &str) -> String {
    FENCE_MARKER.replace_all(text, "").into_owned()
}

/// Strip markdown emphasis, headings and inline hashtags, then normalise whitespace.
/// Paragraph breaks survive as a single blank line.
pub fn sanitize_body(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = HASHTAG.replace_all(&text, "");

    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_RUN.replace_all(&joined, "\n\n").trim().to_string()
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Parse a one-script response.
pub fn parse_single(text: &str) -> Result<ScriptDraft, ParseError> {
    let json = json_candidate(text)?;
    let raw: RawScript =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    raw.into_draft()
}

/// Parse a multi-script response. Entries without a title or body are dropped;
/// an error means nothing usable survived.
pub fn parse_batch(text: &str) -> Result<Vec<ScriptDraft>, ParseError> {
    let json = json_candidate(text)?;
    let payload: BatchPayload =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let entries = match payload {
        BatchPayload::Wrapped { videos } => videos,
        BatchPayload::List(list) => list,
    };

    let drafts: Vec<ScriptDraft> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawScript>(entry) {
            Ok(raw) => raw.into_draft().ok(),
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed video entry");
                None
            }
        })
        .filter(|draft| draft.title.is_some())
        .collect();

    if drafts.is_empty() {
        Err(ParseError::NoVideos)
    } else {
        Ok(drafts)
    }
}
