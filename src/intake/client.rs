use serde_json::{Value, json};
use std::fmt;

/// Connection settings for the draft-generation model. `api_key = None`
/// disables the external call entirely.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
}

/// Failure of the external draft-generation call. Never surfaces to API
/// callers; `generate_draft` recovers with the heuristic fallback.
#[derive(Debug)]
pub enum DraftError {
    Http(reqwest::Error),
    Status(reqwest::StatusCode),
    Unparseable(String),
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::Http(e) => write!(f, "transport error: {e}"),
            DraftError::Status(code) => write!(f, "model endpoint returned {code}"),
            DraftError::Unparseable(msg) => write!(f, "unparseable model output: {msg}"),
        }
    }
}

impl From<reqwest::Error> for DraftError {
    fn from(e: reqwest::Error) -> Self {
        DraftError::Http(e)
    }
}

const SYSTEM_PROMPT: &str = r#"You are an intake parser for a crisis mutual-aid app.
Return ONLY JSON with this schema:
{
  "category": "meds|groceries|shelter|transport|other",
  "urgency_window": "now|today|week",
  "severity": 1-5,
  "items": [{"name": "...", "qty": number, "unit": "unit", "notes": ""}],
  "estimated_total": number
}
Rules:
- Be conservative and realistic.
- estimated_total must be between 5 and 250.
- If uncertain: category="other", urgency_window="today", severity=2, items=[...], estimated_total reasonable.
"#;

/// Call the generateContent endpoint and extract the draft JSON from the
/// reply. The request timeout is bounded by the shared client's timeout.
pub async fn call_model(
    client: &reqwest::Client,
    cfg: &LlmConfig,
    api_key: &str,
    text: &str,
) -> Result<Value, DraftError> {
    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
        cfg.model
    );
    let full_prompt =
        format!("{SYSTEM_PROMPT}\n\nUser text:\n{text}\n\nReturn ONLY the JSON object.");
    let body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": full_prompt }] }],
        "generationConfig": { "temperature": 0.2 }
    });

    let resp = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(DraftError::Status(resp.status()));
    }
    let data: Value = resp.json().await?;

    let reply = data
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| DraftError::Unparseable("missing candidate text".to_string()))?;
    extract_json(reply)
}

/// Lenient parse: the model sometimes wraps the JSON in prose, so take the
/// first top-level `{...}` block. Hard failure when none is present.
pub fn extract_json(text: &str) -> Result<Value, DraftError> {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&trimmed[start..=end])
                .map_err(|e| DraftError::Unparseable(e.to_string()))
        }
        _ => Err(DraftError::Unparseable(
            "no JSON object found in model output".to_string(),
        )),
    }
}
