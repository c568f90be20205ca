//! Draft generation: turns free-text intake into a structured request draft.
//!
//! The language-model path is best-effort with a bounded timeout; any
//! failure (timeout, transport, bad status, unparseable output) falls back
//! deterministically to the keyword heuristics. Callers never see the
//! external failure, only a lower confidence score.

pub mod client;
pub mod heuristics;
pub mod sanitize;

use serde::Serialize;

use crate::models::request::{Category, Item, Urgency};
use self::client::LlmConfig;

pub const LLM_CONFIDENCE: f64 = 0.8;
pub const FALLBACK_CONFIDENCE: f64 = 0.55;

/// Structured draft consumed at request-creation time.
#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    pub category: Category,
    pub urgency_window: Urgency,
    pub severity: i64,
    pub items: Vec<Item>,
    pub estimated_total: f64,
    pub notes: String,
}

/// Produce a draft and a confidence score for the given free text.
pub async fn generate_draft(
    http: &reqwest::Client,
    cfg: &LlmConfig,
    text: &str,
) -> (Draft, f64) {
    let Some(api_key) = cfg.api_key.as_deref() else {
        return (heuristics::fallback_draft(text), FALLBACK_CONFIDENCE);
    };

    match client::call_model(http, cfg, api_key, text).await {
        Ok(raw) => (sanitize::clamp_draft(&raw), LLM_CONFIDENCE),
        Err(e) => {
            log::warn!("draft generation failed ({e}), using heuristic fallback");
            (heuristics::fallback_draft(text), FALLBACK_CONFIDENCE)
        }
    }
}
