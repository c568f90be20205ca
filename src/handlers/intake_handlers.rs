use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::intake;
use crate::intake::client::LlmConfig;
use crate::models::request::LatLng;
use crate::triage::round2;

#[derive(Debug, Deserialize)]
pub struct AiInvokeIn {
    pub text: String,
    pub location: LatLng,
    pub requester_afford: f64,
}

/// POST /v1/ai/invoke - Turn free text into a structured request draft.
///
/// External model failures never reach the caller: the heuristic fallback
/// answers instead, visible only through the lower confidence score.
pub async fn invoke(
    http: web::Data<reqwest::Client>,
    llm: web::Data<LlmConfig>,
    payload: web::Json<AiInvokeIn>,
) -> Result<HttpResponse, ApiError> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("text is required".to_string()));
    }
    if text.chars().count() > 500 {
        return Err(ApiError::Validation("text must be at most 500 characters".to_string()));
    }
    if !(0.0..=10000.0).contains(&payload.requester_afford) {
        return Err(ApiError::Validation(
            "requester_afford must be between 0 and 10000".to_string(),
        ));
    }

    let (draft, confidence) = intake::generate_draft(&http, &llm, text).await;

    // The frontend fills the creation form from the draft and needs the
    // affordability echoed back alongside it.
    let mut draft_json = serde_json::to_value(&draft)?;
    draft_json["requester_afford"] = json!(round2(payload.requester_afford));

    Ok(HttpResponse::Ok().json(json!({
        "request_draft": draft_json,
        "confidence": confidence,
    })))
}
