//! Draft generation without an external model: the heuristic path answers
//! with the fallback confidence, and its drafts feed request creation.

use aidline::intake::{self, FALLBACK_CONFIDENCE, client::LlmConfig};
use aidline::lifecycle;
use aidline::models::request::{Category, CreateRequestIn, Status, Urgency};

mod common;
use common::setup_test_db;

fn offline_config() -> LlmConfig {
    LlmConfig {
        api_key: None,
        model: "gemini-2.5-flash".to_string(),
    }
}

#[tokio::test]
async fn insulin_scenario_uses_heuristics() {
    let http = reqwest::Client::new();
    let (draft, confidence) =
        intake::generate_draft(&http, &offline_config(), "need insulin ASAP, no money").await;

    assert_eq!(confidence, FALLBACK_CONFIDENCE);
    assert_eq!(draft.category, Category::Meds);
    assert_eq!(draft.urgency_window, Urgency::Now);
    assert_eq!(draft.severity, 5);
    assert!(draft.items.iter().any(|i| i.name.contains("insulin")));
    assert!((5.0..=250.0).contains(&draft.estimated_total));
}

#[tokio::test]
async fn generated_draft_feeds_request_creation() {
    let http = reqwest::Client::new();
    let (draft, _) = intake::generate_draft(
        &http,
        &offline_config(),
        "groceries today: rice, milk and bread",
    )
    .await;

    let (_dir, pool) = setup_test_db();
    let conn = pool.get().expect("conn");

    let input = CreateRequestIn {
        raw_text: "groceries today: rice, milk and bread".to_string(),
        category: draft.category,
        urgency_window: draft.urgency_window,
        severity: draft.severity,
        items: draft.items,
        estimated_total: draft.estimated_total,
        requester_afford: 10.0,
        location: aidline::models::request::LatLng { lat: 59.91, lng: 10.75 },
    };
    let created = lifecycle::create(&conn, "dev_a", &input).expect("create from draft");
    assert_eq!(created.status, Status::Open);
    assert_eq!(created.category, Category::Groceries);
    assert_eq!(
        created.funding_goal,
        aidline::triage::compute_funding_goal(created.estimated_total, 10.0)
    );
    assert!(created.items.iter().any(|i| i.name == "rice"));
}

#[tokio::test]
async fn draft_serializes_with_wire_field_names() {
    let http = reqwest::Client::new();
    let (draft, _) = intake::generate_draft(&http, &offline_config(), "need a ride today").await;

    let value = serde_json::to_value(&draft).expect("serialize");
    assert_eq!(value["category"], "transport");
    assert_eq!(value["urgency_window"], "today");
    assert!(value["severity"].is_i64());
    assert!(value["items"].is_array());
    assert!(value["estimated_total"].is_number());
    let item = &value["items"][0];
    assert!(item.get("name").is_some());
    assert!(item.get("qty").is_some());
    assert!(item.get("unit").is_some());
    assert!(item.get("notes").is_some());
}
