//! HTTP surface tests: route wiring, header handling, and the exact error
//! bodies and status codes existing clients depend on.

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, Error, test, web};
use serde_json::{Value, json};

use aidline::db::DbPool;
use aidline::handlers;
use aidline::intake::client::LlmConfig;

mod common;
use common::setup_test_db;

fn test_app(
    pool: DbPool,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = Error,
        InitError = (),
    >,
> {
    let llm = LlmConfig {
        api_key: None,
        model: "gemini-2.5-flash".to_string(),
    };
    App::new()
        .app_data(web::Data::new(pool))
        .app_data(web::Data::new(reqwest::Client::new()))
        .app_data(web::Data::new(llm))
        .configure(handlers::configure)
}

fn create_payload() -> Value {
    json!({
        "raw_text": "need groceries: rice, milk",
        "category": "groceries",
        "urgency_window": "today",
        "severity": 3,
        "items": [{"name": "rice", "qty": 2, "unit": "kg", "notes": ""}],
        "estimated_total": 100.0,
        "requester_afford": 30.0,
        "location": {"lat": 59.91, "lng": 10.75}
    })
}

#[actix_web::test]
async fn device_endpoint_issues_token() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    let resp = test::call_service(&app, test::TestRequest::post().uri("/v1/device").to_request()).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    let token = body["device_token"].as_str().expect("token");
    assert!(token.starts_with("dev_"));
    assert_eq!(token.len(), 4 + 32);
}

#[actix_web::test]
async fn mutations_require_device_token() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/v1/requests")
            .set_json(create_payload())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Missing X-Device-Token");
}

#[actix_web::test]
async fn invalid_id_and_bbox_are_bad_requests() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/v1/requests/not-a-number").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "invalid id");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/v1/requests?bbox=1,2,3").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "bbox must be minLat,minLng,maxLat,maxLng");
}

#[actix_web::test]
async fn unknown_status_filter_is_a_bad_request() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/v1/requests?status=bogus").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "invalid status");
}

#[actix_web::test]
async fn full_flow_over_http() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    // create
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/v1/requests")
            .insert_header(("X-Device-Token", "dev_requester"))
            .set_json(create_payload())
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    let id = body["request"]["id"].as_str().expect("id").to_string();
    assert_eq!(body["request"]["status"], "open");
    assert_eq!(body["request"]["funding_goal"], 70.0);
    assert_eq!(body["request"]["funded_amount"], 0.0);

    // listed card carries the wire field names
    let resp = test::call_service(&app, test::TestRequest::get().uri("/v1/requests").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    let card = &body["requests"][0];
    for key in [
        "id", "category", "urgency_window", "severity", "status", "lat", "lng",
        "estimated_total", "requester_afford", "funding_goal", "funded_amount",
        "progress", "rank_score",
    ] {
        assert!(card.get(key).is_some(), "card missing {key}");
    }

    // donate to the goal
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/v1/requests/{id}/donate"))
            .insert_header(("X-Device-Token", "dev_donor"))
            .set_json(json!({"amount": 70.0}))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["request"]["status"], "funded");
    assert_eq!(body["request"]["progress"], 1.0);

    // claim
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/v1/requests/{id}/claim"))
            .insert_header(("X-Device-Token", "dev_helper"))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["request"]["status"], "claimed");
    assert_eq!(body["request"]["claim"]["helper_id"], "dev_helper");

    // racing claim loses with the documented body
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/v1/requests/{id}/claim"))
            .insert_header(("X-Device-Token", "dev_other"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "not_claimable");

    // donation past the claim is rejected with the original 404 body
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/v1/requests/{id}/donate"))
            .insert_header(("X-Device-Token", "dev_late"))
            .set_json(json!({"amount": 5.0}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "request not open/fundable");

    // delivery by a non-claimant is forbidden
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/v1/requests/{id}/delivered"))
            .insert_header(("X-Device-Token", "dev_other"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "not_claiming_helper");

    // delivery by the claim holder completes the lifecycle
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/v1/requests/{id}/delivered"))
            .insert_header(("X-Device-Token", "dev_helper"))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["request"]["status"], "delivered");

    // detail keeps the claim visible in the terminal state
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/v1/requests/{id}"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["request"]["status"], "delivered");
    assert_eq!(body["request"]["claim"]["helper_id"], "dev_helper");
    assert_eq!(body["request"]["rank_reason"].as_str().map(str::is_empty), Some(false));
}

#[actix_web::test]
async fn unknown_request_is_not_found() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/v1/requests/424242").to_request(),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "not found");
}

#[actix_web::test]
async fn ai_invoke_falls_back_without_key() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool)).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/v1/ai/invoke")
            .set_json(json!({
                "text": "need insulin ASAP, no money",
                "location": {"lat": 59.91, "lng": 10.75},
                "requester_afford": 12.0
            }))
            .to_request(),
    )
    .await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["confidence"], 0.55);
    assert_eq!(body["request_draft"]["category"], "meds");
    assert_eq!(body["request_draft"]["urgency_window"], "now");
    assert_eq!(body["request_draft"]["severity"], 5);
    assert_eq!(body["request_draft"]["requester_afford"], 12.0);
}

#[actix_web::test]
async fn ai_rank_reports_updated_count() {
    let (_dir, pool) = setup_test_db();
    let app = test::init_service(test_app(pool.clone())).await;

    let conn = pool.get().expect("conn");
    for _ in 0..3 {
        aidline::lifecycle::create(&conn, "dev_a", &common::sample_request(100.0, 0.0))
            .expect("create");
    }

    let resp =
        test::call_service(&app, test::TestRequest::post().uri("/v1/ai/rank").to_request()).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["updated"], 3);
}
