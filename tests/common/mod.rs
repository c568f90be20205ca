//! Shared test infrastructure: temp-dir SQLite databases and request
//! payload builders.

#![allow(dead_code)]

use tempfile::TempDir;

use aidline::db::{self, DbPool};
use aidline::models::request::{Category, CreateRequestIn, Item, LatLng, Urgency};

/// Setup a pooled test database with the schema applied.
///
/// Returns (TempDir, DbPool); the TempDir must be kept alive for the pool
/// to remain valid. The pool hands out multiple connections, which the
/// concurrency tests rely on.
pub fn setup_test_db() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = db::init_pool(db_path.to_str().expect("utf-8 temp path"));
    db::run_migrations(&pool);
    (dir, pool)
}

/// A valid creation payload with the given cost split.
pub fn sample_request(estimated_total: f64, requester_afford: f64) -> CreateRequestIn {
    CreateRequestIn {
        raw_text: "need groceries: rice, milk".to_string(),
        category: Category::Groceries,
        urgency_window: Urgency::Today,
        severity: 3,
        items: vec![Item {
            name: "rice".to_string(),
            qty: 2.0,
            unit: "kg".to_string(),
            notes: String::new(),
        }],
        estimated_total,
        requester_afford,
        location: LatLng { lat: 59.91, lng: 10.75 },
    }
}

/// Same payload at a caller-chosen location (for bbox tests).
pub fn sample_request_at(lat: f64, lng: f64) -> CreateRequestIn {
    let mut input = sample_request(100.0, 0.0);
    input.location = LatLng { lat, lng };
    input
}
