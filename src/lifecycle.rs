//! Request lifecycle: open → funded → claimed → delivered (or cancelled).
//!
//! Every mutation here is resolved through a single conditional UPDATE in
//! `models::request`, so the guarantees hold across processes sharing the
//! same database with no in-process locks. A rejected mutation leaves the
//! persisted row completely unchanged.

use chrono::Utc;
use rusqlite::Connection;

use crate::errors::ApiError;
use crate::models::donation;
use crate::models::request::{self, CreateRequestIn, NewRequest, Request, Status};
use crate::triage;

const MAX_TEXT_LEN: usize = 500;
const MAX_ITEMS: usize = 6;
const MAX_ITEM_NAME_LEN: usize = 60;
const MAX_ITEM_UNIT_LEN: usize = 30;
const MAX_ITEM_NOTES_LEN: usize = 120;
const MAX_AMOUNT: f64 = 2000.0;

/// Validate a creation payload. Returns the first problem found, if any.
fn validate_create(input: &CreateRequestIn) -> Option<String> {
    let text = input.raw_text.trim();
    if text.is_empty() {
        return Some("raw_text is required".to_string());
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Some(format!("raw_text must be at most {MAX_TEXT_LEN} characters"));
    }
    if !(1..=5).contains(&input.severity) {
        return Some("severity must be between 1 and 5".to_string());
    }
    if input.items.len() > MAX_ITEMS {
        return Some(format!("at most {MAX_ITEMS} items allowed"));
    }
    for item in &input.items {
        if item.name.trim().is_empty() {
            return Some("item name is required".to_string());
        }
        if item.name.chars().count() > MAX_ITEM_NAME_LEN {
            return Some(format!("item name must be at most {MAX_ITEM_NAME_LEN} characters"));
        }
        if item.unit.chars().count() > MAX_ITEM_UNIT_LEN {
            return Some(format!("item unit must be at most {MAX_ITEM_UNIT_LEN} characters"));
        }
        if item.notes.chars().count() > MAX_ITEM_NOTES_LEN {
            return Some(format!("item notes must be at most {MAX_ITEM_NOTES_LEN} characters"));
        }
        if item.qty < 0.0 {
            return Some("item qty must be non-negative".to_string());
        }
    }
    if !(0.0..=MAX_AMOUNT).contains(&input.estimated_total) {
        return Some(format!("estimated_total must be between 0 and {MAX_AMOUNT}"));
    }
    if !(0.0..=MAX_AMOUNT).contains(&input.requester_afford) {
        return Some(format!("requester_afford must be between 0 and {MAX_AMOUNT}"));
    }
    if !input.location.lat.is_finite() || !input.location.lng.is_finite() {
        return Some("location must have finite lat/lng".to_string());
    }
    None
}

/// Create a new request in status `open` with its funding goal and initial
/// rank computed.
pub fn create(conn: &Connection, device: &str, input: &CreateRequestIn) -> Result<Request, ApiError> {
    if let Some(msg) = validate_create(input) {
        return Err(ApiError::Validation(msg));
    }

    let estimated_total = triage::round2(input.estimated_total);
    let requester_afford = triage::round2(input.requester_afford);
    let funding_goal = triage::compute_funding_goal(estimated_total, requester_afford);
    let progress = triage::progress_ratio(0.0, funding_goal);

    let now = Utc::now();
    let rank_score = triage::rank_score(input.urgency_window, input.severity, progress, now, now);
    let rank_reason = triage::rank_reason(input.urgency_window, input.severity, progress, now, now);

    let id = request::insert(
        conn,
        &NewRequest {
            created_by: device,
            raw_text: input.raw_text.trim(),
            category: input.category,
            urgency_window: input.urgency_window,
            severity: input.severity,
            items: &input.items,
            location: input.location,
            estimated_total,
            requester_afford,
            funding_goal,
            progress,
            rank_score,
            rank_reason: &rank_reason,
            created_at: now,
        },
    )?;

    log::info!("request {id} created (goal {funding_goal:.2}, score {rank_score:.3})");
    request::find_by_id(conn, id)?.ok_or(ApiError::NotFound)
}

/// Apply a donation to a request.
///
/// The donation event is always recorded first (at-least-once audit trail),
/// then the amount is applied exactly once through the conditional increment:
/// "add to funded_amount iff the request is still open or funded at the
/// moment of the write". A second, separately guarded step recomputes
/// progress, status and rank; a brief lag between the two is acceptable,
/// funded_amount regressing is not.
pub fn donate(
    conn: &Connection,
    id: i64,
    donor: &str,
    amount: f64,
) -> Result<Request, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::Validation("amount must be positive".to_string()));
    }
    if amount > MAX_AMOUNT {
        return Err(ApiError::Validation(format!("amount must be at most {MAX_AMOUNT}")));
    }
    let amount = triage::round2(amount);

    let now = Utc::now();
    donation::insert(conn, id, donor, amount, now)?;

    if request::add_funding(conn, id, amount, now)? == 0 {
        if request::exists(conn, id)? {
            return Err(ApiError::NotFundable);
        }
        return Err(ApiError::NotFound);
    }

    let updated = request::find_by_id(conn, id)?.ok_or(ApiError::NotFound)?;
    let progress = triage::progress_ratio(updated.funded_amount, updated.funding_goal);

    let now = Utc::now();
    let score = triage::rank_score(
        updated.urgency_window,
        updated.severity,
        progress,
        updated.created_at,
        now,
    );
    let reason = triage::rank_reason(
        updated.urgency_window,
        updated.severity,
        progress,
        updated.created_at,
        now,
    );
    request::apply_funding_snapshot(conn, id, score, &reason, now)?;

    let current = request::find_by_id(conn, id)?.ok_or(ApiError::NotFound)?;
    if current.status == Status::Funded && updated.status != Status::Funded {
        log::info!("request {id} fully funded ({:.2})", current.funded_amount);
    }
    Ok(current)
}

/// Claim a funded, unclaimed request for one helper. Compare-and-set: under
/// concurrent attempts exactly one caller wins, the rest get Conflict.
pub fn claim(conn: &Connection, id: i64, helper: &str) -> Result<Request, ApiError> {
    let now = Utc::now();
    if request::set_claim(conn, id, helper, now)? == 0 {
        if request::exists(conn, id)? {
            return Err(ApiError::Conflict("not_claimable".to_string()));
        }
        return Err(ApiError::NotFound);
    }
    log::info!("request {id} claimed by {helper}");
    request::find_by_id(conn, id)?.ok_or(ApiError::NotFound)
}

/// Mark a claimed request delivered. Only the helper holding the claim may
/// do this; the status check rides on the same conditional write as claim.
pub fn mark_delivered(conn: &Connection, id: i64, helper: &str) -> Result<Request, ApiError> {
    let current = request::find_by_id(conn, id)?.ok_or(ApiError::NotFound)?;
    match &current.claim {
        Some(c) if c.helper_id == helper => {}
        _ => return Err(ApiError::Forbidden("not_claiming_helper".to_string())),
    }

    if request::set_delivered(conn, id, Utc::now())? == 0 {
        return Err(ApiError::Conflict("wrong_state".to_string()));
    }
    log::info!("request {id} delivered by {helper}");
    request::find_by_id(conn, id)?.ok_or(ApiError::NotFound)
}

/// Recompute rank_score/rank_reason for every open or funded request against
/// the current clock. Never touches funded_amount or status; a request
/// claimed while the batch runs is skipped by the row guard. Returns how
/// many rows were updated.
pub fn rerank(conn: &Connection) -> Result<usize, ApiError> {
    let rows = request::find_rankable(conn)?;
    let now = Utc::now();
    let mut updated = 0;
    for row in rows {
        let score =
            triage::rank_score(row.urgency_window, row.severity, row.progress, row.created_at, now);
        let reason =
            triage::rank_reason(row.urgency_window, row.severity, row.progress, row.created_at, now);
        updated += request::update_rank(conn, row.id, score, &reason, now)?;
    }
    log::info!("rerank refreshed {updated} requests");
    Ok(updated)
}
