//! Pure priority-scoring functions: deterministic, no state, no I/O.
//! Callers pass `now` explicitly so a batch recompute uses one consistent
//! clock reading instead of caching age anywhere.

use chrono::{DateTime, Utc};

use crate::models::request::Urgency;

/// Round to 2 decimals (money amounts).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 3 decimals (rank scores).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Residual amount a request needs after the requester's own contribution.
pub fn compute_funding_goal(estimated_total: f64, requester_afford: f64) -> f64 {
    round2(estimated_total - requester_afford).max(0.0)
}

/// funded / goal clamped to [0, 1]; a zero (or negative) goal counts as fully funded.
pub fn progress_ratio(funded: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 1.0;
    }
    (funded / goal).clamp(0.0, 1.0)
}

pub fn urgency_weight(urgency: Urgency) -> f64 {
    match urgency {
        Urgency::Now => 1.0,
        Urgency::Today => 0.7,
        Urgency::Week => 0.3,
    }
}

/// Severity 1..=5 normalized to 0..=1.
pub fn severity_weight(severity: i64) -> f64 {
    (severity - 1) as f64 / 4.0
}

pub fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - created_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0)
}

/// Deterministic priority in [0, 1], rounded to 3 decimals.
///
/// Urgency and severity (intrinsic need) dominate; funding gap and age are
/// tie-breakers. Age saturates after 6 hours so waiting alone can never
/// outrank urgency or severity.
pub fn rank_score(
    urgency: Urgency,
    severity: i64,
    progress: f64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let u = urgency_weight(urgency);
    let s = severity_weight(severity);
    let gap = 1.0 - progress;
    let a = (age_hours(created_at, now) / 6.0).min(1.0);
    let score = 0.45 * u + 0.25 * s + 0.20 * gap + 0.10 * a;
    round3(score.clamp(0.0, 1.0))
}

/// Short human-readable explanation for the score: up to 3 tags in a fixed
/// order, derived from the same inputs as the score.
pub fn rank_reason(
    urgency: Urgency,
    severity: i64,
    progress: f64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String {
    let mut parts: Vec<&str> = Vec::new();
    match urgency {
        Urgency::Now => parts.push("time-critical"),
        Urgency::Today => parts.push("needed today"),
        Urgency::Week => {}
    }
    if severity >= 4 {
        parts.push("high severity");
    }
    if progress < 0.5 {
        parts.push("large funding gap");
    }
    if age_hours(created_at, now) >= 2.0 {
        parts.push("waiting for help");
    }
    if parts.is_empty() {
        parts.push("general need");
    }
    parts.truncate(3);
    parts.join(", ")
}
