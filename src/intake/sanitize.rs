//! Clamp and sanitize raw model output into a valid draft. The model is
//! untrusted: every field gets a default, a clamp, or both.

use serde_json::Value;

use super::Draft;
use crate::models::request::{Category, Item, Urgency};
use crate::triage::round2;

fn truncated(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Build a valid draft out of whatever the model returned.
///
/// Defaults on uncertainty: category "other", urgency "today", severity 2.
/// severity clamps to [1, 5], estimated_total to [5, 250], items to 6 with
/// bounded field lengths; the item list is never empty.
pub fn clamp_draft(raw: &Value) -> Draft {
    let category = raw
        .get("category")
        .and_then(Value::as_str)
        .and_then(Category::parse)
        .unwrap_or(Category::Other);
    let urgency_window = raw
        .get("urgency_window")
        .and_then(Value::as_str)
        .and_then(Urgency::parse)
        .unwrap_or(Urgency::Today);
    let severity = raw
        .get("severity")
        .and_then(Value::as_i64)
        .unwrap_or(2)
        .clamp(1, 5);
    let estimated_total = raw
        .get("estimated_total")
        .and_then(Value::as_f64)
        .unwrap_or(25.0);

    let mut items = Vec::new();
    if let Some(raw_items) = raw.get("items").and_then(Value::as_array) {
        for it in raw_items.iter().take(6) {
            let name = it
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or("");
            if name.is_empty() {
                continue;
            }
            items.push(Item {
                name: truncated(name, 60),
                qty: it.get("qty").and_then(Value::as_f64).unwrap_or(1.0),
                unit: truncated(it.get("unit").and_then(Value::as_str).unwrap_or("unit"), 30),
                notes: truncated(it.get("notes").and_then(Value::as_str).unwrap_or(""), 120),
            });
        }
    }
    if items.is_empty() {
        items.push(Item {
            name: category.as_str().to_string(),
            qty: 1.0,
            unit: "unit".to_string(),
            notes: String::new(),
        });
    }

    Draft {
        category,
        urgency_window,
        severity,
        items,
        estimated_total: round2(estimated_total.clamp(5.0, 250.0)),
        notes: String::new(),
    }
}
