//! Keyword-heuristic draft generation: the deterministic fallback used when
//! no API key is configured or the model call fails.

use rand::Rng;

use super::Draft;
use crate::models::request::{Category, Item, Urgency};
use crate::triage::round2;

pub fn guess_category(text: &str) -> Category {
    let t = text.to_lowercase();
    let meds = ["insulin", "medicine", "meds", "prescription", "pharmacy", "antibiotic", "inhaler"];
    let groceries = ["grocer", "food", "rice", "milk", "bread", "eggs", "vegetable", "grocery"];
    let shelter = ["shelter", "evac", "no place", "homeless", "housing"];
    let transport = ["ride", "pickup", "drive", "car", "transport", "uber"];
    if meds.iter().any(|k| t.contains(k)) {
        return Category::Meds;
    }
    if groceries.iter().any(|k| t.contains(k)) {
        return Category::Groceries;
    }
    if shelter.iter().any(|k| t.contains(k)) {
        return Category::Shelter;
    }
    if transport.iter().any(|k| t.contains(k)) {
        return Category::Transport;
    }
    Category::Other
}

pub fn guess_urgency(text: &str) -> Urgency {
    let t = text.to_lowercase();
    let now = ["asap", "urgent", "now", "immediately", "tonight"];
    let today = ["today", "by end of day", "this evening"];
    if now.iter().any(|k| t.contains(k)) {
        return Urgency::Now;
    }
    if today.iter().any(|k| t.contains(k)) {
        return Urgency::Today;
    }
    Urgency::Week
}

pub fn guess_severity(category: Category, text: &str) -> i64 {
    let t = text.to_lowercase();
    let critical_meds = ["insulin", "oxygen", "dialysis", "heart", "seizure"];
    let critical_shelter = ["evac", "unsafe", "flood", "fire"];
    if category == Category::Meds && critical_meds.iter().any(|k| t.contains(k)) {
        return 5;
    }
    if category == Category::Shelter && critical_shelter.iter().any(|k| t.contains(k)) {
        return 5;
    }
    if t.contains("baby") || t.contains("infant") {
        return 4;
    }
    if category == Category::Meds {
        return 4;
    }
    2
}

/// Light item extraction: take the part after the first ':' or '-', split on
/// commas and " and ", keep alphanumeric names, cap at 6. Never empty — the
/// category name stands in when nothing usable remains.
pub fn extract_items(text: &str, category: Category) -> Vec<Item> {
    let t = text.trim();
    let tail = match t.find([':', '-']) {
        Some(idx) => t[idx + 1..].trim_start(),
        None => t,
    };

    let mut items = Vec::new();
    for part in tail.replace(" and ", ",").split(',') {
        if items.len() >= 6 {
            break;
        }
        let name: String = part
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        items.push(Item {
            name: name.chars().take(60).collect(),
            qty: 1.0,
            unit: "unit".to_string(),
            notes: String::new(),
        });
    }
    if items.is_empty() {
        items.push(Item {
            name: category.as_str().to_string(),
            qty: 1.0,
            unit: "unit".to_string(),
            notes: String::new(),
        });
    }
    items
}

/// Reasonable price estimate from per-category ranges, scaled a little by
/// item count and clamped to [5, 250].
pub fn estimate_price(category: Category, items: &[Item]) -> f64 {
    let (lo, hi) = match category {
        Category::Meds => (20.0, 120.0),
        Category::Groceries => (15.0, 80.0),
        Category::Shelter => (0.0, 60.0),
        Category::Transport => (10.0, 60.0),
        Category::Other => (10.0, 70.0),
    };
    let scale = (1.0 + 0.15 * (items.len().saturating_sub(1)) as f64).min(1.6);
    let val = rand::rng().random_range(lo..hi) * scale;
    round2(val.clamp(5.0, 250.0))
}

pub fn fallback_draft(text: &str) -> Draft {
    let category = guess_category(text);
    let urgency_window = guess_urgency(text);
    let severity = guess_severity(category, text);
    let items = extract_items(text, category);
    let estimated_total = estimate_price(category, &items);

    Draft {
        category,
        urgency_window,
        severity,
        items,
        estimated_total,
        notes: String::new(),
    }
}
