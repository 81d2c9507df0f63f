//! Test fixtures and factory functions for creating test data.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

/// Instant every in-memory test starts at.
pub fn study_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap()
}

/// Generate `count` question/response pairs.
pub fn sample_cards(count: usize) -> Vec<(String, String)> {
    (1..=count)
        .map(|i| (format!("Question {}?", i), format!("Answer {}.", i)))
        .collect()
}

/// Body for POST /api/study/review.
pub fn review_request(card_id: i64, grade: i64) -> Value {
    json!({ "card_id": card_id, "grade": grade })
}

/// Review body using the `difficulty` spelling of the grade field.
pub fn review_request_with_difficulty(card_id: i64, difficulty: i64) -> Value {
    json!({ "card_id": card_id, "difficulty": difficulty })
}
