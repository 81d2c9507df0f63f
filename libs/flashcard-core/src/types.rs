//! Core types for the study engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Ease factor a card starts with.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Ease factor floor.
pub const MINIMUM_EASE_FACTOR: f64 = 1.3;

/// Longest interval the scheduler will hand out, roughly a century.
pub const MAXIMUM_INTERVAL_DAYS: u32 = 36_500;

/// A learner's self-reported recall difficulty for one review.
///
/// Serialized as its numeric value (1, 2 or 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "i64")]
pub enum DifficultyGrade {
    Hard,
    Medium,
    Easy,
}

impl DifficultyGrade {
    /// All grades in ascending order.
    pub const ALL: [DifficultyGrade; 3] = [Self::Hard, Self::Medium, Self::Easy];

    /// Numeric value (1-3).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Hard => 1,
            Self::Medium => 2,
            Self::Easy => 3,
        }
    }

    /// Parse a raw grade, rejecting anything outside {1, 2, 3}.
    pub fn from_value(value: i64) -> Result<Self, CoreError> {
        match value {
            1 => Ok(Self::Hard),
            2 => Ok(Self::Medium),
            3 => Ok(Self::Easy),
            other => Err(CoreError::InvalidGrade(other)),
        }
    }
}

impl From<DifficultyGrade> for u8 {
    fn from(grade: DifficultyGrade) -> Self {
        grade.to_value()
    }
}

impl TryFrom<i64> for DifficultyGrade {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Scheduling data for one (user, card) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    /// Days until the card is due again. Always at least 1.
    pub interval: u32,
    /// Consecutive successful reviews.
    pub repetitions: u32,
    pub ease_factor: f64,
    pub last_difficulty: Option<DifficultyGrade>,
    /// `None` means the card was never reviewed.
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl Default for ReviewState {
    fn default() -> Self {
        Self {
            interval: 1,
            repetitions: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            last_difficulty: None,
            last_reviewed_at: None,
        }
    }
}

impl ReviewState {
    /// When the card becomes due.
    ///
    /// `None` if the card was never reviewed or the due date falls outside
    /// the representable range.
    pub fn next_review_date(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at.and_then(|reviewed| {
            reviewed.checked_add_signed(Duration::days(i64::from(self.interval)))
        })
    }

    /// Whether the card is due at `now`.
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_reviewed_at {
            None => true,
            // An unrepresentable due date lies beyond any `now`.
            Some(_) => self.next_review_date().is_some_and(|due| due <= now),
        }
    }
}

/// A flashcard as seen by the study engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub deck_id: i64,
    pub question: String,
    pub response: String,
}

/// Deck metadata used in progress payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub title: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// A card paired with the user's review state, if one exists yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardWithState {
    pub card: Card,
    pub state: Option<ReviewState>,
}

impl CardWithState {
    /// Review state with defaults filled in for never-touched cards.
    pub fn effective_state(&self) -> ReviewState {
        self.state.clone().unwrap_or_default()
    }

    /// Timestamp of the last review, if any.
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.state.as_ref().and_then(|s| s.last_reviewed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn grade_round_trips_through_numeric_value() {
        for grade in DifficultyGrade::ALL {
            let value = i64::from(grade.to_value());
            assert_eq!(DifficultyGrade::from_value(value).unwrap(), grade);
        }
    }

    #[test]
    fn grade_rejects_out_of_range_values() {
        for value in [0, 4, -1, 100] {
            assert!(matches!(
                DifficultyGrade::from_value(value),
                Err(CoreError::InvalidGrade(v)) if v == value
            ));
        }
    }

    #[test]
    fn grade_serializes_as_number() {
        let json = serde_json::to_string(&DifficultyGrade::Medium).unwrap();
        assert_eq!(json, "2");
        let parsed: DifficultyGrade = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, DifficultyGrade::Easy);
        assert!(serde_json::from_str::<DifficultyGrade>("7").is_err());
    }

    #[test]
    fn default_state_is_never_reviewed() {
        let state = ReviewState::default();
        assert_eq!(state.interval, 1);
        assert_eq!(state.repetitions, 0);
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.last_difficulty, None);
        assert_eq!(state.next_review_date(), None);
    }

    #[test]
    fn next_review_date_adds_interval_days() {
        let reviewed = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let state = ReviewState {
            interval: 3,
            last_reviewed_at: Some(reviewed),
            ..Default::default()
        };
        assert_eq!(
            state.next_review_date(),
            Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn overflowing_due_date_is_never_due() {
        let reviewed = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let state = ReviewState {
            interval: u32::MAX,
            last_reviewed_at: Some(reviewed),
            ..Default::default()
        };
        assert_eq!(state.next_review_date(), None);
        assert!(!state.is_due_at(reviewed + Duration::days(365 * 1000)));
    }
}
