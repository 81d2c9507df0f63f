//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Re-export shared types from flashcard-core
pub use flashcard_core::stats::{DeckProgress, RecentReview, StudyAnalysis, StudyStats};
pub use flashcard_core::types::{Card, CardWithState, Deck, DifficultyGrade, ReviewState};

use crate::error::ApiError;
use crate::store::StoredReviewState;

// === Database Entity Types ===

/// Review state row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbReviewState {
    pub interval_days: i32,
    pub repetitions: i32,
    pub ease_factor: f64,
    pub last_difficulty: Option<i16>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub revision: i64,
}

impl DbReviewState {
    /// Convert to flashcard-core ReviewState
    pub fn to_core_state(&self) -> ReviewState {
        core_state(
            self.interval_days,
            self.repetitions,
            self.ease_factor,
            self.last_difficulty,
            self.last_reviewed_at,
        )
    }

    pub fn to_stored(&self) -> StoredReviewState {
        StoredReviewState {
            state: self.to_core_state(),
            revision: self.revision,
        }
    }
}

/// Card joined with the user's (optional) review state
#[derive(Debug, Clone, FromRow)]
pub struct DbCardWithState {
    pub id: i64,
    pub deck_id: i64,
    pub question: String,
    pub response: String,
    pub interval_days: Option<i32>,
    pub repetitions: Option<i32>,
    pub ease_factor: Option<f64>,
    pub last_difficulty: Option<i16>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Present exactly when a review state row exists.
    pub revision: Option<i64>,
}

impl DbCardWithState {
    pub fn to_core(&self) -> CardWithState {
        let state = self.revision.map(|_| {
            core_state(
                self.interval_days.unwrap_or(1),
                self.repetitions.unwrap_or(0),
                self.ease_factor.unwrap_or(flashcard_core::types::DEFAULT_EASE_FACTOR),
                self.last_difficulty,
                self.last_reviewed_at,
            )
        });

        CardWithState {
            card: Card {
                id: self.id,
                deck_id: self.deck_id,
                question: self.question.clone(),
                response: self.response.clone(),
            },
            state,
        }
    }
}

/// Deck row in PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub struct DbDeck {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl DbDeck {
    pub fn to_api_deck(&self) -> Deck {
        Deck {
            id: self.id,
            title: self.title.clone(),
            icon: self.icon.clone(),
            color: self.color.clone(),
        }
    }
}

fn core_state(
    interval_days: i32,
    repetitions: i32,
    ease_factor: f64,
    last_difficulty: Option<i16>,
    last_reviewed_at: Option<DateTime<Utc>>,
) -> ReviewState {
    ReviewState {
        interval: interval_days.max(1) as u32,
        repetitions: repetitions.max(0) as u32,
        ease_factor,
        last_difficulty: last_difficulty.and_then(|d| DifficultyGrade::from_value(d.into()).ok()),
        last_reviewed_at,
    }
}

// === API Envelope ===

/// Success envelope shared by every study endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            data,
            timestamp,
        }
    }
}

// === API Request/Response Types ===

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewCardRequest {
    pub card_id: i64,
    /// Kept untyped so that any non-integer grade is reported as an invalid
    /// grade rather than a malformed body.
    #[serde(alias = "difficulty")]
    pub grade: serde_json::Value,
}

impl ReviewCardRequest {
    /// The submitted grade as an integer.
    pub fn grade_value(&self) -> Result<i64, ApiError> {
        self.grade.as_i64().ok_or_else(|| {
            ApiError::InvalidGrade(format!(
                "grade must be 1 (hard), 2 (medium) or 3 (easy), got {}",
                self.grade
            ))
        })
    }
}

/// A due card as handed to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyCard {
    pub card_id: i64,
    pub deck_id: i64,
    pub question: String,
    pub response: String,
    pub interval: u32,
    pub repetitions: u32,
    pub ease_factor: f64,
    pub last_difficulty: Option<DifficultyGrade>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl From<CardWithState> for StudyCard {
    fn from(entry: CardWithState) -> Self {
        let state = entry.effective_state();
        Self {
            card_id: entry.card.id,
            deck_id: entry.card.deck_id,
            question: entry.card.question,
            response: entry.card.response,
            interval: state.interval,
            repetitions: state.repetitions,
            ease_factor: state.ease_factor,
            last_difficulty: state.last_difficulty,
            last_reviewed_at: state.last_reviewed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub deck_id: Option<i64>,
    pub max_cards: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudySessionResponse {
    pub session: SessionInfo,
    pub cards: Vec<StudyCard>,
    pub total_cards: usize,
    pub stats: StudyStats,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewCardResponse {
    pub card_id: i64,
    pub grade: DifficultyGrade,
    pub state: ReviewState,
    pub next_review_date: DateTime<Utc>,
    pub stats: StudyStats,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetProgressResponse {
    pub card_id: i64,
    pub state: ReviewState,
    pub stats: StudyStats,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneralStatsResponse {
    pub stats: StudyStats,
    pub recent_reviews: Vec<RecentReview>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DueCardsResponse {
    pub cards: Vec<StudyCard>,
    pub total_due: usize,
    pub stats: StudyStats,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeckProgressResponse {
    pub deck: Deck,
    pub progress: DeckProgress,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyAnalysisResponse {
    pub analysis: StudyAnalysis,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub service: String,
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
