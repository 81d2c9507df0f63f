//! Core study engine shared by the backend.
//!
//! Provides:
//! - SM-2 review scheduling
//! - Due-card selection
//! - Study statistics and analysis
//! - Shared types (Card, ReviewState, DifficultyGrade, etc.)

pub mod algorithm;
pub mod clock;
pub mod due;
pub mod error;
pub mod feedback;
pub mod stats;
pub mod types;

pub use algorithm::next_state;
pub use clock::{Clock, FixedClock, SystemClock};
pub use due::{is_due, select_due};
pub use error::{validate_limit, CoreError, Result};
pub use feedback::review_feedback;
pub use stats::{
    recent_reviews, DeckProgress, RecentReview, StudyAnalysis, StudyStats,
};
pub use types::{Card, CardWithState, Deck, DifficultyGrade, ReviewState};
