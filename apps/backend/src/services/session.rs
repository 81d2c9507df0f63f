//! Study session orchestration.
//!
//! A session is not kept on the server: every call reads the store, derives
//! its answer and returns it. The only writes are review submissions and
//! progress resets, both atomic per (user, card).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flashcard_core::stats::{ANALYSIS_REVIEW_WINDOW, STATS_REVIEW_WINDOW};
use flashcard_core::{
    next_state, recent_reviews, review_feedback, select_due, validate_limit, CardWithState,
    Clock, DeckProgress, DifficultyGrade, ReviewState, StudyAnalysis, StudyStats,
};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::store::ReviewStore;

/// Default number of cards in a study session.
pub const DEFAULT_SESSION_LIMIT: i64 = 20;
pub const MAX_SESSION_LIMIT: i64 = 100;

/// Default number of cards in the due list.
pub const DEFAULT_DUE_LIMIT: i64 = 50;
pub const MAX_DUE_LIMIT: i64 = 200;

/// Attempts at an optimistic review write before giving up.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// Entry point for everything a learner does during study.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn ReviewStore>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ReviewStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Assemble a study session of at most `limit` due cards.
    pub async fn start_session(
        &self,
        user_id: i64,
        deck_id: Option<i64>,
        limit: i64,
    ) -> Result<StudySessionResponse> {
        let limit = validate_limit(limit, 1, MAX_SESSION_LIMIT)?;

        if let Some(deck_id) = deck_id {
            if !self.store.deck_belongs_to_user(deck_id, user_id).await? {
                return Err(deck_not_found());
            }
        }

        let now = self.now();
        let snapshot = self.store.list_cards_for_review(user_id, deck_id).await?;
        let stats = match deck_id {
            None => StudyStats::compute(&snapshot, now),
            Some(_) => self.overall_stats(user_id, now).await?,
        };

        let cards: Vec<StudyCard> = select_due(snapshot, now, limit)
            .into_iter()
            .map(StudyCard::from)
            .collect();

        tracing::info!(user_id, ?deck_id, limit, cards = cards.len(), "study session started");

        let message = if cards.is_empty() {
            "No cards available for review right now".to_string()
        } else {
            format!("Session started with {} cards", cards.len())
        };

        Ok(StudySessionResponse {
            session: SessionInfo {
                session_id: format!("session_{}_{}", now.timestamp_millis(), user_id),
                started_at: now,
                deck_id,
                max_cards: limit,
            },
            total_cards: cards.len(),
            cards,
            stats,
            message,
        })
    }

    /// Apply one review to a card and persist the resulting state.
    pub async fn review_card(
        &self,
        user_id: i64,
        card_id: i64,
        grade: i64,
    ) -> Result<ReviewCardResponse> {
        let grade = DifficultyGrade::from_value(grade)?;

        if !self.store.card_belongs_to_user(card_id, user_id).await? {
            return Err(card_not_found());
        }

        let now = self.now();
        let state = self.write_review(user_id, card_id, grade, now).await?;
        let stats = self.overall_stats(user_id, now).await?;

        tracing::info!(
            user_id,
            card_id,
            grade = grade.to_value(),
            interval = state.interval,
            repetitions = state.repetitions,
            "review recorded"
        );

        Ok(ReviewCardResponse {
            card_id,
            grade,
            next_review_date: state.next_review_date().unwrap_or(now),
            message: review_feedback(grade, state.interval),
            state,
            stats,
        })
    }

    // Read, schedule, then compare-and-swap; on a lost race start over from
    // the state the winner wrote.
    async fn write_review(
        &self,
        user_id: i64,
        card_id: i64,
        grade: DifficultyGrade,
        now: DateTime<Utc>,
    ) -> Result<ReviewState> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.store.get_review_state(user_id, card_id).await?;
            let (base, expected_revision) = match current {
                Some(stored) => (stored.state, Some(stored.revision)),
                None => (ReviewState::default(), None),
            };

            let mut next = next_state(&base, grade);
            next.last_reviewed_at = Some(now);

            match self
                .store
                .compare_and_swap(user_id, card_id, expected_revision, &next)
                .await?
            {
                Some(stored) => return Ok(stored.state),
                None => {
                    tracing::warn!(user_id, card_id, attempt, "concurrent review write, retrying");
                }
            }
        }

        Err(ApiError::PersistenceFailure(format!(
            "write conflict on card {card_id} not resolved after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }

    /// Put a card back to its never-reviewed state.
    pub async fn reset_progress(&self, user_id: i64, card_id: i64) -> Result<ResetProgressResponse> {
        if !self.store.card_belongs_to_user(card_id, user_id).await? {
            return Err(card_not_found());
        }

        let stored = self
            .store
            .upsert_review_state(user_id, card_id, &ReviewState::default())
            .await?;
        let stats = self.overall_stats(user_id, self.now()).await?;

        tracing::info!(user_id, card_id, "card progress reset");

        Ok(ResetProgressResponse {
            card_id,
            state: stored.state,
            stats,
            message: "Card progress reset".to_string(),
        })
    }

    /// Due cards across all of the user's decks.
    pub async fn due_cards_today(&self, user_id: i64, limit: i64) -> Result<DueCardsResponse> {
        let limit = validate_limit(limit, 1, MAX_DUE_LIMIT)?;

        let now = self.now();
        let snapshot = self.store.list_cards_for_review(user_id, None).await?;
        let stats = StudyStats::compute(&snapshot, now);
        let cards: Vec<StudyCard> = select_due(snapshot, now, limit)
            .into_iter()
            .map(StudyCard::from)
            .collect();

        tracing::debug!(user_id, limit, due = cards.len(), "due cards listed");

        Ok(DueCardsResponse {
            total_due: cards.len(),
            message: format!("{} cards available for review today", cards.len()),
            cards,
            stats,
        })
    }

    /// Overall statistics plus the latest reviews.
    pub async fn general_stats(&self, user_id: i64) -> Result<GeneralStatsResponse> {
        let snapshot = self.store.list_cards_for_review(user_id, None).await?;

        Ok(GeneralStatsResponse {
            stats: StudyStats::compute(&snapshot, self.now()),
            recent_reviews: recent_reviews(&snapshot, STATS_REVIEW_WINDOW),
            message: "Statistics loaded".to_string(),
        })
    }

    /// Progress through a single deck.
    pub async fn deck_progress(&self, user_id: i64, deck_id: i64) -> Result<DeckProgressResponse> {
        let deck = self
            .store
            .find_deck(deck_id, user_id)
            .await?
            .ok_or_else(deck_not_found)?;

        let snapshot = self.store.list_cards_for_review(user_id, Some(deck_id)).await?;
        let progress = DeckProgress::compute(&snapshot, self.now());

        Ok(DeckProgressResponse {
            message: format!("Progress for deck \"{}\" loaded", deck.title),
            deck,
            progress,
        })
    }

    /// Heuristic analysis of recent study habits.
    pub async fn study_analysis(&self, user_id: i64) -> Result<StudyAnalysisResponse> {
        let now = self.now();
        let snapshot = self.store.list_cards_for_review(user_id, None).await?;
        let stats = StudyStats::compute(&snapshot, now);
        let reviews = recent_reviews(&snapshot, ANALYSIS_REVIEW_WINDOW);

        Ok(StudyAnalysisResponse {
            analysis: StudyAnalysis::analyze(&stats, &reviews, now),
            message: "Study analysis generated".to_string(),
        })
    }

    async fn overall_stats(&self, user_id: i64, now: DateTime<Utc>) -> Result<StudyStats> {
        let snapshot: Vec<CardWithState> = self.store.list_cards_for_review(user_id, None).await?;
        Ok(StudyStats::compute(&snapshot, now))
    }
}

fn card_not_found() -> ApiError {
    ApiError::NotFound("Card not found".to_string())
}

fn deck_not_found() -> ApiError {
    ApiError::NotFound("Deck not found".to_string())
}
