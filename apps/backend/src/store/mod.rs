//! Persistence collaborators consumed by the study engine.
//!
//! The study engine never talks to a database directly. It goes through
//! [`ReviewStore`] for cards and review states and [`UserStore`] to resolve
//! bearer tokens. Two implementations exist: [`crate::db::Database`]
//! (PostgreSQL) and [`memory::MemoryStore`] (in-process).
//!
//! # Write discipline
//!
//! Review states are only ever written through [`ReviewStore::compare_and_swap`]
//! or [`ReviewStore::upsert_review_state`]. Both must be atomic per
//! (user, card) key. Every successful write bumps the row's revision, which is
//! what `compare_and_swap` checks against.

pub mod memory;

use async_trait::async_trait;
use flashcard_core::{CardWithState, Deck, ReviewState};
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("value out of range for column {column}: {value}")]
    OutOfRange { column: &'static str, value: u32 },
}

/// A review state together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReviewState {
    pub state: ReviewState,
    pub revision: i64,
}

/// Cards, decks and per-(user, card) review state.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Load the review state for a (user, card) pair.
    ///
    /// Returns `Ok(None)` if the card was never touched by this user.
    async fn get_review_state(
        &self,
        user_id: i64,
        card_id: i64,
    ) -> StoreResult<Option<StoredReviewState>>;

    /// Replace the review state only if it is still at `expected_revision`.
    ///
    /// With `expected_revision == None` the write succeeds only if no state
    /// exists yet. Returns `Ok(None)` when another writer got there first.
    async fn compare_and_swap(
        &self,
        user_id: i64,
        card_id: i64,
        expected_revision: Option<i64>,
        state: &ReviewState,
    ) -> StoreResult<Option<StoredReviewState>>;

    /// Unconditionally create or overwrite the review state.
    async fn upsert_review_state(
        &self,
        user_id: i64,
        card_id: i64,
        state: &ReviewState,
    ) -> StoreResult<StoredReviewState>;

    /// All cards owned by the user, optionally limited to one deck, each with
    /// the user's review state if any. Ordered by card id.
    async fn list_cards_for_review(
        &self,
        user_id: i64,
        deck_id: Option<i64>,
    ) -> StoreResult<Vec<CardWithState>>;

    /// Whether the card exists and belongs to one of the user's decks.
    async fn card_belongs_to_user(&self, card_id: i64, user_id: i64) -> StoreResult<bool>;

    /// Load a deck if it exists and is owned by the user.
    async fn find_deck(&self, deck_id: i64, user_id: i64) -> StoreResult<Option<Deck>>;

    /// Whether the deck exists and is owned by the user.
    async fn deck_belongs_to_user(&self, deck_id: i64, user_id: i64) -> StoreResult<bool> {
        Ok(self.find_deck(deck_id, user_id).await?.is_some())
    }
}

/// Resolves API tokens to users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the id of the user holding `token`, if any.
    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<i64>>;
}
