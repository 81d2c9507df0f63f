//! In-process store.
//!
//! Backs the integration tests and local runs without PostgreSQL. All state
//! lives behind one mutex, so each trait call is a single critical section and
//! compare-and-swap is trivially atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use flashcard_core::{Card, CardWithState, Deck, ReviewState};

use super::{ReviewStore, StoreError, StoreResult, StoredReviewState, UserStore};

#[derive(Default)]
struct Inner {
    users: HashMap<String, i64>,
    decks: BTreeMap<i64, OwnedDeck>,
    cards: BTreeMap<i64, Card>,
    states: HashMap<(i64, i64), StoredReviewState>,
    next_id: i64,
}

struct OwnedDeck {
    user_id: i64,
    deck: Deck,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owner_of_card(&self, card_id: i64) -> Option<i64> {
        let card = self.cards.get(&card_id)?;
        self.decks.get(&card.deck_id).map(|d| d.user_id)
    }
}

/// Review store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Register a user reachable through `token`.
    pub fn add_user(&self, token: &str) -> i64 {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = inner.next_id();
        inner.users.insert(token.to_string(), id);
        id
    }

    /// Create a deck owned by `user_id`.
    pub fn add_deck(&self, user_id: i64, title: &str) -> Deck {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let deck = Deck {
            id: inner.next_id(),
            title: title.to_string(),
            icon: None,
            color: None,
        };
        inner.decks.insert(
            deck.id,
            OwnedDeck {
                user_id,
                deck: deck.clone(),
            },
        );
        deck
    }

    /// Create a card in `deck_id`.
    pub fn add_card(&self, deck_id: i64, question: &str, response: &str) -> Card {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let card = Card {
            id: inner.next_id(),
            deck_id,
            question: question.to_string(),
            response: response.to_string(),
        };
        inner.cards.insert(card.id, card.clone());
        card
    }

    /// Write a review state directly, bypassing the scheduler.
    pub fn put_review_state(&self, user_id: i64, card_id: i64, state: ReviewState) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let revision = inner
            .states
            .get(&(user_id, card_id))
            .map_or(1, |s| s.revision + 1);
        inner
            .states
            .insert((user_id, card_id), StoredReviewState { state, revision });
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn get_review_state(
        &self,
        user_id: i64,
        card_id: i64,
    ) -> StoreResult<Option<StoredReviewState>> {
        Ok(self.lock()?.states.get(&(user_id, card_id)).cloned())
    }

    async fn compare_and_swap(
        &self,
        user_id: i64,
        card_id: i64,
        expected_revision: Option<i64>,
        state: &ReviewState,
    ) -> StoreResult<Option<StoredReviewState>> {
        let mut inner = self.lock()?;
        let current = inner.states.get(&(user_id, card_id)).map(|s| s.revision);
        if current != expected_revision {
            return Ok(None);
        }

        let stored = StoredReviewState {
            state: state.clone(),
            revision: current.map_or(1, |r| r + 1),
        };
        inner.states.insert((user_id, card_id), stored.clone());
        Ok(Some(stored))
    }

    async fn upsert_review_state(
        &self,
        user_id: i64,
        card_id: i64,
        state: &ReviewState,
    ) -> StoreResult<StoredReviewState> {
        let mut inner = self.lock()?;
        let revision = inner
            .states
            .get(&(user_id, card_id))
            .map_or(1, |s| s.revision + 1);
        let stored = StoredReviewState {
            state: state.clone(),
            revision,
        };
        inner.states.insert((user_id, card_id), stored.clone());
        Ok(stored)
    }

    async fn list_cards_for_review(
        &self,
        user_id: i64,
        deck_id: Option<i64>,
    ) -> StoreResult<Vec<CardWithState>> {
        let inner = self.lock()?;
        let entries = inner
            .cards
            .values()
            .filter(|card| deck_id.map_or(true, |id| card.deck_id == id))
            .filter(|card| inner.owner_of_card(card.id) == Some(user_id))
            .map(|card| CardWithState {
                card: card.clone(),
                state: inner
                    .states
                    .get(&(user_id, card.id))
                    .map(|s| s.state.clone()),
            })
            .collect();
        Ok(entries)
    }

    async fn card_belongs_to_user(&self, card_id: i64, user_id: i64) -> StoreResult<bool> {
        Ok(self.lock()?.owner_of_card(card_id) == Some(user_id))
    }

    async fn find_deck(&self, deck_id: i64, user_id: i64) -> StoreResult<Option<Deck>> {
        Ok(self
            .lock()?
            .decks
            .get(&deck_id)
            .filter(|d| d.user_id == user_id)
            .map(|d| d.deck.clone()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<i64>> {
        Ok(self.lock()?.users.get(token).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn compare_and_swap_rejects_stale_revision() {
        let store = MemoryStore::new();
        let user = store.add_user("token");
        let deck = store.add_deck(user, "Rust");
        let card = store.add_card(deck.id, "Q", "A");

        let first = store
            .compare_and_swap(user, card.id, None, &ReviewState::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.revision, 1);

        // A second "create" loses: the row exists now.
        let lost = store
            .compare_and_swap(user, card.id, None, &ReviewState::default())
            .await
            .unwrap();
        assert!(lost.is_none());

        let second = store
            .compare_and_swap(user, card.id, Some(1), &ReviewState::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.revision, 2);

        let stale = store
            .compare_and_swap(user, card.id, Some(1), &ReviewState::default())
            .await
            .unwrap();
        assert!(stale.is_none());
    }

    #[tokio::test]
    async fn ownership_is_per_user() {
        let store = MemoryStore::new();
        let alice = store.add_user("alice");
        let bob = store.add_user("bob");
        let deck = store.add_deck(alice, "Rust");
        let card = store.add_card(deck.id, "Q", "A");

        assert!(store.card_belongs_to_user(card.id, alice).await.unwrap());
        assert!(!store.card_belongs_to_user(card.id, bob).await.unwrap());
        assert!(!store.card_belongs_to_user(9999, alice).await.unwrap());
        assert!(store.deck_belongs_to_user(deck.id, alice).await.unwrap());
        assert!(!store.deck_belongs_to_user(deck.id, bob).await.unwrap());

        assert_eq!(store.list_cards_for_review(alice, None).await.unwrap().len(), 1);
        assert!(store.list_cards_for_review(bob, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deck_scope_filters_cards() {
        let store = MemoryStore::new();
        let user = store.add_user("token");
        let rust = store.add_deck(user, "Rust");
        let python = store.add_deck(user, "Python");
        store.add_card(rust.id, "Q1", "A1");
        store.add_card(rust.id, "Q2", "A2");
        store.add_card(python.id, "Q3", "A3");

        let scoped = store.list_cards_for_review(user, Some(rust.id)).await.unwrap();
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|c| c.card.deck_id == rust.id));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        let user = store.add_user("token");
        store.set_unavailable(true);

        assert!(matches!(
            store.list_cards_for_review(user, None).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.find_user_by_token("token").await.is_err());
    }
}
