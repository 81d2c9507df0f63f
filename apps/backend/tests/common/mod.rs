//! Common test utilities and fixtures for integration tests.
//!
//! [`TestContext`] runs the full router against the in-memory store and a
//! fixed clock, so most tests need no external services. [`PgTestContext`]
//! runs against PostgreSQL and requires `DATABASE_URL`; tests using it are
//! `#[ignore]`d by default.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};

use flashcard_core::{Card, Deck, FixedClock};
use flashcard_study_backend::config::DatabaseConfig;
use flashcard_study_backend::db::Database;
use flashcard_study_backend::store::memory::MemoryStore;
use flashcard_study_backend::{router, AppState};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Test context backed by the in-memory store.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::starting_at(fixtures::study_start())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(now));

        let state = AppState {
            store: store.clone(),
            users: store.clone(),
            clock: clock.clone(),
        };

        Self {
            store,
            clock,
            app: router(state, TEST_TIMEOUT),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Create a user and return its ID and token.
    pub fn create_user(&self, token: &str) -> (i64, String) {
        (self.store.add_user(token), token.to_string())
    }

    /// Create a deck holding `cards` generated cards.
    pub fn create_deck(&self, user_id: i64, title: &str, cards: usize) -> (Deck, Vec<Card>) {
        let deck = self.store.add_deck(user_id, title);
        let cards = fixtures::sample_cards(cards)
            .into_iter()
            .map(|(q, a)| self.store.add_card(deck.id, &q, &a))
            .collect();
        (deck, cards)
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }
}

/// Test context backed by PostgreSQL.
pub struct PgTestContext {
    pub db: Arc<Database>,
    app: Router,
}

impl PgTestContext {
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let db = Database::connect(&DatabaseConfig {
            url,
            max_connections: 5,
            acquire_timeout_secs: 5,
        })
        .await
        .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);
        let state = AppState {
            store: db.clone(),
            users: db.clone(),
            clock: Arc::new(flashcard_core::SystemClock),
        };

        Self {
            db,
            app: router(state, TEST_TIMEOUT),
        }
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Create a user with a unique token; returns its ID and token.
    pub async fn create_user(&self) -> (i64, String) {
        let token = format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, api_token) VALUES ($1, $2) RETURNING id",
        )
        .bind(format!("{token}@example.test"))
        .bind(&token)
        .fetch_one(self.db.pool())
        .await
        .expect("Failed to create test user");
        (id, token)
    }

    /// Create a deck with `cards` generated cards; returns deck and card IDs.
    pub async fn create_deck(&self, user_id: i64, cards: usize) -> (i64, Vec<i64>) {
        let deck_id: i64 =
            sqlx::query_scalar("INSERT INTO decks (user_id, title) VALUES ($1, $2) RETURNING id")
                .bind(user_id)
                .bind("Test deck")
                .fetch_one(self.db.pool())
                .await
                .expect("Failed to create test deck");

        let mut ids = Vec::with_capacity(cards);
        for (question, response) in fixtures::sample_cards(cards) {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO cards (deck_id, question, response) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(deck_id)
            .bind(question)
            .bind(response)
            .fetch_one(self.db.pool())
            .await
            .expect("Failed to create test card");
            ids.push(id);
        }

        (deck_id, ids)
    }

    /// Clean up test data for a user.
    pub async fn cleanup_user(&self, user_id: i64) {
        // Delete in order due to foreign keys
        let _ = sqlx::query("DELETE FROM studies WHERE user_id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;

        let _ = sqlx::query(
            "DELETE FROM cards WHERE deck_id IN (SELECT id FROM decks WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(self.db.pool())
        .await;

        let _ = sqlx::query("DELETE FROM decks WHERE user_id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;

        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;
    }
}
