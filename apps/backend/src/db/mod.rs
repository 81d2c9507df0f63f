//! PostgreSQL database operations

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DatabaseConfig;
use crate::models::*;
use crate::store::{ReviewStore, StoreError, StoreResult, StoredReviewState, UserStore};

const REVIEW_STATE_COLUMNS: &str =
    "interval_days, repetitions, ease_factor, last_difficulty, last_reviewed_at, revision";

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn grade_column(state: &ReviewState) -> Option<i16> {
    state.last_difficulty.map(|g| i16::from(g.to_value()))
}

fn integer_column(column: &'static str, value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange { column, value })
}

#[async_trait]
impl ReviewStore for Database {
    async fn get_review_state(
        &self,
        user_id: i64,
        card_id: i64,
    ) -> StoreResult<Option<StoredReviewState>> {
        let row = sqlx::query_as::<_, DbReviewState>(&format!(
            "SELECT {REVIEW_STATE_COLUMNS} FROM studies WHERE user_id = $1 AND card_id = $2"
        ))
        .bind(user_id)
        .bind(card_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.to_stored()))
    }

    async fn compare_and_swap(
        &self,
        user_id: i64,
        card_id: i64,
        expected_revision: Option<i64>,
        state: &ReviewState,
    ) -> StoreResult<Option<StoredReviewState>> {
        // Each branch is a single statement, so the check and the write are
        // atomic with respect to concurrent writers of the same row.
        let row = match expected_revision {
            None => {
                sqlx::query_as::<_, DbReviewState>(&format!(
                    r#"
                    INSERT INTO studies (user_id, card_id, interval_days, repetitions, ease_factor,
                                         last_difficulty, last_reviewed_at, revision)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
                    ON CONFLICT (user_id, card_id) DO NOTHING
                    RETURNING {REVIEW_STATE_COLUMNS}
                    "#
                ))
                .bind(user_id)
                .bind(card_id)
                .bind(integer_column("interval_days", state.interval)?)
                .bind(integer_column("repetitions", state.repetitions)?)
                .bind(state.ease_factor)
                .bind(grade_column(state))
                .bind(state.last_reviewed_at)
                .fetch_optional(&self.pool)
                .await?
            }
            Some(revision) => {
                sqlx::query_as::<_, DbReviewState>(&format!(
                    r#"
                    UPDATE studies
                    SET interval_days = $3,
                        repetitions = $4,
                        ease_factor = $5,
                        last_difficulty = $6,
                        last_reviewed_at = $7,
                        revision = revision + 1,
                        updated_at = NOW()
                    WHERE user_id = $1 AND card_id = $2 AND revision = $8
                    RETURNING {REVIEW_STATE_COLUMNS}
                    "#
                ))
                .bind(user_id)
                .bind(card_id)
                .bind(integer_column("interval_days", state.interval)?)
                .bind(integer_column("repetitions", state.repetitions)?)
                .bind(state.ease_factor)
                .bind(grade_column(state))
                .bind(state.last_reviewed_at)
                .bind(revision)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row.map(|r| r.to_stored()))
    }

    async fn upsert_review_state(
        &self,
        user_id: i64,
        card_id: i64,
        state: &ReviewState,
    ) -> StoreResult<StoredReviewState> {
        let row = sqlx::query_as::<_, DbReviewState>(&format!(
            r#"
            INSERT INTO studies (user_id, card_id, interval_days, repetitions, ease_factor,
                                 last_difficulty, last_reviewed_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
            ON CONFLICT (user_id, card_id) DO UPDATE SET
                interval_days = EXCLUDED.interval_days,
                repetitions = EXCLUDED.repetitions,
                ease_factor = EXCLUDED.ease_factor,
                last_difficulty = EXCLUDED.last_difficulty,
                last_reviewed_at = EXCLUDED.last_reviewed_at,
                revision = studies.revision + 1,
                updated_at = NOW()
            RETURNING {REVIEW_STATE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(card_id)
        .bind(integer_column("interval_days", state.interval)?)
        .bind(integer_column("repetitions", state.repetitions)?)
        .bind(state.ease_factor)
        .bind(grade_column(state))
        .bind(state.last_reviewed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.to_stored())
    }

    async fn list_cards_for_review(
        &self,
        user_id: i64,
        deck_id: Option<i64>,
    ) -> StoreResult<Vec<CardWithState>> {
        let rows = sqlx::query_as::<_, DbCardWithState>(
            r#"
            SELECT c.id, c.deck_id, c.question, c.response,
                   s.interval_days, s.repetitions, s.ease_factor,
                   s.last_difficulty, s.last_reviewed_at, s.revision
            FROM cards c
            JOIN decks d ON d.id = c.deck_id
            LEFT JOIN studies s ON s.card_id = c.id AND s.user_id = $1
            WHERE d.user_id = $1
              AND ($2::BIGINT IS NULL OR d.id = $2)
            ORDER BY c.id
            "#,
        )
        .bind(user_id)
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(DbCardWithState::to_core).collect())
    }

    async fn card_belongs_to_user(&self, card_id: i64, user_id: i64) -> StoreResult<bool> {
        let owned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM cards c
                JOIN decks d ON d.id = c.deck_id
                WHERE c.id = $1 AND d.user_id = $2
            )
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owned)
    }

    async fn find_deck(&self, deck_id: i64, user_id: i64) -> StoreResult<Option<Deck>> {
        let deck = sqlx::query_as::<_, DbDeck>(
            r#"
            SELECT id, user_id, title, icon, color
            FROM decks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(deck_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deck.map(|d| d.to_api_deck()))
    }
}

#[async_trait]
impl UserStore for Database {
    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<i64>> {
        let user_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE api_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user_id)
    }
}
