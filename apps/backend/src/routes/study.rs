//! Study endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::session::{DEFAULT_DUE_LIMIT, DEFAULT_SESSION_LIMIT};
use crate::AppState;

type Envelope<T> = Json<ApiResponse<T>>;

fn envelope<T>(state: &AppState, data: T) -> Envelope<T> {
    Json(ApiResponse::new(data, state.clock.now()))
}

/// GET /api/study/stats
pub async fn general_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Envelope<GeneralStatsResponse>> {
    let stats = state.session_manager().general_stats(auth.user_id).await?;
    Ok(envelope(&state, stats))
}

/// GET /api/study/cards/due
pub async fn due_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<LimitQuery>,
) -> Result<Envelope<DueCardsResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_DUE_LIMIT);
    let due = state
        .session_manager()
        .due_cards_today(auth.user_id, limit)
        .await?;
    Ok(envelope(&state, due))
}

/// GET /api/study/session
pub async fn start_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<LimitQuery>,
) -> Result<Envelope<StudySessionResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_SESSION_LIMIT);
    let session = state
        .session_manager()
        .start_session(auth.user_id, None, limit)
        .await?;
    Ok(envelope(&state, session))
}

/// GET /api/study/session/:deck_id
pub async fn start_deck_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(deck_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Envelope<StudySessionResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_SESSION_LIMIT);
    let session = state
        .session_manager()
        .start_session(auth.user_id, Some(deck_id), limit)
        .await?;
    Ok(envelope(&state, session))
}

/// POST /api/study/review
pub async fn review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    payload: std::result::Result<Json<ReviewCardRequest>, JsonRejection>,
) -> Result<Envelope<ReviewCardResponse>> {
    let Json(payload) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let grade = payload.grade_value()?;

    let review = state
        .session_manager()
        .review_card(auth.user_id, payload.card_id, grade)
        .await?;
    Ok(envelope(&state, review))
}

/// DELETE /api/study/cards/:card_id
pub async fn reset_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(card_id): Path<i64>,
) -> Result<Envelope<ResetProgressResponse>> {
    let reset = state
        .session_manager()
        .reset_progress(auth.user_id, card_id)
        .await?;
    Ok(envelope(&state, reset))
}

/// GET /api/study/decks/:deck_id/progress
pub async fn deck_progress(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(deck_id): Path<i64>,
) -> Result<Envelope<DeckProgressResponse>> {
    let progress = state
        .session_manager()
        .deck_progress(auth.user_id, deck_id)
        .await?;
    Ok(envelope(&state, progress))
}

/// GET /api/study/analysis
pub async fn analysis(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Envelope<StudyAnalysisResponse>> {
    let analysis = state.session_manager().study_analysis(auth.user_id).await?;
    Ok(envelope(&state, analysis))
}

/// GET /api/study/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        service: "study".to_string(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
