use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthMerchant,
    cards::{domain::Card, dto::CreateCardRequest, repo},
    error::ApiError,
    extract::JsonBody,
    state::AppState,
};

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/cards", post(create_card).get(list_cards))
        .route("/cards/:card_id/stamp", post(stamp_card))
        .route("/cards/:card_id/redeem", post(redeem_card))
}

#[instrument(skip(state, payload))]
pub async fn create_card(
    State(state): State<AppState>,
    AuthMerchant(merchant_id): AuthMerchant,
    JsonBody(payload): JsonBody<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Card name is required".into()));
    }
    if payload.logo.trim().is_empty() {
        return Err(ApiError::Validation("Logo is required".into()));
    }
    if payload.color.trim().is_empty() {
        return Err(ApiError::Validation("Color is required".into()));
    }
    if payload.total_visits < 1 {
        warn!(total_visits = payload.total_visits, "invalid visit threshold");
        return Err(ApiError::Validation(
            "Total visits must be a positive integer".into(),
        ));
    }

    let card = repo::create(&state.db, merchant_id, &payload).await?;
    info!(card_id = %card.id, %merchant_id, "card created");
    Ok((StatusCode::CREATED, Json(card)))
}

#[instrument(skip(state))]
pub async fn list_cards(
    State(state): State<AppState>,
    AuthMerchant(merchant_id): AuthMerchant,
) -> Result<Json<Vec<Card>>, ApiError> {
    let cards = repo::list_by_merchant(&state.db, merchant_id).await?;
    Ok(Json(cards))
}

#[instrument(skip(state))]
pub async fn stamp_card(
    State(state): State<AppState>,
    AuthMerchant(merchant_id): AuthMerchant,
    Path(card_id): Path<Uuid>,
) -> Result<Json<Card>, ApiError> {
    let mut tx = state.db.begin().await?;
    let mut card = repo::find_for_update(&mut tx, card_id, merchant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".into()))?;

    card.stamp()?;
    repo::save_visit_state(&mut tx, &card).await?;
    tx.commit().await?;

    info!(%card_id, %merchant_id, current_visits = card.current_visits, "card stamped");
    Ok(Json(card))
}

#[instrument(skip(state))]
pub async fn redeem_card(
    State(state): State<AppState>,
    AuthMerchant(merchant_id): AuthMerchant,
    Path(card_id): Path<Uuid>,
) -> Result<Json<Card>, ApiError> {
    let mut tx = state.db.begin().await?;
    let mut card = repo::find_for_update(&mut tx, card_id, merchant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".into()))?;

    card.redeem(OffsetDateTime::now_utc())?;
    repo::save_visit_state(&mut tx, &card).await?;
    tx.commit().await?;

    info!(%card_id, %merchant_id, redemptions = card.redemption_history.0.len(), "reward redeemed");
    Ok(Json(card))
}
