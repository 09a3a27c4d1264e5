use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::{is_unique_violation, Merchant},
    },
    error::ApiError,
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }
    if payload.business_name.trim().is_empty() {
        warn!("missing business name");
        return Err(ApiError::Validation("Business name is required".into()));
    }

    if Merchant::find_by_email(&state.db, &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Validation("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    // A concurrent register can slip past the check above and trip the email
    // unique constraint instead.
    let merchant =
        match Merchant::create(&state.db, &payload.email, &hash, payload.business_name.trim())
            .await
        {
            Ok(m) => m,
            Err(e) if is_unique_violation(&e) => {
                warn!(email = %payload.email, "email already registered (unique constraint)");
                return Err(ApiError::Validation("Email already registered".into()));
            }
            Err(e) => return Err(e.into()),
        };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(merchant.id)?;

    info!(merchant_id = %merchant.id, email = %merchant.email, "merchant registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            account: merchant,
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let merchant = Merchant::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Auth("Invalid login credentials".into())
        })?;

    if !verify_password(&payload.password, &merchant.password_hash)? {
        warn!(email = %payload.email, merchant_id = %merchant.id, "login invalid password");
        return Err(ApiError::Auth("Invalid login credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(merchant.id)?;

    info!(merchant_id = %merchant.id, email = %merchant.email, "merchant logged in");
    Ok(Json(AuthResponse {
        account: merchant,
        token,
    }))
}
