//! Registration, email verification and login sessions.

use crate::error::AppError;
use crate::extractors::{session_token, set_cookie, CartSessionId, CurrentUser, CART_COOKIE, SESSION_COOKIE};
use crate::response::{success_one, success_one_ok};
use crate::service::auth::{self, LoginInput, RegisterInput};
use crate::service::cart;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct VerifyInput {
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::register(&state.pool, body).await?;
    Ok(success_one(user))
}

pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth::verify_email(&state.pool, &body.token).await?;
    Ok(success_one_ok(user))
}

/// Opens a session, sets the session cookie and folds the guest cart into the user's cart.
pub async fn login(
    State(state): State<AppState>,
    CartSessionId(guest_cart): CartSessionId,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, AppError> {
    let session = auth::login(&state.pool, body, state.config.session_ttl_hours).await?;
    let mut headers = HeaderMap::new();
    if let Some(cookie) = set_cookie(SESSION_COOKIE, &session.token, session.ttl_secs) {
        headers.append(SET_COOKIE, cookie);
    }
    if let Some(sid) = guest_cart {
        cart::merge_guest_into_user(&state.pool, &sid, session.user.id).await?;
        if let Some(clear) = set_cookie(CART_COOKIE, "", 0) {
            headers.append(SET_COOKIE, clear);
        }
    }
    Ok((
        headers,
        success_one_ok(json!({
            "token": session.token,
            "expires_in": session.ttl_secs,
            "user": session.user,
        })),
    ))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        auth::logout(&state.pool, &token).await?;
    }
    let mut out = HeaderMap::new();
    if let Some(clear) = set_cookie(SESSION_COOKIE, "", 0) {
        out.insert(SET_COOKIE, clear);
    }
    Ok((out, StatusCode::NO_CONTENT))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(user))
}
