//! Newsletter sign-up and admin email campaigns.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response::{success_one, success_one_ok, success_page, PageParams};
use crate::service::marketing::{self, EmailInput, SendInput, TestInput};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<EmailInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(marketing::subscribe(&state.pool, &body.email).await?))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<EmailInput>,
) -> Result<impl IntoResponse, AppError> {
    marketing::unsubscribe(&state.pool, &body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn subscribers(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page.resolve(50, 500);
    let (rows, total) = marketing::subscribers(&state.pool, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn send(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<SendInput>,
) -> Result<impl IntoResponse, AppError> {
    let campaign = marketing::send(&state.pool, state.mailer.as_ref(), admin.id, body).await?;
    Ok(success_one(campaign))
}

pub async fn campaigns(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page.resolve(25, 100);
    let (rows, total) = marketing::campaigns(&state.pool, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn send_test(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<TestInput>,
) -> Result<impl IntoResponse, AppError> {
    let to = body.to.clone();
    marketing::send_test(&state.pool, state.mailer.as_ref(), body).await?;
    Ok(success_one_ok(json!({ "sent": true, "to": to })))
}
