//! Admin notification feed.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response::{success_many_with_unread, success_one_ok, PageParams};
use crate::service::notification;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDelete {
    pub ids: Vec<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<NotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = PageParams {
        limit: q.limit,
        offset: q.offset,
    }
    .resolve(50, 200);
    let rows = notification::list(&state.pool, q.unread.unwrap_or(false), limit, offset).await?;
    let unread = notification::unread_count(&state.pool).await?;
    Ok(success_many_with_unread(rows, unread))
}

pub async fn mark_read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(notification::set_read(&state.pool, id, true).await?))
}

pub async fn mark_unread(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(notification::set_read(&state.pool, id, false).await?))
}

pub async fn mark_all_read(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    let updated = notification::mark_all_read(&state.pool).await?;
    Ok(success_one_ok(json!({ "updated": updated })))
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    notification::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BulkDelete>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = notification::delete_many(&state.pool, &body.ids).await?;
    Ok(success_one_ok(json!({ "deleted": deleted })))
}

pub async fn delete_read(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    let deleted = notification::delete_read(&state.pool).await?;
    Ok(success_one_ok(json!({ "deleted": deleted })))
}
