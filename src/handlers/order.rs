//! Checkout, customer order history and admin fulfilment.

use crate::error::AppError;
use crate::extractors::{AdminUser, CurrentUser};
use crate::models::OrderStatus;
use crate::response::{success_one, success_one_ok, success_page, PageParams};
use crate::service::order::{self, CheckoutInput, OrderQuery, StatusInput, TrackingInput};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Default)]
pub struct CancelBody {
    pub reason: Option<String>,
}

pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CheckoutInput>,
) -> Result<impl IntoResponse, AppError> {
    let detail = order::checkout(
        &state.pool,
        state.mailer.as_ref(),
        &user,
        body,
        state.config.low_stock_threshold,
    )
    .await?;
    Ok(success_one(detail))
}

pub async fn my_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page.resolve(20, 100);
    let (rows, total) = order::list_own(&state.pool, user.id, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn my_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(order::get_own(&state.pool, user.id, id).await?))
}

pub async fn cancel_my_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelBody>>,
) -> Result<impl IntoResponse, AppError> {
    let note = body
        .and_then(|Json(b)| b.reason)
        .or_else(|| Some("Cancelled by customer".into()));
    let detail = order::transition(&state.pool, id, OrderStatus::Cancelled, note, &user).await?;
    Ok(success_one_ok(detail))
}

pub async fn admin_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<OrderQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = PageParams {
        limit: q.limit,
        offset: q.offset,
    }
    .resolve(25, 100);
    let (rows, total) = order::admin_list(&state.pool, &q, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn admin_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(order::get(&state.pool, id).await?))
}

pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusInput>,
) -> Result<impl IntoResponse, AppError> {
    let detail = order::transition(&state.pool, id, body.status, body.note, &admin).await?;
    Ok(success_one_ok(detail))
}

pub async fn set_tracking(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TrackingInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(order::set_tracking(&state.pool, id, body).await?))
}
