use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::models::UserStatus;
use crate::response::{success_one_ok, success_page, PageParams};
use crate::service::customer::{self, CustomerQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<CustomerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = PageParams {
        limit: q.limit,
        offset: q.offset,
    }
    .resolve(25, 100);
    let (rows, total) = customer::list(&state.pool, &q, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn detail(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(customer::detail(&state.pool, id).await?))
}

pub async fn block(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(customer::set_status(&state.pool, id, UserStatus::Blocked).await?))
}

pub async fn unblock(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(customer::set_status(&state.pool, id, UserStatus::Active).await?))
}
