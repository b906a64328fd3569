use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response::success_one_ok;
use crate::service::seo::{self, SeoInput};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

pub async fn score(_admin: AdminUser, Json(body): Json<SeoInput>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(seo::score(&body)))
}

pub async fn product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(seo::for_product(&state.pool, id).await?))
}

pub async fn blog(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(seo::for_blog(&state.pool, id).await?))
}

pub async fn category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(seo::for_category(&state.pool, id).await?))
}
