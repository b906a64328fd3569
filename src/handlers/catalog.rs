//! Categories, products and prebuilt PCs: storefront reads and admin management.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::models::PublishStatus;
use crate::response::{success_many, success_one, success_one_ok, success_page};
use crate::service::category::{self, CategoryInput, CategoryPatch};
use crate::service::prebuilt::{self, PrebuiltInput, PrebuiltPatch};
use crate::service::product::{self, ProductInput, ProductPatch, ProductQuery};
use crate::service::tag;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Default)]
pub struct FeaturedQuery {
    pub featured: Option<bool>,
}

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: PublishStatus,
}

// ---- categories ----

/// Nested tree, or a flat list of featured categories with `?featured=true`.
pub async fn category_tree(
    State(state): State<AppState>,
    Query(q): Query<FeaturedQuery>,
) -> Result<impl IntoResponse, AppError> {
    if q.featured == Some(true) {
        let rows = category::featured(&state.pool).await?;
        return Ok(success_many(rows).into_response());
    }
    let tree = category::visible_tree(&state.pool).await?;
    Ok(success_many(tree).into_response())
}

pub async fn category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let node = category::visible_by_slug(&state.pool, &slug).await?;
    Ok(success_one_ok(node))
}

pub async fn admin_categories(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    let rows = category::admin_list(&state.pool).await?;
    Ok(success_many(rows))
}

pub async fn admin_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(category::get(&state.pool, id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(category::create(&state.pool, body).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CategoryPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(category::update(&state.pool, id, body).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    category::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- products ----

pub async fn products(
    State(state): State<AppState>,
    Query(q): Query<ProductQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, limit, offset) = product::search(&state.pool, &q, true).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(product::storefront_detail(&state.pool, &slug).await?))
}

pub async fn tags(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(tag::list(&state.pool).await?))
}

pub async fn admin_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<ProductQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (rows, total, limit, offset) = product::search(&state.pool, &q, false).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn admin_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let p = product::get(&state.pool, id).await?;
    Ok(success_one_ok(product::detail(&state.pool, p).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<ProductInput>,
) -> Result<impl IntoResponse, AppError> {
    let detail = product::create(&state.pool, body, state.config.low_stock_threshold).await?;
    Ok(success_one(detail))
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductPatch>,
) -> Result<impl IntoResponse, AppError> {
    let detail = product::update(&state.pool, id, body, state.config.low_stock_threshold).await?;
    Ok(success_one_ok(detail))
}

pub async fn set_product_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(product::set_status(&state.pool, id, body.status).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    product::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- prebuilt PCs ----

pub async fn prebuilts(
    State(state): State<AppState>,
    Query(q): Query<FeaturedQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(prebuilt::storefront_list(&state.pool, q.featured).await?))
}

pub async fn prebuilt_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(prebuilt::storefront_detail(&state.pool, &slug).await?))
}

pub async fn admin_prebuilts(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(prebuilt::admin_list(&state.pool).await?))
}

pub async fn admin_prebuilt(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(prebuilt::get(&state.pool, id).await?))
}

pub async fn create_prebuilt(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<PrebuiltInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(prebuilt::create(&state.pool, body).await?))
}

pub async fn update_prebuilt(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PrebuiltPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(prebuilt::update(&state.pool, id, body).await?))
}

pub async fn delete_prebuilt(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    prebuilt::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
