//! Hero banners and the blog.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response::{success_many, success_one, success_one_ok, success_page, PageParams};
use crate::service::content::{self, BannerInput, BannerPatch, BlogCategoryInput, BlogInput, BlogPatch, BlogQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

fn page(q: &BlogQuery) -> (i64, i64) {
    PageParams {
        limit: q.limit,
        offset: q.offset,
    }
    .resolve(12, 100)
}

// ---- banners ----

pub async fn live_banners(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(content::live_banners(&state.pool).await?))
}

pub async fn banners(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(content::all_banners(&state.pool).await?))
}

pub async fn banner(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(content::get_banner(&state.pool, id).await?))
}

pub async fn create_banner(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BannerInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(content::create_banner(&state.pool, body).await?))
}

pub async fn update_banner(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<BannerPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(content::update_banner(&state.pool, id, body).await?))
}

pub async fn delete_banner(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    content::delete_banner(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- blog categories ----

pub async fn blog_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(content::blog_categories(&state.pool).await?))
}

pub async fn admin_blog_categories(State(state): State<AppState>, _admin: AdminUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(content::blog_categories(&state.pool).await?))
}

pub async fn admin_blog_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(content::get_blog_category(&state.pool, id).await?))
}

pub async fn create_blog_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<BlogCategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(content::save_blog_category(&state.pool, None, body).await?))
}

pub async fn update_blog_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<BlogCategoryInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(content::save_blog_category(&state.pool, Some(id), body).await?))
}

pub async fn delete_blog_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    content::delete_blog_category(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- blogs ----

pub async fn blogs(
    State(state): State<AppState>,
    Query(q): Query<BlogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(&q);
    let (rows, total) = content::list_blogs(&state.pool, &q, true, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

/// Counts a view on every hit.
pub async fn blog_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(content::view_published(&state.pool, &slug).await?))
}

pub async fn admin_blogs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<BlogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(&q);
    let (rows, total) = content::list_blogs(&state.pool, &q, false, limit, offset).await?;
    Ok(success_page(rows, total, limit, offset))
}

pub async fn admin_blog(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let blog = content::get_blog(&state.pool, id).await?;
    Ok(success_one_ok(content::blog_detail(&state.pool, blog).await?))
}

pub async fn create_blog(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<BlogInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(content::create_blog(&state.pool, admin.id, body).await?))
}

pub async fn update_blog(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<BlogPatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(content::update_blog(&state.pool, id, body).await?))
}

pub async fn delete_blog(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    content::delete_blog(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
