use crate::error::AppError;
use crate::extractors::{AdminUser, MaybeUser};
use crate::response::success_one_ok;
use crate::service::analytics::{self, TrackInput};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

/// Beacon endpoint; signed-in visitors are attributed.
pub async fn track(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(body): Json<TrackInput>,
) -> Result<impl IntoResponse, AppError> {
    analytics::track(&state.pool, body, user.map(|u| u.id)).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn summary(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<SummaryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let days = analytics::resolve_days(q.days)?;
    let report = analytics::summary(&state.pool, days, state.config.low_stock_threshold).await?;
    Ok(success_one_ok(report))
}
