use crate::config::SettingsKey;
use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::response::success_one_ok;
use crate::service::settings;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn key(raw: &str) -> Result<SettingsKey, AppError> {
    SettingsKey::parse(raw).ok_or_else(|| AppError::NotFound(format!("settings key {}", raw)))
}

pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let k = key(&raw)?;
    Ok(success_one_ok(settings::admin_view(&state.pool, k).await?))
}

pub async fn put(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(raw): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let k = key(&raw)?;
    Ok(success_one_ok(settings::save(&state.pool, k, body).await?))
}

pub async fn public(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(settings::public(&state.pool).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_is_not_found() {
        assert!(matches!(key("smtp"), Ok(SettingsKey::Smtp)));
        assert!(matches!(key("billing"), Err(AppError::NotFound(_))));
    }
}
