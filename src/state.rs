//! Shared application state for all routes.

use crate::config::AppConfig;
use crate::service::mail::Mailer;
use crate::service::upload::ImageStorage;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Local disk or S3, picked at startup from `S3_BUCKET`.
    pub storage: Arc<dyn ImageStorage>,
    pub mailer: Arc<dyn Mailer>,
}
