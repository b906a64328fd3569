//! rigstore: storefront and admin backend for a computer-hardware shop, on axum and PostgreSQL.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{AppConfig, SettingsKey};
pub use error::{AppError, ConfigError};
pub use response::{success_many, success_one};
pub use routes::{admin_routes, app_router, common_routes, common_routes_with_ready, docs_routes, storefront_routes};
pub use service::mail::{Mailer, SmtpMailer};
pub use service::upload::{ImageStorage, LocalStorage, S3Storage};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables};
