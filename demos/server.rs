//! rigstore server: reads config from the environment, prepares the schema, seeds the admin and serves the API.

use rigstore::service::auth::seed_admin;
use rigstore::{app_router, ensure_database_exists, ensure_tables, AppConfig, AppState, ImageStorage, LocalStorage, S3Storage, SmtpMailer};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rigstore=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    ensure_tables(&pool).await?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        seed_admin(&pool, email, password).await?;
    }

    let storage: Arc<dyn ImageStorage> = match &config.s3_bucket {
        Some(bucket) => {
            tracing::info!(bucket = %bucket, "uploads go to S3");
            Arc::new(S3Storage::from_env(bucket, None).await)
        }
        None => {
            tracing::info!(dir = %config.upload_dir.display(), "uploads go to local disk");
            Arc::new(LocalStorage::new(config.upload_dir.clone(), &config.upload_public_base))
        }
    };

    let bind_addr = config.bind_addr.clone();
    let upload_dir = config.upload_dir.clone();
    let upload_base = config.upload_public_base.clone();
    let state = AppState {
        pool,
        config: Arc::new(config),
        storage,
        mailer: Arc::new(SmtpMailer),
    };

    let mut app = app_router(state);
    // A full URL base means files are served elsewhere.
    if upload_base.starts_with('/') {
        app = app.nest_service(&upload_base, ServeDir::new(upload_dir));
    }
    let app = app.layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
