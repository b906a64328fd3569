//! Process configuration read from the environment (after `dotenvy`).

use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    /// Session lifetime after login.
    pub session_ttl_hours: i64,
    pub upload_max_bytes: usize,
    pub upload_dir: PathBuf,
    /// URL prefix under which locally stored uploads are served.
    pub upload_public_base: String,
    /// When set, uploads go to this S3 bucket instead of `upload_dir`.
    pub s3_bucket: Option<String>,
    pub low_stock_threshold: i32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        Ok(AppConfig {
            database_url,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 5)?,
            session_ttl_hours: parse_or(get("SESSION_TTL_HOURS"), "SESSION_TTL_HOURS", 720)?,
            upload_max_bytes: parse_or(get("UPLOAD_MAX_BYTES"), "UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./uploads")),
            upload_public_base: get("UPLOAD_PUBLIC_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "/uploads".into()),
            s3_bucket: get("S3_BUCKET"),
            low_stock_threshold: parse_or(get("LOW_STOCK_THRESHOLD"), "LOW_STOCK_THRESHOLD", 5)?,
            admin_email: get("ADMIN_EMAIL"),
            admin_password: get("ADMIN_PASSWORD"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/rig")])).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.upload_max_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.low_stock_threshold, 5);
        assert!(cfg.s3_bucket.is_none());
        assert_eq!(cfg.upload_public_base, "/uploads");
    }

    #[test]
    fn database_url_required() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn invalid_number_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/rig"),
            ("LOW_STOCK_THRESHOLD", "few"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LOW_STOCK_THRESHOLD", .. }));
    }
}
