//! Accounts, password hashing and login sessions.

use crate::error::AppError;
use crate::models::{NewNotification, NotificationKind, Role, User};
use crate::service::{notification, validation};
use crate::store::{prefixed, table};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

pub const USER_COLUMNS: &str = "id, email, password_hash, name, phone, role, status, email_verified, verification_token, created_at, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Issued session.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub ttl_secs: i64,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hash: {}", e)))
}

/// False for a wrong password or an unparsable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE email = $1", USER_COLUMNS, table("users"));
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", USER_COLUMNS, table("users"));
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

async fn insert_user(
    pool: &PgPool,
    email: &str,
    password: &str,
    name: &str,
    phone: Option<String>,
    role: Role,
    verified: bool,
) -> Result<User, AppError> {
    let password_hash = hash_password(password)?;
    let verification_token = (!verified).then(|| Uuid::new_v4().simple().to_string());
    let sql = format!(
        "INSERT INTO {} (id, email, password_hash, name, phone, role, email_verified, verification_token) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
        table("users"),
        USER_COLUMNS
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(&password_hash)
        .bind(name)
        .bind(phone)
        .bind(role)
        .bind(verified)
        .bind(verification_token)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

pub async fn register(pool: &PgPool, input: RegisterInput) -> Result<User, AppError> {
    let email = validation::email("email", &input.email)?;
    let name = validation::required("name", &input.name)?;
    validation::max_length("name", &name, 120)?;
    validate_password(&input.password)?;
    if find_by_email(pool, &email).await?.is_some() {
        return Err(AppError::Conflict(format!("email already registered: {}", email)));
    }
    let user = insert_user(
        pool,
        &email,
        &input.password,
        &name,
        validation::optional(input.phone),
        Role::Customer,
        false,
    )
    .await?;
    tracing::info!(user_id = %user.id, "customer registered");
    notification::create(
        pool,
        NewNotification {
            kind: NotificationKind::NewCustomer,
            title: "New customer".into(),
            message: format!("{} ({}) created an account", user.name, user.email),
            link: Some(format!("/admin/customers/{}", user.id)),
            entity_id: Some(user.id),
        },
    )
    .await?;
    Ok(user)
}

/// Check credentials and open a session. Blocked accounts are refused.
pub async fn login(pool: &PgPool, input: LoginInput, ttl_hours: i64) -> Result<Session, AppError> {
    let email = input.email.trim().to_lowercase();
    let user = find_by_email(pool, &email)
        .await?
        .filter(|u| verify_password(&input.password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("invalid email or password".into()))?;
    if user.is_blocked() {
        return Err(AppError::Forbidden("account is blocked".into()));
    }
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    let expires_at = Utc::now() + Duration::hours(ttl_hours);
    sqlx::query(&format!(
        "INSERT INTO {} (token, user_id, expires_at) VALUES ($1, $2, $3)",
        table("sessions")
    ))
    .bind(&token)
    .bind(user.id)
    .bind(expires_at)
    .execute(pool)
    .await?;
    tracing::debug!(user_id = %user.id, "session opened");
    Ok(Session {
        token,
        user,
        ttl_secs: ttl_hours * 3600,
    })
}

pub async fn logout(pool: &PgPool, token: &str) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM {} WHERE token = $1", table("sessions")))
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn revoke_sessions(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", table("sessions")))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

/// User owning an unexpired session token.
pub async fn user_for_token(pool: &PgPool, token: &str) -> Result<Option<User>, AppError> {
    let cols = prefixed(USER_COLUMNS, "u");
    let sql = format!(
        "SELECT {} FROM {} s JOIN {} u ON u.id = s.user_id WHERE s.token = $1 AND s.expires_at > NOW()",
        cols,
        table("sessions"),
        table("users")
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn verify_email(pool: &PgPool, token: &str) -> Result<User, AppError> {
    let sql = format!(
        "UPDATE {} SET email_verified = TRUE, verification_token = NULL, updated_at = NOW() \
         WHERE verification_token = $1 RETURNING {}",
        table("users"),
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(token.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("verification token".into()))
}

/// Create the configured admin account when it does not exist yet.
pub async fn seed_admin(pool: &PgPool, email: &str, password: &str) -> Result<(), AppError> {
    let email = validation::email("ADMIN_EMAIL", email)?;
    validate_password(password)?;
    if find_by_email(pool, &email).await?.is_some() {
        return Ok(());
    }
    let user = insert_user(pool, &email, password, "Administrator", None, Role::Admin, true).await?;
    tracing::info!(user_id = %user.id, email = %email, "seeded admin account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn short_password_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }
}
