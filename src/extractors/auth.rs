//! Authenticated-user extractors backed by the sessions table.

use crate::error::AppError;
use crate::extractors::session::session_token;
use crate::models::User;
use crate::service::auth::user_for_token;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Logged-in, non-blocked user. 401 without a valid session.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Logged-in user if any; invalid tokens are treated as anonymous.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<User>);

/// Logged-in user with the ADMIN role. 403 for customers.
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

/// Session lookup result to an authenticated user: 401 when missing, 403 when blocked.
fn admit(user: Option<User>) -> Result<User, AppError> {
    let user = user.ok_or_else(|| AppError::Unauthorized("session expired or invalid".into()))?;
    if user.is_blocked() {
        return Err(AppError::Forbidden("account is blocked".into()));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        let user = user_for_token(&state.pool, &token).await?;
        Ok(MaybeUser(user.filter(|u| !u.is_blocked())))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("login required".into()))?;
        admit(user_for_token(&state.pool, &token).await?).map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("admin role required".into()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn user(status: UserStatus) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            name: "Ada".into(),
            phone: None,
            role: Role::Customer,
            status,
            email_verified: true,
            verification_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_session_is_unauthorized() {
        assert!(matches!(admit(None), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn blocked_user_is_forbidden() {
        assert!(matches!(admit(Some(user(UserStatus::Blocked))), Err(AppError::Forbidden(_))));
        let active = admit(Some(user(UserStatus::Active))).unwrap();
        assert_eq!(active.status, UserStatus::Active);
    }
}
