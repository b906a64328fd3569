//! Cookie and bearer-token extraction.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};

/// Cookie carrying the login session token.
pub const SESSION_COOKIE: &str = "rig_session";
/// Cookie carrying the guest cart session id.
pub const CART_COOKIE: &str = "rig_cart";

/// Value of cookie `name` across all Cookie headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    bearer.or_else(|| cookie_value(headers, SESSION_COOKIE))
}

/// `Set-Cookie` value; a zero max-age clears the cookie.
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age_secs.max(0)
    ))
    .ok()
}

/// Guest cart id from the `rig_cart` cookie. Only UUID-shaped values are accepted.
#[derive(Clone, Debug)]
pub struct CartSessionId(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for CartSessionId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = cookie_value(&parts.headers, CART_COOKIE)
            .filter(|v| uuid::Uuid::parse_str(v).is_ok());
        Ok(CartSessionId(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.append(k.clone(), HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn reads_cookie_among_many() {
        let h = headers(&[
            (header::COOKIE, "theme=dark; rig_cart=abc"),
            (header::COOKIE, "rig_session=tok123"),
        ]);
        assert_eq!(cookie_value(&h, CART_COOKIE).as_deref(), Some("abc"));
        assert_eq!(cookie_value(&h, SESSION_COOKIE).as_deref(), Some("tok123"));
        assert_eq!(cookie_value(&h, "missing"), None);
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "rig_session=from-cookie"),
        ]);
        assert_eq!(session_token(&h).as_deref(), Some("from-header"));
        let h = headers(&[(header::COOKIE, "rig_session=from-cookie")]);
        assert_eq!(session_token(&h).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn set_cookie_format() {
        let v = set_cookie(CART_COOKIE, "x", 60).unwrap();
        assert_eq!(v.to_str().unwrap(), "rig_cart=x; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
    }
}
