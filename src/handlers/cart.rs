//! Cart endpoints. Guests get a `rig_cart` cookie the first time they touch the cart.

use crate::error::AppError;
use crate::extractors::{set_cookie, CartSessionId, MaybeUser, CART_COOKIE};
use crate::models::Cart;
use crate::response::success_one_ok;
use crate::service::cart::{self, AddItemInput, CartOwner, UpdateItemInput};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

const GUEST_CART_MAX_AGE_SECS: i64 = 30 * 24 * 3600;

/// Owner for this request plus the cookie to set when a guest id was minted.
pub fn owner_for(user: &MaybeUser, guest: &CartSessionId) -> (CartOwner, HeaderMap) {
    let mut headers = HeaderMap::new();
    if let Some(u) = &user.0 {
        return (CartOwner::User(u.id), headers);
    }
    match &guest.0 {
        Some(sid) => (CartOwner::Guest(sid.clone()), headers),
        None => {
            let sid = Uuid::new_v4().to_string();
            if let Some(cookie) = set_cookie(CART_COOKIE, &sid, GUEST_CART_MAX_AGE_SECS) {
                headers.insert(SET_COOKIE, cookie);
            }
            (CartOwner::Guest(sid), headers)
        }
    }
}

async fn resolve(state: &AppState, user: &MaybeUser, guest: &CartSessionId) -> Result<(Cart, HeaderMap), AppError> {
    let (owner, headers) = owner_for(user, guest);
    let cart = cart::resolve(&state.pool, &owner).await?;
    Ok((cart, headers))
}

pub async fn get_cart(
    State(state): State<AppState>,
    user: MaybeUser,
    guest: CartSessionId,
) -> Result<impl IntoResponse, AppError> {
    let (c, headers) = resolve(&state, &user, &guest).await?;
    let view = cart::view(&state.pool, &c).await?;
    Ok((headers, success_one_ok(view)))
}

pub async fn add_item(
    State(state): State<AppState>,
    user: MaybeUser,
    guest: CartSessionId,
    Json(body): Json<AddItemInput>,
) -> Result<impl IntoResponse, AppError> {
    let (c, headers) = resolve(&state, &user, &guest).await?;
    cart::add_item(&state.pool, &c, body).await?;
    let view = cart::view(&state.pool, &c).await?;
    Ok((headers, success_one_ok(view)))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: MaybeUser,
    guest: CartSessionId,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateItemInput>,
) -> Result<impl IntoResponse, AppError> {
    let (c, headers) = resolve(&state, &user, &guest).await?;
    cart::update_item(&state.pool, &c, item_id, body.quantity).await?;
    let view = cart::view(&state.pool, &c).await?;
    Ok((headers, success_one_ok(view)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: MaybeUser,
    guest: CartSessionId,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (c, headers) = resolve(&state, &user, &guest).await?;
    cart::remove_item(&state.pool, &c, item_id).await?;
    let view = cart::view(&state.pool, &c).await?;
    Ok((headers, success_one_ok(view)))
}

pub async fn clear(
    State(state): State<AppState>,
    user: MaybeUser,
    guest: CartSessionId,
) -> Result<impl IntoResponse, AppError> {
    let (c, headers) = resolve(&state, &user, &guest).await?;
    let mut conn = state.pool.acquire().await?;
    cart::clear(&mut conn, c.id).await?;
    let view = cart::view(&state.pool, &c).await?;
    Ok((headers, success_one_ok(view)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_without_cookie_gets_one() {
        let (owner, headers) = owner_for(&MaybeUser(None), &CartSessionId(None));
        let CartOwner::Guest(sid) = owner else {
            panic!("expected guest owner");
        };
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("{}={}", CART_COOKIE, sid)));
    }

    #[test]
    fn returning_guest_keeps_id() {
        let sid = Uuid::new_v4().to_string();
        let (owner, headers) = owner_for(&MaybeUser(None), &CartSessionId(Some(sid.clone())));
        assert_eq!(owner, CartOwner::Guest(sid));
        assert!(headers.is_empty());
    }
}
