//! Public and customer routes under /api.

use crate::handlers::{analytics, auth, cart, catalog, content, marketing, order, settings};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub fn storefront_routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/categories", get(catalog::category_tree))
        .route("/categories/:slug", get(catalog::category_by_slug))
        .route("/products", get(catalog::products))
        .route("/products/:slug", get(catalog::product_by_slug))
        .route("/tags", get(catalog::tags))
        .route("/prebuilt-pcs", get(catalog::prebuilts))
        .route("/prebuilt-pcs/:slug", get(catalog::prebuilt_by_slug))
        .route("/cart", get(cart::get_cart).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:id", patch(cart::update_item).delete(cart::remove_item))
        .route("/orders", get(order::my_orders))
        .route("/orders/checkout", post(order::checkout))
        .route("/orders/:id", get(order::my_order))
        .route("/orders/:id/cancel", post(order::cancel_my_order))
        .route("/banners", get(content::live_banners))
        .route("/blogs", get(content::blogs))
        .route("/blogs/:slug", get(content::blog_by_slug))
        .route("/blog-categories", get(content::blog_categories))
        .route("/newsletter", post(marketing::subscribe))
        .route("/newsletter/unsubscribe", post(marketing::unsubscribe))
        .route("/analytics/track", post(analytics::track))
        .route("/settings/public", get(settings::public))
        .with_state(state)
}
