//! Admin routes, nested under /api/admin. Every handler takes `AdminUser`.

use crate::handlers::{analytics, catalog, content, customer, marketing, notification, order, seo, settings, upload};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

/// Room for multipart boundaries and the `folder` field on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Image uploads get their own body limit instead of axum's 2 MiB default.
fn upload_routes(limit: usize) -> Router<AppState> {
    Router::new()
        .route("/uploads", post(upload::upload_image))
        .route_layer(DefaultBodyLimit::disable())
        .route_layer(RequestBodyLimitLayer::new(limit))
}

pub fn admin_routes(state: AppState) -> Router {
    let upload_limit = state.config.upload_max_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/categories", get(catalog::admin_categories).post(catalog::create_category))
        .route(
            "/categories/:id",
            get(catalog::admin_category)
                .patch(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route("/products", get(catalog::admin_products).post(catalog::create_product))
        .route(
            "/products/:id",
            get(catalog::admin_product)
                .patch(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/products/:id/status", patch(catalog::set_product_status))
        .route("/prebuilt-pcs", get(catalog::admin_prebuilts).post(catalog::create_prebuilt))
        .route(
            "/prebuilt-pcs/:id",
            get(catalog::admin_prebuilt)
                .patch(catalog::update_prebuilt)
                .delete(catalog::delete_prebuilt),
        )
        .route("/orders", get(order::admin_orders))
        .route("/orders/:id", get(order::admin_order))
        .route("/orders/:id/status", patch(order::set_status))
        .route("/orders/:id/tracking", patch(order::set_tracking))
        .route("/customers", get(customer::list))
        .route("/customers/:id", get(customer::detail))
        .route("/customers/:id/block", post(customer::block))
        .route("/customers/:id/unblock", post(customer::unblock))
        .route("/notifications", get(notification::list))
        .route("/notifications/read-all", post(notification::mark_all_read))
        .route("/notifications/bulk-delete", post(notification::bulk_delete))
        .route("/notifications/read", delete(notification::delete_read))
        .route("/notifications/:id", delete(notification::delete))
        .route("/notifications/:id/read", patch(notification::mark_read))
        .route("/notifications/:id/unread", patch(notification::mark_unread))
        .route("/banners", get(content::banners).post(content::create_banner))
        .route(
            "/banners/:id",
            get(content::banner)
                .patch(content::update_banner)
                .delete(content::delete_banner),
        )
        .route(
            "/blog-categories",
            get(content::admin_blog_categories).post(content::create_blog_category),
        )
        .route(
            "/blog-categories/:id",
            get(content::admin_blog_category)
                .put(content::update_blog_category)
                .delete(content::delete_blog_category),
        )
        .route("/blogs", get(content::admin_blogs).post(content::create_blog))
        .route(
            "/blogs/:id",
            get(content::admin_blog)
                .patch(content::update_blog)
                .delete(content::delete_blog),
        )
        .route("/marketing/send", post(marketing::send))
        .route("/marketing/campaigns", get(marketing::campaigns))
        .route("/marketing/test", post(marketing::send_test))
        .route("/marketing/subscribers", get(marketing::subscribers))
        .route("/analytics/summary", get(analytics::summary))
        .route("/seo/score", post(seo::score))
        .route("/seo/products/:id", get(seo::product))
        .route("/seo/blogs/:id", get(seo::blog))
        .route("/seo/categories/:id", get(seo::category))
        .route("/settings/:key", get(settings::get).put(settings::put))
        .merge(upload_routes(upload_limit))
        .with_state(state)
}
