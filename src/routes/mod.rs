//! Routers. `app_router` assembles them; the server adds tracing and static files.

pub mod admin;
pub mod common;
pub mod docs;
pub mod storefront;

pub use admin::admin_routes;
pub use common::{common_routes, common_routes_with_ready};
pub use docs::{docs_routes, ApiDoc};
pub use storefront::storefront_routes;

use crate::state::AppState;
use axum::Router;

/// Probes at the root, storefront under /api, admin under /api/admin.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest(
            "/api",
            storefront_routes(state.clone())
                .merge(docs_routes())
                .nest("/admin", admin_routes(state)),
        )
}
