//! OpenAPI document for the request and response schemas.

use crate::config::{SeasonalEffect, StoreSettings};
use crate::models::{
    Audience, Category, NotificationKind, OrderStatus, PaymentMethod, PaymentStatus, PrebuiltPc, Product,
    ProductImage, ProductSpec, ProductVariation, PublishStatus, Role, Tag, TrackEvent, User, UserStatus,
};
use crate::service::auth::{LoginInput, RegisterInput};
use crate::service::seo::{SeoCheck, SeoInput, SeoReport};
use crate::service::settings::PublicSettings;
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "rigstore", description = "Computer-hardware storefront and admin API"),
    components(schemas(
        User,
        Role,
        UserStatus,
        RegisterInput,
        LoginInput,
        Category,
        Product,
        ProductImage,
        ProductSpec,
        ProductVariation,
        Tag,
        PrebuiltPc,
        PublishStatus,
        OrderStatus,
        PaymentStatus,
        PaymentMethod,
        NotificationKind,
        Audience,
        TrackEvent,
        StoreSettings,
        SeasonalEffect,
        PublicSettings,
        SeoInput,
        SeoCheck,
        SeoReport,
    ))
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// GET /openapi.json; nest under /api.
pub fn docs_routes() -> Router {
    Router::new().route("/openapi.json", get(openapi))
}
