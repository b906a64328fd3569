use crate::models::enums::PublishStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_visible: bool,
    pub is_featured: bool,
    pub sort_order: i32,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with nested children, for the storefront menu.
#[derive(Clone, Debug, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

/// Admin list row.
#[derive(Clone, Debug, Serialize, FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub brand: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = Option<String>)]
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub category_id: Option<Uuid>,
    pub status: PublishStatus,
    pub is_visible: bool,
    pub is_featured: bool,
    pub video_url: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Sale price when one is set below the list price.
    pub fn effective_price(&self) -> Decimal {
        effective_price(self.price, self.sale_price)
    }

    pub fn is_purchasable(&self) -> bool {
        self.status == PublishStatus::Published && self.is_visible
    }
}

pub fn effective_price(price: Decimal, sale_price: Option<Decimal>) -> Decimal {
    match sale_price {
        Some(sale) if sale < price => sale,
        _ => price,
    }
}

/// Product card for listings: first image and effective price resolved.
#[derive(Clone, Debug, Serialize, FromRow)]
pub struct ProductListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub image_url: Option<String>,
    pub category_slug: Option<String>,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct ProductSpec {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub value: String,
    pub sort_order: i32,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct ProductVariation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock_quantity: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub effective_price: Decimal,
    pub video_embed_url: Option<String>,
    pub category: Option<Category>,
    pub images: Vec<ProductImage>,
    pub specs: Vec<ProductSpec>,
    pub tags: Vec<Tag>,
    pub variations: Vec<ProductVariation>,
}

#[derive(Clone, Debug, Serialize, FromRow, ToSchema)]
pub struct PrebuiltPc {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock_quantity: i32,
    pub status: PublishStatus,
    pub is_visible: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrebuiltPc {
    pub fn is_purchasable(&self) -> bool {
        self.status == PublishStatus::Published && self.is_visible
    }
}

/// Component line of a prebuilt PC, joined with the component product.
#[derive(Clone, Debug, Serialize, FromRow)]
pub struct PrebuiltComponent {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PrebuiltDetail {
    #[serde(flatten)]
    pub prebuilt: PrebuiltPc,
    pub components: Vec<PrebuiltComponent>,
    /// Σ component price × quantity, for comparison with the bundle price.
    pub components_total: Decimal,
}

pub fn components_total(components: &[PrebuiltComponent]) -> Decimal {
    components
        .iter()
        .map(|c| c.price * Decimal::from(c.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_price_only_when_lower() {
        assert_eq!(effective_price(Decimal::new(10000, 2), Some(Decimal::new(8999, 2))), Decimal::new(8999, 2));
        assert_eq!(effective_price(Decimal::new(10000, 2), Some(Decimal::new(12000, 2))), Decimal::new(10000, 2));
        assert_eq!(effective_price(Decimal::new(10000, 2), None), Decimal::new(10000, 2));
    }

    #[test]
    fn sums_component_prices() {
        let c = |price: i64, quantity: i32| PrebuiltComponent {
            product_id: Uuid::new_v4(),
            name: "part".into(),
            slug: "part".into(),
            sku: "P".into(),
            price: Decimal::new(price, 2),
            quantity,
        };
        let total = components_total(&[c(29999, 1), c(4950, 2)]);
        assert_eq!(total, Decimal::new(39899, 2));
    }
}
