use crate::models::catalog::effective_price;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[serde(skip)]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cart item joined with whatever it points at (product, variation or prebuilt PC).
#[derive(Clone, Debug, FromRow)]
pub struct CartItemRow {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub prebuilt_pc_id: Option<Uuid>,
    pub quantity: i32,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub variation_name: Option<String>,
    pub base_price: Decimal,
    pub sale_price: Option<Decimal>,
    pub variation_price: Option<Decimal>,
    pub available_stock: i32,
}

impl CartItemRow {
    /// Variation price, else the product's effective price (or the bundle price).
    pub fn unit_price(&self) -> Decimal {
        self.variation_price
            .unwrap_or_else(|| effective_price(self.base_price, self.sale_price))
    }

    pub fn into_line(self) -> CartLine {
        let unit_price = self.unit_price();
        CartLine {
            line_total: unit_price * Decimal::from(self.quantity),
            unit_price,
            id: self.id,
            product_id: self.product_id,
            variation_id: self.variation_id,
            prebuilt_pc_id: self.prebuilt_pc_id,
            name: self.name,
            slug: self.slug,
            image_url: self.image_url,
            variation_name: self.variation_name,
            quantity: self.quantity,
            available_stock: self.available_stock,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub prebuilt_pc_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub variation_name: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub available_stock: i32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CartTotals {
    pub item_count: i64,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartLine>,
    #[serde(flatten)]
    pub totals: CartTotals,
}
