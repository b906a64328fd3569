use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct TopPage {
    pub path: String,
    pub views: i64,
    pub visitors: i64,
}

#[derive(Clone, Debug, Serialize, FromRow, Default)]
pub struct TrafficStats {
    pub page_views: i64,
    pub unique_visitors: i64,
    pub sessions: i64,
    /// Mean engagement duration over beacons that reported one.
    pub avg_duration_ms: Option<f64>,
}

#[derive(Clone, Debug, Serialize, FromRow, Default)]
pub struct SalesStats {
    pub orders: i64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalyticsSummary {
    pub days: i64,
    pub traffic: TrafficStats,
    pub top_pages: Vec<TopPage>,
    pub sales: SalesStats,
    pub new_customers: i64,
    pub low_stock_products: i64,
}
