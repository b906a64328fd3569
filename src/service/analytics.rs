//! Storefront traffic beacons and the admin dashboard summary.

use crate::error::AppError;
use crate::models::{AnalyticsSummary, OrderStatus, PublishStatus, Role, SalesStats, TopPage, TrackEvent, TrafficStats};
use crate::service::cart::round_money;
use crate::store::table;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct TrackInput {
    pub session_id: String,
    pub visitor_id: String,
    pub path: String,
    pub referrer: Option<String>,
    pub event: TrackEvent,
    pub duration_ms: Option<i64>,
    pub scroll_depth: Option<i32>,
}

fn id_field(field: &str, value: &str) -> Result<String, AppError> {
    let v = value.trim();
    if v.is_empty() || v.len() > 64 {
        return Err(AppError::Validation(format!("{} must be 1-64 characters", field)));
    }
    Ok(v.to_string())
}

impl TrackInput {
    fn validate(&self) -> Result<(), AppError> {
        id_field("session_id", &self.session_id)?;
        id_field("visitor_id", &self.visitor_id)?;
        if !self.path.starts_with('/') || self.path.len() > 2048 {
            return Err(AppError::Validation("path must start with '/'".into()));
        }
        if let Some(depth) = self.scroll_depth {
            if !(0..=100).contains(&depth) {
                return Err(AppError::Validation("scroll_depth must be between 0 and 100".into()));
            }
        }
        if self.duration_ms.map(|d| d < 0).unwrap_or(false) {
            return Err(AppError::Validation("duration_ms must not be negative".into()));
        }
        Ok(())
    }
}

pub async fn track(pool: &PgPool, input: TrackInput, user_id: Option<Uuid>) -> Result<(), AppError> {
    input.validate()?;
    sqlx::query(&format!(
        "INSERT INTO {} (session_id, visitor_id, path, referrer, event, duration_ms, scroll_depth, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        table("page_views")
    ))
    .bind(input.session_id.trim())
    .bind(input.visitor_id.trim())
    .bind(&input.path)
    .bind(input.referrer.filter(|r| !r.trim().is_empty()))
    .bind(input.event)
    .bind(input.duration_ms)
    .bind(input.scroll_depth)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Window length in days, 1-365.
pub fn resolve_days(days: Option<i64>) -> Result<i64, AppError> {
    let days = days.unwrap_or(DEFAULT_DAYS);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(AppError::Validation(format!("days must be between 1 and {}", MAX_DAYS)));
    }
    Ok(days)
}

pub fn average_order_value(revenue: Decimal, orders: i64) -> Decimal {
    if orders == 0 {
        Decimal::ZERO
    } else {
        round_money(revenue / Decimal::from(orders))
    }
}

pub async fn summary(pool: &PgPool, days: i64, low_stock_threshold: i32) -> Result<AnalyticsSummary, AppError> {
    let window = "created_at >= NOW() - make_interval(days => $1)";
    let days_arg = days as i32;

    let traffic = sqlx::query_as::<_, TrafficStats>(&format!(
        "SELECT COUNT(*) FILTER (WHERE event = $2) AS page_views, \
                COUNT(DISTINCT visitor_id) AS unique_visitors, \
                COUNT(DISTINCT session_id) AS sessions, \
                (AVG(duration_ms) FILTER (WHERE event = $3 AND duration_ms IS NOT NULL))::float8 AS avg_duration_ms \
         FROM {} WHERE {}",
        table("page_views"),
        window
    ))
    .bind(days_arg)
    .bind(TrackEvent::PageView)
    .bind(TrackEvent::Engagement)
    .fetch_one(pool)
    .await?;

    let top_pages = sqlx::query_as::<_, TopPage>(&format!(
        "SELECT path, COUNT(*) AS views, COUNT(DISTINCT visitor_id) AS visitors FROM {} \
         WHERE {} AND event = $2 GROUP BY path ORDER BY views DESC, path LIMIT 10",
        table("page_views"),
        window
    ))
    .bind(days_arg)
    .bind(TrackEvent::PageView)
    .fetch_all(pool)
    .await?;

    let (orders, revenue): (i64, Decimal) = sqlx::query_as(&format!(
        "SELECT COUNT(*), COALESCE(SUM(total), 0) FROM {} WHERE {} AND status = ANY($2)",
        table("orders"),
        window
    ))
    .bind(days_arg)
    .bind(OrderStatus::revenue_statuses())
    .fetch_one(pool)
    .await?;

    let (new_customers,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE {} AND role = $2",
        table("users"),
        window
    ))
    .bind(days_arg)
    .bind(Role::Customer)
    .fetch_one(pool)
    .await?;

    let (low_stock_products,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE stock_quantity <= $1 AND status <> $2",
        table("products")
    ))
    .bind(low_stock_threshold)
    .bind(PublishStatus::Archived)
    .fetch_one(pool)
    .await?;

    Ok(AnalyticsSummary {
        days,
        traffic,
        top_pages,
        sales: SalesStats {
            orders,
            revenue,
            average_order_value: average_order_value(revenue, orders),
        },
        new_customers,
        low_stock_products,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon() -> TrackInput {
        TrackInput {
            session_id: "s-1".into(),
            visitor_id: "v-1".into(),
            path: "/products/rtx-4090".into(),
            referrer: None,
            event: TrackEvent::PageView,
            duration_ms: None,
            scroll_depth: Some(40),
        }
    }

    #[test]
    fn beacon_checks() {
        assert!(beacon().validate().is_ok());
        let mut b = beacon();
        b.path = "https://evil.example/".into();
        assert!(b.validate().is_err());
        let mut b = beacon();
        b.scroll_depth = Some(101);
        assert!(b.validate().is_err());
        let mut b = beacon();
        b.session_id = " ".into();
        assert!(b.validate().is_err());
    }

    #[test]
    fn day_window_bounds() {
        assert_eq!(resolve_days(None).unwrap(), 30);
        assert_eq!(resolve_days(Some(365)).unwrap(), 365);
        assert!(resolve_days(Some(0)).is_err());
        assert!(resolve_days(Some(366)).is_err());
    }

    #[test]
    fn aov_rounds_and_handles_zero() {
        assert_eq!(average_order_value(Decimal::ZERO, 0), Decimal::ZERO);
        assert_eq!(average_order_value(Decimal::new(10000, 2), 3), Decimal::new(3333, 2));
    }
}
