use crate::models::enums::{OrderStatus, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub shipping_address: serde_json::Value,
    pub notes: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub prebuilt_pc_id: Option<Uuid>,
    pub name: String,
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub note: Option<String>,
    pub actor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Admin list row: order plus customer contact.
#[derive(Clone, Debug, Serialize, FromRow)]
pub struct OrderListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub item_count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub timeline: Vec<TimelineEntry>,
}

impl OrderStatus {
    /// Allowed next states. CANCELLED and REFUNDED are terminal.
    pub fn next_states(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.next_states().contains(&next)
    }

    /// Statuses whose orders count toward revenue.
    pub fn counts_as_revenue(self) -> bool {
        !matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }

    /// Text values of every revenue-counting status.
    pub fn revenue_statuses() -> Vec<&'static str> {
        OrderStatus::ALL
            .iter()
            .copied()
            .filter(|s| s.counts_as_revenue())
            .map(OrderStatus::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn linear_progression_allowed() {
        let path = [Pending, Confirmed, Processing, Shipped, Delivered, Refunded];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn skips_and_reversals_rejected() {
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancel_only_before_shipping() {
        for s in [Pending, Confirmed, Processing] {
            assert!(s.can_transition_to(Cancelled));
        }
        assert!(Cancelled.next_states().is_empty());
        assert!(Refunded.next_states().is_empty());
        assert!(!Delivered.next_states().is_empty());
    }

    #[test]
    fn cancelled_and_refunded_are_not_revenue() {
        let statuses = OrderStatus::revenue_statuses();
        assert_eq!(statuses, vec!["PENDING", "CONFIRMED", "PROCESSING", "SHIPPED", "DELIVERED"]);
    }
}
