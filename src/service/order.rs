//! Checkout, order history and the admin fulfilment workflow.

use crate::config::settings::{PaymentSettings, SettingsKey, ShippingSettings, SmtpSettings, StoreSettings};
use crate::error::AppError;
use crate::models::{
    effective_price, NewNotification, NotificationKind, Order, OrderDetail, OrderItem, OrderListItem, OrderStatus,
    PaymentMethod, PaymentStatus, PublishStatus, TimelineEntry, User,
};
use crate::service::cart::{self, CartOwner};
use crate::service::mail::{self, Mailer};
use crate::service::{notification, settings, validation};
use crate::store::{prefixed, table};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub const COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, subtotal, shipping_cost, \
                           tax, total, shipping_address, notes, carrier, tracking_number, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, variation_id, prebuilt_pc_id, name, sku, unit_price, quantity, line_total";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: Option<String>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    fn validate(&self) -> Result<(), AppError> {
        validation::required("shipping_address.full_name", &self.full_name)?;
        validation::required("shipping_address.line1", &self.line1)?;
        validation::required("shipping_address.city", &self.city)?;
        validation::required("shipping_address.postal_code", &self.postal_code)?;
        validation::required("shipping_address.country", &self.country)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackingInput {
    pub carrier: Option<String>,
    pub tracking_number: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    /// Order number or customer email.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `RS-YYYYMMDD-XXXXXX`.
pub fn order_number(date: NaiveDate, suffix: &str) -> String {
    format!("RS-{}-{}", date.format("%Y%m%d"), suffix)
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}

/// Payment status after moving to `next`.
pub fn payment_status_after(next: OrderStatus, method: PaymentMethod, current: PaymentStatus) -> PaymentStatus {
    match next {
        OrderStatus::Delivered if method == PaymentMethod::CashOnDelivery => PaymentStatus::Paid,
        OrderStatus::Refunded => PaymentStatus::Refunded,
        _ => current,
    }
}

fn check_payment_method(method: PaymentMethod, payment: &PaymentSettings) -> Result<(), AppError> {
    let allowed = match method {
        PaymentMethod::CashOnDelivery => payment.cash_on_delivery,
        PaymentMethod::Card | PaymentMethod::BankTransfer => payment.enabled,
    };
    if !allowed {
        return Err(AppError::Validation(format!("payment method {} is not available", method)));
    }
    Ok(())
}

/// A cart line re-read under a row lock.
struct LockedLine {
    product_id: Option<Uuid>,
    variation_id: Option<Uuid>,
    prebuilt_pc_id: Option<Uuid>,
    name: String,
    sku: Option<String>,
    unit_price: Decimal,
    quantity: i32,
    stock: i32,
    purchasable: bool,
}

type LockedRow = (String, Option<String>, Decimal, Option<Decimal>, i32, PublishStatus, bool);

async fn lock_line(
    conn: &mut PgConnection,
    product_id: Option<Uuid>,
    variation_id: Option<Uuid>,
    prebuilt_pc_id: Option<Uuid>,
    quantity: i32,
) -> Result<LockedLine, AppError> {
    let (name, sku, price, sale, stock, status, visible): LockedRow = match (product_id, variation_id, prebuilt_pc_id) {
        (Some(_), Some(vid), _) => sqlx::query_as(&format!(
            "SELECT p.name || ' (' || v.name || ')', COALESCE(v.sku, p.sku), v.price, NULL::numeric, v.stock_quantity, \
             p.status, p.is_visible FROM {} v JOIN {} p ON p.id = v.product_id WHERE v.id = $1 FOR UPDATE OF v",
            table("product_variations"),
            table("products")
        ))
        .bind(vid)
        .fetch_one(&mut *conn)
        .await?,
        (Some(pid), None, _) => sqlx::query_as(&format!(
            "SELECT name, sku, price, sale_price, stock_quantity, status, is_visible FROM {} WHERE id = $1 FOR UPDATE",
            table("products")
        ))
        .bind(pid)
        .fetch_one(&mut *conn)
        .await?,
        (None, _, Some(bid)) => sqlx::query_as(&format!(
            "SELECT name, NULL::text, price, NULL::numeric, stock_quantity, status, is_visible FROM {} WHERE id = $1 FOR UPDATE",
            table("prebuilt_pcs")
        ))
        .bind(bid)
        .fetch_one(&mut *conn)
        .await?,
        _ => return Err(AppError::Internal("cart item without product or prebuilt PC".into())),
    };
    Ok(LockedLine {
        product_id,
        variation_id,
        prebuilt_pc_id,
        name,
        sku,
        unit_price: effective_price(price, sale),
        quantity,
        stock,
        purchasable: status == PublishStatus::Published && visible,
    })
}

/// Row whose `stock_quantity` an order line draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StockTarget {
    Variation(Uuid),
    Product(Uuid),
    Prebuilt(Uuid),
}

impl StockTarget {
    /// None for an item whose catalog row was deleted since.
    pub fn of(product_id: Option<Uuid>, variation_id: Option<Uuid>, prebuilt_pc_id: Option<Uuid>) -> Option<Self> {
        match (product_id, variation_id, prebuilt_pc_id) {
            (_, Some(vid), _) => Some(StockTarget::Variation(vid)),
            (Some(pid), None, _) => Some(StockTarget::Product(pid)),
            (None, None, Some(bid)) => Some(StockTarget::Prebuilt(bid)),
            _ => None,
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            StockTarget::Variation(id) | StockTarget::Product(id) | StockTarget::Prebuilt(id) => id,
        }
    }

    fn table_name(self) -> &'static str {
        match self {
            StockTarget::Variation(_) => "product_variations",
            StockTarget::Product(_) => "products",
            StockTarget::Prebuilt(_) => "prebuilt_pcs",
        }
    }
}

/// Units to put back per stock row when an order is cancelled, summed and in a stable order.
pub fn restock_plan(items: &[(Option<Uuid>, Option<Uuid>, Option<Uuid>, i32)]) -> Vec<(StockTarget, i32)> {
    let mut plan: std::collections::BTreeMap<StockTarget, i32> = std::collections::BTreeMap::new();
    for &(product_id, variation_id, prebuilt_pc_id, quantity) in items {
        if let Some(target) = StockTarget::of(product_id, variation_id, prebuilt_pc_id) {
            *plan.entry(target).or_default() += quantity;
        }
    }
    plan.into_iter().collect()
}

async fn adjust_stock(conn: &mut PgConnection, target: StockTarget, delta: i32) -> Result<(), AppError> {
    sqlx::query(&format!(
        "UPDATE {} SET stock_quantity = stock_quantity + $2 WHERE id = $1",
        table(target.table_name())
    ))
    .bind(target.id())
    .bind(delta)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn append_timeline(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: OrderStatus,
    note: Option<String>,
    actor_id: Option<Uuid>,
) -> Result<(), AppError> {
    sqlx::query(&format!(
        "INSERT INTO {} (id, order_id, status, note, actor_id) VALUES ($1, $2, $3, $4, $5)",
        table("order_timeline")
    ))
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(status)
    .bind(note)
    .bind(actor_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn unused_order_number(conn: &mut PgConnection) -> Result<String, AppError> {
    let today = Utc::now().date_naive();
    for _ in 0..5 {
        let candidate = order_number(today, &random_suffix());
        let (taken,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE order_number = $1)",
            table("orders")
        ))
        .bind(&candidate)
        .fetch_one(&mut *conn)
        .await?;
        if !taken {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal("could not allocate an order number".into()))
}

/// Place an order from the user's cart. Stock is checked and decremented under row locks.
pub async fn checkout(
    pool: &PgPool,
    mailer: &dyn Mailer,
    user: &User,
    input: CheckoutInput,
    low_stock_threshold: i32,
) -> Result<OrderDetail, AppError> {
    if user.is_blocked() {
        return Err(AppError::Forbidden("account is blocked".into()));
    }
    input.shipping_address.validate()?;
    let payment = settings::load::<PaymentSettings>(pool, SettingsKey::Payment).await?;
    check_payment_method(input.payment_method, &payment)?;
    let shipping = settings::load::<ShippingSettings>(pool, SettingsKey::Shipping).await?;
    let store = settings::load::<StoreSettings>(pool, SettingsKey::Store).await?;

    let mut tx = pool.begin().await?;
    let cart = cart::find(&mut *tx, &CartOwner::User(user.id))
        .await?
        .ok_or_else(|| AppError::Validation("cart is empty".into()))?;
    let mut rows = cart::item_rows(&mut *tx, cart.id).await?;
    if rows.is_empty() {
        return Err(AppError::Validation("cart is empty".into()));
    }
    // Lock in a stable order.
    rows.sort_by_key(|r| (r.prebuilt_pc_id, r.variation_id, r.product_id));

    let mut lines = Vec::with_capacity(rows.len());
    for row in &rows {
        let line = lock_line(&mut *tx, row.product_id, row.variation_id, row.prebuilt_pc_id, row.quantity).await?;
        if !line.purchasable {
            return Err(AppError::Conflict(format!("{} is no longer available", line.name)));
        }
        if line.quantity > line.stock {
            return Err(AppError::Conflict(format!(
                "insufficient stock for {}: {} requested, {} available",
                line.name, line.quantity, line.stock
            )));
        }
        lines.push(line);
    }

    let subtotal: Decimal = lines.iter().map(|l| l.unit_price * Decimal::from(l.quantity)).sum();
    let item_count: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
    let totals = cart::totals_for(subtotal, item_count, &shipping, store.tax_rate);

    let number = unused_order_number(&mut *tx).await?;
    let address = serde_json::to_value(&input.shipping_address)
        .map_err(|e| AppError::Internal(format!("shipping address: {}", e)))?;
    let order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO {} (id, order_number, user_id, status, payment_status, payment_method, subtotal, shipping_cost, \
         tax, total, shipping_address, notes) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
        table("orders"),
        COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&number)
    .bind(user.id)
    .bind(OrderStatus::Pending)
    .bind(PaymentStatus::Pending)
    .bind(input.payment_method)
    .bind(totals.subtotal)
    .bind(totals.shipping)
    .bind(totals.tax)
    .bind(totals.total)
    .bind(&address)
    .bind(validation::optional(input.notes))
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        if let Some(target) = StockTarget::of(line.product_id, line.variation_id, line.prebuilt_pc_id) {
            adjust_stock(&mut *tx, target, -line.quantity).await?;
        }
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            "INSERT INTO {} (id, order_id, product_id, variation_id, prebuilt_pc_id, name, sku, unit_price, quantity, line_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            table("order_items"),
            ITEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.variation_id)
        .bind(line.prebuilt_pc_id)
        .bind(&line.name)
        .bind(&line.sku)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(line.unit_price * Decimal::from(line.quantity))
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }
    append_timeline(&mut *tx, order.id, OrderStatus::Pending, Some("Order placed".into()), Some(user.id)).await?;
    cart::clear(&mut *tx, cart.id).await?;
    tx.commit().await?;
    tracing::info!(order_id = %order.id, order_number = %order.order_number, total = %order.total, "order placed");

    notify_after_checkout(pool, &order, &lines, low_stock_threshold).await;
    send_confirmation(pool, mailer, user, &store, &order, &items).await;

    get(pool, order.id).await
}

/// Best effort; the order is committed whatever happens here.
async fn notify_after_checkout(pool: &PgPool, order: &Order, lines: &[LockedLine], threshold: i32) {
    if let Err(e) = after_checkout(pool, order, lines, threshold).await {
        tracing::warn!(order_number = %order.order_number, error = %e, "post-checkout notifications failed");
    }
}

/// Notifications raised by a committed order.
async fn after_checkout(pool: &PgPool, order: &Order, lines: &[LockedLine], threshold: i32) -> Result<(), AppError> {
    notification::create(
        pool,
        NewNotification {
            kind: NotificationKind::NewOrder,
            title: format!("New order {}", order.order_number),
            message: format!("Order {} for {}", order.order_number, order.total),
            link: Some(format!("/admin/orders/{}", order.id)),
            entity_id: Some(order.id),
        },
    )
    .await?;
    for line in lines {
        // Keyed on the row that was decremented, so sibling variations alert independently.
        if let (Some(pid), Some(target)) = (
            line.product_id,
            StockTarget::of(line.product_id, line.variation_id, line.prebuilt_pc_id),
        ) {
            notification::low_stock(pool, pid, target.id(), &line.name, line.stock - line.quantity, threshold).await?;
        }
    }
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table("orders")))
        .fetch_one(pool)
        .await?;
    if let Some(milestone) = notification::order_milestone(count) {
        notification::create(
            pool,
            NewNotification {
                kind: NotificationKind::Milestone,
                title: format!("{} orders", milestone),
                message: format!("The store has received {} orders", milestone),
                link: Some("/admin/orders".into()),
                entity_id: None,
            },
        )
        .await?;
    }
    Ok(())
}

/// Best effort; a failure is logged and the order stands.
async fn send_confirmation(
    pool: &PgPool,
    mailer: &dyn Mailer,
    user: &User,
    store: &StoreSettings,
    order: &Order,
    items: &[OrderItem],
) {
    let smtp = match settings::load::<SmtpSettings>(pool, SettingsKey::Smtp).await {
        Ok(s) if s.is_configured() => s,
        Ok(_) => {
            tracing::debug!(order_number = %order.order_number, "smtp not configured, skipping confirmation");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "loading smtp settings failed");
            return;
        }
    };
    let email = mail::order_confirmation(&user.email, &store.name, &user.name, order, items);
    if let Err(e) = mailer.send(&smtp, &email).await {
        tracing::warn!(order_number = %order.order_number, error = %e, "order confirmation email failed");
    }
}

async fn find(conn: &mut PgConnection, id: Uuid, lock: bool) -> Result<Order, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1{}",
        COLUMNS,
        table("orders"),
        if lock { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<OrderDetail, AppError> {
    let mut conn = pool.acquire().await?;
    let order = find(&mut conn, id, false).await?;
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {} FROM {} WHERE order_id = $1 ORDER BY name",
        ITEM_COLUMNS,
        table("order_items")
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let timeline = sqlx::query_as::<_, TimelineEntry>(&format!(
        "SELECT id, order_id, status, note, actor_id, created_at FROM {} WHERE order_id = $1 ORDER BY created_at, id",
        table("order_timeline")
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(OrderDetail { order, items, timeline })
}

/// Order owned by `user_id`; someone else's order is reported as missing.
pub async fn get_own(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<OrderDetail, AppError> {
    let detail = get(pool, id).await?;
    if detail.order.user_id != Some(user_id) {
        return Err(AppError::NotFound(format!("order {}", id)));
    }
    Ok(detail)
}

pub async fn list_own(pool: &PgPool, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Order>, i64), AppError> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM {} WHERE user_id = $1 ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
        COLUMNS,
        table("orders")
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {} WHERE user_id = $1", table("orders")))
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok((rows, total))
}

fn push_admin_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &OrderQuery) {
    qb.push(" WHERE TRUE");
    if let Some(status) = q.status {
        qb.push(" AND o.status = ").push_bind(status);
    }
    if let Some(text) = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", text);
        qb.push(" AND (o.order_number ILIKE ").push_bind(pattern.clone());
        qb.push(" OR u.email ILIKE ").push_bind(pattern);
        qb.push(")");
    }
}

pub async fn admin_list(pool: &PgPool, q: &OrderQuery, limit: i64, offset: i64) -> Result<(Vec<OrderListItem>, i64), AppError> {
    let from = format!(
        " FROM {} o LEFT JOIN {} u ON u.id = o.user_id",
        table("orders"),
        table("users")
    );
    let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){}", from));
    push_admin_filters(&mut count_qb, q);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {}, u.name AS customer_name, u.email AS customer_email, \
         (SELECT COALESCE(SUM(i.quantity), 0) FROM {} i WHERE i.order_id = o.id) AS item_count{}",
        prefixed(COLUMNS, "o"),
        table("order_items"),
        from
    ));
    push_admin_filters(&mut qb, q);
    qb.push(" ORDER BY o.created_at DESC, o.id LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<OrderListItem>().fetch_all(pool).await?;
    Ok((rows, total))
}

/// Move an order to `next`, restoring stock on cancellation and appending a timeline entry.
pub async fn transition(
    pool: &PgPool,
    id: Uuid,
    next: OrderStatus,
    note: Option<String>,
    actor: &User,
) -> Result<OrderDetail, AppError> {
    let mut tx = pool.begin().await?;
    let order = find(&mut *tx, id, true).await?;
    if !actor.is_admin() {
        if order.user_id != Some(actor.id) {
            return Err(AppError::NotFound(format!("order {}", id)));
        }
        if next != OrderStatus::Cancelled || order.status != OrderStatus::Pending {
            return Err(AppError::Validation("orders can only be cancelled while pending".into()));
        }
    }
    if !order.status.can_transition_to(next) {
        return Err(AppError::Validation(format!(
            "cannot move order from {} to {}",
            order.status, next
        )));
    }
    if next == OrderStatus::Cancelled {
        let lines: Vec<(Option<Uuid>, Option<Uuid>, Option<Uuid>, i32)> = sqlx::query_as(&format!(
            "SELECT product_id, variation_id, prebuilt_pc_id, quantity FROM {} WHERE order_id = $1",
            table("order_items")
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        for (target, quantity) in restock_plan(&lines) {
            adjust_stock(&mut *tx, target, quantity).await?;
        }
    }
    let payment_status = payment_status_after(next, order.payment_method, order.payment_status);
    sqlx::query(&format!(
        "UPDATE {} SET status = $2, payment_status = $3, updated_at = NOW() WHERE id = $1",
        table("orders")
    ))
    .bind(id)
    .bind(next)
    .bind(payment_status)
    .execute(&mut *tx)
    .await?;
    append_timeline(&mut *tx, id, next, validation::optional(note), Some(actor.id)).await?;
    tx.commit().await?;
    tracing::info!(
        order_id = %id,
        from = %order.status,
        to = %next,
        actor = %actor.id,
        "order status changed"
    );
    get(pool, id).await
}

pub async fn set_tracking(pool: &PgPool, id: Uuid, input: TrackingInput) -> Result<OrderDetail, AppError> {
    let tracking = validation::required("tracking_number", &input.tracking_number)?;
    let res = sqlx::query(&format!(
        "UPDATE {} SET carrier = $2, tracking_number = $3, updated_at = NOW() WHERE id = $1",
        table("orders")
    ))
    .bind(id)
    .bind(validation::optional(input.carrier))
    .bind(&tracking)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("order {}", id)));
    }
    tracing::info!(order_id = %id, tracking = %tracking, "tracking number set");
    get(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(order_number(date, "A1B2C3"), "RS-20260307-A1B2C3");
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn cod_paid_on_delivery() {
        assert_eq!(
            payment_status_after(OrderStatus::Delivered, PaymentMethod::CashOnDelivery, PaymentStatus::Pending),
            PaymentStatus::Paid
        );
        assert_eq!(
            payment_status_after(OrderStatus::Delivered, PaymentMethod::Card, PaymentStatus::Paid),
            PaymentStatus::Paid
        );
        assert_eq!(
            payment_status_after(OrderStatus::Refunded, PaymentMethod::Card, PaymentStatus::Paid),
            PaymentStatus::Refunded
        );
        assert_eq!(
            payment_status_after(OrderStatus::Shipped, PaymentMethod::CashOnDelivery, PaymentStatus::Pending),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn cancellation_restocks_each_row_once() {
        let (p1, p2, v1, b1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            (Some(p1), None, None, 2),
            (Some(p2), Some(v1), None, 1),
            (Some(p1), None, None, 3),
            (None, None, Some(b1), 1),
            (None, None, None, 4),
            (Some(p2), Some(v1), None, 2),
        ];
        let mut plan = restock_plan(&items);
        plan.sort_by_key(|(target, _)| target.id());
        let mut expected = vec![
            (StockTarget::Product(p1), 5),
            (StockTarget::Variation(v1), 3),
            (StockTarget::Prebuilt(b1), 1),
        ];
        expected.sort_by_key(|(target, _)| target.id());
        assert_eq!(plan, expected);
    }

    #[test]
    fn variation_takes_precedence_over_product() {
        let (pid, vid) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(StockTarget::of(Some(pid), Some(vid), None), Some(StockTarget::Variation(vid)));
        assert_eq!(StockTarget::of(Some(pid), None, None), Some(StockTarget::Product(pid)));
        assert_eq!(StockTarget::of(None, None, None), None);
    }

    #[tokio::test]
    async fn failed_notifications_do_not_fail_checkout() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://rigstore@127.0.0.1:1/rigstore")
            .unwrap();
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: "RS-20260307-A1B2C3".into(),
            user_id: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            subtotal: Decimal::new(100, 0),
            shipping_cost: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::new(100, 0),
            shipping_address: serde_json::json!({}),
            notes: None,
            carrier: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        };
        assert!(after_checkout(&pool, &order, &[], 5).await.is_err());
        notify_after_checkout(&pool, &order, &[], 5).await;
    }

    #[test]
    fn disabled_payment_methods_refused() {
        let payment = PaymentSettings {
            cash_on_delivery: false,
            ..Default::default()
        };
        assert!(check_payment_method(PaymentMethod::CashOnDelivery, &payment).is_err());
        assert!(check_payment_method(PaymentMethod::Card, &payment).is_ok());
    }

    #[test]
    fn address_requires_core_fields() {
        let mut addr = ShippingAddress {
            full_name: "Ada Lovelace".into(),
            phone: None,
            line1: "12 Analytical Way".into(),
            line2: None,
            city: "London".into(),
            state: None,
            postal_code: "N1 9GU".into(),
            country: "GB".into(),
        };
        assert!(addr.validate().is_ok());
        addr.city = "  ".into();
        assert!(addr.validate().is_err());
    }
}
