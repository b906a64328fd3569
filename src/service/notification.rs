//! Admin notification center: backend triggers write here, the console reads and clears.

use crate::error::AppError;
use crate::models::{NewNotification, Notification, NotificationKind};
use crate::store::table;
use sqlx::PgPool;
use uuid::Uuid;

/// Order counts that raise a MILESTONE notification.
pub const ORDER_MILESTONES: &[i64] = &[1, 10, 50, 100, 500, 1000, 5000, 10000];

const COLUMNS: &str = "id, kind, title, message, link, entity_id, is_read, created_at";

pub fn order_milestone(total_orders: i64) -> Option<i64> {
    ORDER_MILESTONES.iter().copied().find(|m| *m == total_orders)
}

pub async fn create(pool: &PgPool, n: NewNotification) -> Result<Notification, AppError> {
    let sql = format!(
        "INSERT INTO {} (id, kind, title, message, link, entity_id) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        table("notifications"),
        COLUMNS
    );
    let row = sqlx::query_as::<_, Notification>(&sql)
        .bind(Uuid::new_v4())
        .bind(n.kind)
        .bind(&n.title)
        .bind(&n.message)
        .bind(&n.link)
        .bind(n.entity_id)
        .fetch_one(pool)
        .await?;
    tracing::debug!(kind = %row.kind, id = %row.id, "notification created");
    Ok(row)
}

/// LOW_STOCK for a stock row unless an unread one for it is already pending.
/// `stock_id` is the row that ran low: the product itself or one of its variations.
pub async fn low_stock(
    pool: &PgPool,
    product_id: Uuid,
    stock_id: Uuid,
    name: &str,
    stock: i32,
    threshold: i32,
) -> Result<Option<Notification>, AppError> {
    if stock > threshold {
        return Ok(None);
    }
    let pending: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE kind = $1 AND entity_id = $2 AND is_read = FALSE)",
        table("notifications")
    ))
    .bind(NotificationKind::LowStock)
    .bind(stock_id)
    .fetch_one(pool)
    .await?;
    if pending.0 {
        return Ok(None);
    }
    let message = if stock == 0 {
        format!("{} is out of stock", name)
    } else {
        format!("{} has {} left in stock", name, stock)
    };
    let n = create(
        pool,
        NewNotification {
            kind: NotificationKind::LowStock,
            title: "Low stock".into(),
            message,
            link: Some(format!("/admin/products/{}", product_id)),
            entity_id: Some(stock_id),
        },
    )
    .await?;
    Ok(Some(n))
}

pub async fn list(
    pool: &PgPool,
    unread_only: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Notification>, AppError> {
    let filter = if unread_only { "WHERE is_read = FALSE" } else { "" };
    let sql = format!(
        "SELECT {} FROM {} {} ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        COLUMNS,
        table("notifications"),
        filter
    );
    let rows = sqlx::query_as::<_, Notification>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn unread_count(pool: &PgPool) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE is_read = FALSE",
        table("notifications")
    ))
    .fetch_one(pool)
    .await?;
    Ok(n)
}

pub async fn set_read(pool: &PgPool, id: Uuid, read: bool) -> Result<Notification, AppError> {
    let sql = format!(
        "UPDATE {} SET is_read = $2 WHERE id = $1 RETURNING {}",
        table("notifications"),
        COLUMNS
    );
    sqlx::query_as::<_, Notification>(&sql)
        .bind(id)
        .bind(read)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("notification {}", id)))
}

pub async fn mark_all_read(pool: &PgPool) -> Result<u64, AppError> {
    let res = sqlx::query(&format!(
        "UPDATE {} SET is_read = TRUE WHERE is_read = FALSE",
        table("notifications")
    ))
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("notifications")))
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("notification {}", id)));
    }
    Ok(())
}

pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64, AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation("ids must not be empty".into()));
    }
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = ANY($1)", table("notifications")))
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_read(pool: &PgPool) -> Result<u64, AppError> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE is_read = TRUE", table("notifications")))
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones() {
        assert_eq!(order_milestone(1), Some(1));
        assert_eq!(order_milestone(100), Some(100));
        assert_eq!(order_milestone(101), None);
        assert_eq!(order_milestone(0), None);
    }
}
