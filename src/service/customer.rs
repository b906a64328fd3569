//! Admin view of customer accounts.

use crate::error::AppError;
use crate::models::{CustomerSummary, Order, OrderStatus, Role, User, UserStatus};
use crate::service::{auth, order};
use crate::store::{prefixed, table};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    /// Name or email.
    pub q: Option<String>,
    pub status: Option<UserStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: CustomerSummary,
    pub recent_orders: Vec<Order>,
}

fn summary_select() -> String {
    let revenue = OrderStatus::revenue_statuses()
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT u.id, u.email, u.name, u.phone, u.status, u.email_verified, u.created_at, \
         COUNT(o.id) AS order_count, \
         COALESCE(SUM(o.total) FILTER (WHERE o.status IN ({})), 0) AS total_spent \
         FROM {} u LEFT JOIN {} o ON o.user_id = u.id",
        revenue,
        table("users"),
        table("orders")
    )
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &CustomerQuery) {
    qb.push(" WHERE u.role = ").push_bind(Role::Customer);
    if let Some(status) = q.status {
        qb.push(" AND u.status = ").push_bind(status);
    }
    if let Some(text) = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", text);
        qb.push(" AND (u.name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR u.email ILIKE ").push_bind(pattern);
        qb.push(")");
    }
}

pub async fn list(pool: &PgPool, q: &CustomerQuery, limit: i64, offset: i64) -> Result<(Vec<CustomerSummary>, i64), AppError> {
    let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} u", table("users")));
    push_filters(&mut count_qb, q);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(summary_select());
    push_filters(&mut qb, q);
    qb.push(" GROUP BY u.id ORDER BY u.created_at DESC, u.id LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<CustomerSummary>().fetch_all(pool).await?;
    Ok((rows, total))
}

pub async fn detail(pool: &PgPool, id: Uuid) -> Result<CustomerDetail, AppError> {
    let mut qb = QueryBuilder::<Postgres>::new(summary_select());
    push_filters(&mut qb, &CustomerQuery::default());
    qb.push(" AND u.id = ").push_bind(id);
    qb.push(" GROUP BY u.id");
    let customer = qb
        .build_query_as::<CustomerSummary>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {}", id)))?;
    let recent_orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM {} o WHERE o.user_id = $1 ORDER BY o.created_at DESC LIMIT 10",
        prefixed(order::COLUMNS, "o"),
        table("orders")
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(CustomerDetail { customer, recent_orders })
}

/// Block or unblock a customer. Blocking ends every session of the account.
pub async fn set_status(pool: &PgPool, id: Uuid, status: UserStatus) -> Result<User, AppError> {
    let user = auth::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {}", id)))?;
    if user.is_admin() {
        return Err(AppError::Validation("administrators cannot be blocked".into()));
    }
    let sql = format!(
        "UPDATE {} SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        table("users"),
        auth::USER_COLUMNS
    );
    let updated = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .bind(status)
        .fetch_one(pool)
        .await?;
    if status == UserStatus::Blocked {
        let revoked = auth::revoke_sessions(pool, id).await?;
        tracing::info!(user_id = %id, sessions = revoked, "customer blocked");
    } else {
        tracing::info!(user_id = %id, "customer unblocked");
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_spent_ignores_cancelled_and_refunded() {
        let sql = summary_select();
        assert!(sql.contains("o.status IN ('PENDING', 'CONFIRMED', 'PROCESSING', 'SHIPPED', 'DELIVERED')"));
        assert!(!sql.contains("CANCELLED"));
        assert!(!sql.contains("REFUNDED"));
    }
}
