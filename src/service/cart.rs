//! Carts owned by a user or by a guest session; prices are always read live.

use crate::config::settings::{SettingsKey, ShippingSettings, StoreSettings};
use crate::error::AppError;
use crate::models::{Cart, CartItemRow, CartLine, CartTotals, CartView, PublishStatus};
use crate::service::settings;
use crate::store::table;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

const CART_COLUMNS: &str = "id, user_id, session_id, created_at, updated_at";

/// Who a cart belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartOwner {
    User(Uuid),
    Guest(String),
}

#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub prebuilt_pc_id: Option<Uuid>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub quantity: i32,
}

/// Round to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Totals for priced lines. Shipping is free for an empty cart or when the
/// subtotal reaches the threshold.
pub fn compute_totals(lines: &[CartLine], shipping: &ShippingSettings, tax_rate: Decimal) -> CartTotals {
    let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
    let item_count: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
    totals_for(subtotal, item_count, shipping, tax_rate)
}

pub fn totals_for(subtotal: Decimal, item_count: i64, shipping: &ShippingSettings, tax_rate: Decimal) -> CartTotals {
    let free = match shipping.free_shipping_threshold {
        Some(threshold) => subtotal >= threshold,
        None => false,
    };
    let shipping_cost = if item_count == 0 || free {
        Decimal::ZERO
    } else {
        shipping.flat_rate
    };
    let tax = round_money(subtotal * tax_rate);
    CartTotals {
        item_count,
        subtotal,
        shipping: shipping_cost,
        tax,
        total: subtotal + shipping_cost + tax,
    }
}

pub async fn find(conn: &mut PgConnection, owner: &CartOwner) -> Result<Option<Cart>, AppError> {
    let column = match owner {
        CartOwner::User(_) => "user_id",
        CartOwner::Guest(_) => "session_id",
    };
    let sql = format!("SELECT {} FROM {} WHERE {} = $1", CART_COLUMNS, table("carts"), column);
    let query = sqlx::query_as::<_, Cart>(&sql);
    let cart = match owner {
        CartOwner::User(id) => query.bind(*id).fetch_optional(&mut *conn).await?,
        CartOwner::Guest(sid) => query.bind(sid.as_str()).fetch_optional(&mut *conn).await?,
    };
    Ok(cart)
}

pub async fn find_or_create(conn: &mut PgConnection, owner: &CartOwner) -> Result<Cart, AppError> {
    if let Some(cart) = find(&mut *conn, owner).await? {
        return Ok(cart);
    }
    let (user_id, session_id) = match owner {
        CartOwner::User(id) => (Some(*id), None),
        CartOwner::Guest(sid) => (None, Some(sid.clone())),
    };
    // Concurrent first requests race on the unique owner column; the loser re-reads.
    sqlx::query(&format!(
        "INSERT INTO {} (id, user_id, session_id) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        table("carts")
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(session_id)
    .execute(&mut *conn)
    .await?;
    find(&mut *conn, owner)
        .await?
        .ok_or_else(|| AppError::Internal("cart vanished after insert".into()))
}

/// Items with live prices from their product, variation or bundle.
pub async fn item_rows(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<CartItemRow>, AppError> {
    let sql = format!(
        "SELECT ci.id, ci.product_id, ci.variation_id, ci.prebuilt_pc_id, ci.quantity, \
                COALESCE(p.name, pc.name) AS name, \
                COALESCE(p.slug, pc.slug) AS slug, \
                COALESCE((SELECT i.url FROM {images} i WHERE i.product_id = p.id ORDER BY i.sort_order, i.id LIMIT 1), pc.image_url) AS image_url, \
                v.name AS variation_name, \
                COALESCE(pc.price, p.price) AS base_price, \
                p.sale_price, \
                v.price AS variation_price, \
                COALESCE(v.stock_quantity, pc.stock_quantity, p.stock_quantity) AS available_stock \
         FROM {items} ci \
         LEFT JOIN {products} p ON p.id = ci.product_id \
         LEFT JOIN {variations} v ON v.id = ci.variation_id \
         LEFT JOIN {prebuilt} pc ON pc.id = ci.prebuilt_pc_id \
         WHERE ci.cart_id = $1 ORDER BY ci.created_at, ci.id",
        images = table("product_images"),
        items = table("cart_items"),
        products = table("products"),
        variations = table("product_variations"),
        prebuilt = table("prebuilt_pcs"),
    );
    let rows = sqlx::query_as::<_, CartItemRow>(&sql)
        .bind(cart_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}

pub async fn view(pool: &PgPool, cart: &Cart) -> Result<CartView, AppError> {
    let mut conn = pool.acquire().await?;
    let lines: Vec<CartLine> = item_rows(&mut conn, cart.id)
        .await?
        .into_iter()
        .map(CartItemRow::into_line)
        .collect();
    let shipping = settings::load::<ShippingSettings>(pool, SettingsKey::Shipping).await?;
    let store = settings::load::<StoreSettings>(pool, SettingsKey::Store).await?;
    let totals = compute_totals(&lines, &shipping, store.tax_rate);
    Ok(CartView {
        id: cart.id,
        items: lines,
        totals,
    })
}

pub async fn resolve(pool: &PgPool, owner: &CartOwner) -> Result<Cart, AppError> {
    let mut conn = pool.acquire().await?;
    find_or_create(&mut conn, owner).await
}

/// Stock and name of a purchasable item; 404 for unpublished or missing items.
async fn purchasable_stock(conn: &mut PgConnection, input: &AddItemInput) -> Result<(String, i32), AppError> {
    match (input.product_id, input.prebuilt_pc_id) {
        (Some(product_id), None) => {
            let row: Option<(String, i32)> = sqlx::query_as(&format!(
                "SELECT name, stock_quantity FROM {} WHERE id = $1 AND status = $2 AND is_visible = TRUE",
                table("products")
            ))
            .bind(product_id)
            .bind(PublishStatus::Published)
            .fetch_optional(&mut *conn)
            .await?;
            let (name, stock) = row.ok_or_else(|| AppError::NotFound(format!("product {}", product_id)))?;
            match input.variation_id {
                Some(variation_id) => {
                    let v: Option<(String, i32)> = sqlx::query_as(&format!(
                        "SELECT name, stock_quantity FROM {} WHERE id = $1 AND product_id = $2",
                        table("product_variations")
                    ))
                    .bind(variation_id)
                    .bind(product_id)
                    .fetch_optional(&mut *conn)
                    .await?;
                    let (vname, vstock) =
                        v.ok_or_else(|| AppError::NotFound(format!("variation {}", variation_id)))?;
                    Ok((format!("{} ({})", name, vname), vstock))
                }
                None => Ok((name, stock)),
            }
        }
        (None, Some(prebuilt_id)) => {
            if input.variation_id.is_some() {
                return Err(AppError::Validation("prebuilt PCs have no variations".into()));
            }
            let row: Option<(String, i32)> = sqlx::query_as(&format!(
                "SELECT name, stock_quantity FROM {} WHERE id = $1 AND status = $2 AND is_visible = TRUE",
                table("prebuilt_pcs")
            ))
            .bind(prebuilt_id)
            .bind(PublishStatus::Published)
            .fetch_optional(&mut *conn)
            .await?;
            row.ok_or_else(|| AppError::NotFound(format!("prebuilt PC {}", prebuilt_id)))
        }
        _ => Err(AppError::Validation(
            "exactly one of product_id or prebuilt_pc_id is required".into(),
        )),
    }
}

fn check_stock(name: &str, wanted: i32, available: i32) -> Result<(), AppError> {
    if wanted > available {
        return Err(AppError::Validation(format!(
            "only {} of {} in stock",
            available.max(0),
            name
        )));
    }
    Ok(())
}

/// Add a line, or increase the quantity of the line with the same item.
pub async fn add_item(pool: &PgPool, cart: &Cart, input: AddItemInput) -> Result<(), AppError> {
    let quantity = input.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".into()));
    }
    let mut tx = pool.begin().await?;
    let (name, stock) = purchasable_stock(&mut *tx, &input).await?;
    let existing: Option<(Uuid, i32)> = sqlx::query_as(&format!(
        "SELECT id, quantity FROM {} WHERE cart_id = $1 AND product_id IS NOT DISTINCT FROM $2 \
         AND variation_id IS NOT DISTINCT FROM $3 AND prebuilt_pc_id IS NOT DISTINCT FROM $4 FOR UPDATE",
        table("cart_items")
    ))
    .bind(cart.id)
    .bind(input.product_id)
    .bind(input.variation_id)
    .bind(input.prebuilt_pc_id)
    .fetch_optional(&mut *tx)
    .await?;
    match existing {
        Some((item_id, current)) => {
            let total = current.saturating_add(quantity);
            check_stock(&name, total, stock)?;
            sqlx::query(&format!("UPDATE {} SET quantity = $2 WHERE id = $1", table("cart_items")))
                .bind(item_id)
                .bind(total)
                .execute(&mut *tx)
                .await?;
        }
        None => {
            check_stock(&name, quantity, stock)?;
            sqlx::query(&format!(
                "INSERT INTO {} (id, cart_id, product_id, variation_id, prebuilt_pc_id, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                table("cart_items")
            ))
            .bind(Uuid::new_v4())
            .bind(cart.id)
            .bind(input.product_id)
            .bind(input.variation_id)
            .bind(input.prebuilt_pc_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }
    }
    touch(&mut *tx, cart.id).await?;
    tx.commit().await?;
    Ok(())
}

/// Set a line's quantity; zero removes it.
pub async fn update_item(pool: &PgPool, cart: &Cart, item_id: Uuid, quantity: i32) -> Result<(), AppError> {
    if quantity < 0 {
        return Err(AppError::Validation("quantity must not be negative".into()));
    }
    if quantity == 0 {
        return remove_item(pool, cart, item_id).await;
    }
    let mut conn = pool.acquire().await?;
    let row = item_rows(&mut conn, cart.id)
        .await?
        .into_iter()
        .find(|r| r.id == item_id)
        .ok_or_else(|| AppError::NotFound(format!("cart item {}", item_id)))?;
    check_stock(&row.name, quantity, row.available_stock)?;
    sqlx::query(&format!(
        "UPDATE {} SET quantity = $3 WHERE id = $1 AND cart_id = $2",
        table("cart_items")
    ))
    .bind(item_id)
    .bind(cart.id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;
    touch(&mut conn, cart.id).await
}

pub async fn remove_item(pool: &PgPool, cart: &Cart, item_id: Uuid) -> Result<(), AppError> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1 AND cart_id = $2", table("cart_items")))
        .bind(item_id)
        .bind(cart.id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("cart item {}", item_id)));
    }
    Ok(())
}

pub async fn clear(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM {} WHERE cart_id = $1", table("cart_items")))
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    touch(conn, cart_id).await
}

async fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), AppError> {
    sqlx::query(&format!("UPDATE {} SET updated_at = NOW() WHERE id = $1", table("carts")))
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Move a guest cart's lines into the user's cart, summing equal lines, then drop the guest cart.
/// Identity of a cart line: the same product, variation or prebuilt build merges into one row.
pub type LineKey = (Option<Uuid>, Option<Uuid>, Option<Uuid>);

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct MergeLine {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub prebuilt_pc_id: Option<Uuid>,
    pub quantity: i32,
}

impl MergeLine {
    fn key(&self) -> LineKey {
        (self.product_id, self.variation_id, self.prebuilt_pc_id)
    }
}

/// Row updates that fold a guest cart into a user cart.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Existing rows to bump, by item id.
    pub increments: Vec<(Uuid, i32)>,
    /// Guest rows to reassign to the user cart.
    pub moves: Vec<Uuid>,
}

/// Quantities add up per line key; guest rows without a match move over.
pub fn merge_plan(user_lines: &[MergeLine], guest_lines: &[MergeLine]) -> MergePlan {
    let mut target: HashMap<LineKey, Uuid> = user_lines.iter().map(|l| (l.key(), l.id)).collect();
    let mut increments: Vec<(Uuid, i32)> = Vec::new();
    let mut moves = Vec::new();
    for line in guest_lines {
        match target.get(&line.key()) {
            Some(&id) => match increments.iter_mut().find(|(i, _)| *i == id) {
                Some((_, q)) => *q += line.quantity,
                None => increments.push((id, line.quantity)),
            },
            None => {
                target.insert(line.key(), line.id);
                moves.push(line.id);
            }
        }
    }
    MergePlan { increments, moves }
}

async fn merge_lines(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<MergeLine>, AppError> {
    let rows = sqlx::query_as::<_, MergeLine>(&format!(
        "SELECT id, product_id, variation_id, prebuilt_pc_id, quantity FROM {} WHERE cart_id = $1 ORDER BY created_at",
        table("cart_items")
    ))
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn merge_guest_into_user(pool: &PgPool, session_id: &str, user_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let Some(guest) = find(&mut *tx, &CartOwner::Guest(session_id.to_string())).await? else {
        return Ok(());
    };
    let user_cart = find_or_create(&mut *tx, &CartOwner::User(user_id)).await?;
    let user_lines = merge_lines(&mut *tx, user_cart.id).await?;
    let guest_lines = merge_lines(&mut *tx, guest.id).await?;
    let plan = merge_plan(&user_lines, &guest_lines);
    let items = table("cart_items");
    if !plan.moves.is_empty() {
        sqlx::query(&format!("UPDATE {} SET cart_id = $1 WHERE id = ANY($2)", items))
            .bind(user_cart.id)
            .bind(&plan.moves)
            .execute(&mut *tx)
            .await?;
    }
    for (id, quantity) in &plan.increments {
        sqlx::query(&format!("UPDATE {} SET quantity = quantity + $2 WHERE id = $1", items))
            .bind(id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("carts")))
        .bind(guest.id)
        .execute(&mut *tx)
        .await?;
    touch(&mut *tx, user_cart.id).await?;
    tx.commit().await?;
    tracing::debug!(user_id = %user_id, moved = plan.moves.len(), merged = plan.increments.len(), "guest cart merged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit: i64, quantity: i32) -> CartLine {
        let unit_price = Decimal::new(unit, 2);
        CartLine {
            id: Uuid::new_v4(),
            product_id: Some(Uuid::new_v4()),
            variation_id: None,
            prebuilt_pc_id: None,
            name: "Part".into(),
            slug: "part".into(),
            image_url: None,
            variation_name: None,
            unit_price,
            quantity,
            line_total: unit_price * Decimal::from(quantity),
            available_stock: 10,
        }
    }

    #[test]
    fn subtotal_is_sum_of_lines() {
        let shipping = ShippingSettings::default();
        let totals = compute_totals(&[line(12999, 2), line(4550, 1)], &shipping, Decimal::ZERO);
        assert_eq!(totals.subtotal, Decimal::new(30548, 2));
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.shipping, Decimal::new(1500, 2));
        assert_eq!(totals.total, Decimal::new(32048, 2));
    }

    #[test]
    fn free_shipping_at_threshold() {
        let shipping = ShippingSettings {
            flat_rate: Decimal::new(1500, 2),
            free_shipping_threshold: Some(Decimal::new(50000, 2)),
        };
        let totals = compute_totals(&[line(25000, 2)], &shipping, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::ZERO);
        let totals = compute_totals(&[line(49999, 1)], &shipping, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::new(1500, 2));
    }

    #[test]
    fn empty_cart_costs_nothing() {
        let shipping = ShippingSettings {
            flat_rate: Decimal::new(1500, 2),
            free_shipping_threshold: None,
        };
        let totals = compute_totals(&[], &shipping, Decimal::new(8, 2));
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.item_count, 0);
    }

    #[test]
    fn tax_rounds_to_cents() {
        let shipping = ShippingSettings {
            flat_rate: Decimal::ZERO,
            free_shipping_threshold: None,
        };
        // 19.99 * 0.0825 = 1.649175
        let totals = compute_totals(&[line(1999, 1)], &shipping, Decimal::new(825, 4));
        assert_eq!(totals.tax, Decimal::new(165, 2));
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
    }

    #[test]
    fn stock_check_names_item() {
        let err = check_stock("RTX 4090", 3, 2).unwrap_err();
        assert!(err.to_string().contains("RTX 4090"));
        assert!(check_stock("RTX 4090", 2, 2).is_ok());
    }

    fn merge_line(key: LineKey, quantity: i32) -> MergeLine {
        MergeLine {
            id: Uuid::new_v4(),
            product_id: key.0,
            variation_id: key.1,
            prebuilt_pc_id: key.2,
            quantity,
        }
    }

    #[test]
    fn merge_sums_matching_lines_and_moves_the_rest() {
        let gpu: LineKey = (Some(Uuid::new_v4()), None, None);
        let ram: LineKey = (Some(gpu.0.unwrap()), Some(Uuid::new_v4()), None);
        let build: LineKey = (None, None, Some(Uuid::new_v4()));
        let user = vec![merge_line(gpu, 1), merge_line(ram, 2)];
        let guest = vec![merge_line(gpu, 3), merge_line(build, 1), merge_line(build, 2), merge_line(gpu, 1)];
        let plan = merge_plan(&user, &guest);
        assert_eq!(plan.increments, vec![(user[0].id, 4), (guest[1].id, 2)]);
        assert_eq!(plan.moves, vec![guest[1].id]);
    }

    #[test]
    fn merge_into_empty_cart_moves_everything() {
        let guest = vec![merge_line((Some(Uuid::new_v4()), None, None), 1)];
        let plan = merge_plan(&[], &guest);
        assert!(plan.increments.is_empty());
        assert_eq!(plan.moves, vec![guest[0].id]);
    }
}
