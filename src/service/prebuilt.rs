//! Prebuilt PCs: bundles sold at their own price, composed of catalog products.

use crate::error::AppError;
use crate::models::{components_total, PrebuiltComponent, PrebuiltDetail, PrebuiltPc, PublishStatus};
use crate::service::patch::{apply, nullable};
use crate::service::validation;
use crate::store::table;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const COLUMNS: &str = "id, name, slug, description, image_url, price, stock_quantity, status, is_visible, \
                       is_featured, created_at, updated_at";

#[derive(Debug, Deserialize, Clone)]
pub struct ComponentInput {
    pub product_id: Uuid,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PrebuiltInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub stock_quantity: Option<i32>,
    pub status: Option<PublishStatus>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub components: Vec<ComponentInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrebuiltPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub status: Option<PublishStatus>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    /// Replaces the component list when present.
    pub components: Option<Vec<ComponentInput>>,
}

/// Merge duplicate product ids by summing quantities.
fn merge_components(components: Vec<ComponentInput>) -> Result<Vec<(Uuid, i32)>, AppError> {
    let mut out: Vec<(Uuid, i32)> = Vec::new();
    for c in components {
        let qty = c.quantity.unwrap_or(1);
        if qty <= 0 {
            return Err(AppError::Validation("component quantity must be positive".into()));
        }
        match out.iter_mut().find(|(id, _)| *id == c.product_id) {
            Some((_, q)) => *q += qty,
            None => out.push((c.product_id, qty)),
        }
    }
    Ok(out)
}

fn validate(pc: &PrebuiltPc) -> Result<(), AppError> {
    validation::max_length("name", &pc.name, 200)?;
    validation::slug("slug", &pc.slug)?;
    validation::non_negative("price", pc.price)?;
    validation::non_negative_int("stock_quantity", pc.stock_quantity)?;
    if let Some(url) = &pc.image_url {
        validation::url("image_url", url)?;
    }
    Ok(())
}

async fn components(pool: &PgPool, id: Uuid) -> Result<Vec<PrebuiltComponent>, AppError> {
    let sql = format!(
        "SELECT p.id AS product_id, p.name, p.slug, p.sku, LEAST(p.price, COALESCE(p.sale_price, p.price)) AS price, c.quantity \
         FROM {} c JOIN {} p ON p.id = c.product_id WHERE c.prebuilt_pc_id = $1 ORDER BY p.name",
        table("prebuilt_pc_components"),
        table("products")
    );
    let rows = sqlx::query_as::<_, PrebuiltComponent>(&sql)
        .bind(id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

async fn detail(pool: &PgPool, prebuilt: PrebuiltPc) -> Result<PrebuiltDetail, AppError> {
    let components = components(pool, prebuilt.id).await?;
    Ok(PrebuiltDetail {
        components_total: components_total(&components),
        prebuilt,
        components,
    })
}

pub async fn storefront_list(pool: &PgPool, featured: Option<bool>) -> Result<Vec<PrebuiltPc>, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE status = $1 AND is_visible = TRUE AND ($2::boolean IS NULL OR is_featured = $2) \
         ORDER BY is_featured DESC, created_at DESC",
        COLUMNS,
        table("prebuilt_pcs")
    );
    let rows = sqlx::query_as::<_, PrebuiltPc>(&sql)
        .bind(PublishStatus::Published)
        .bind(featured)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn storefront_detail(pool: &PgPool, slug: &str) -> Result<PrebuiltDetail, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE slug = $1 AND status = $2 AND is_visible = TRUE",
        COLUMNS,
        table("prebuilt_pcs")
    );
    let pc = sqlx::query_as::<_, PrebuiltPc>(&sql)
        .bind(slug)
        .bind(PublishStatus::Published)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("prebuilt PC {}", slug)))?;
    detail(pool, pc).await
}

pub async fn admin_list(pool: &PgPool) -> Result<Vec<PrebuiltPc>, AppError> {
    let sql = format!("SELECT {} FROM {} ORDER BY created_at DESC", COLUMNS, table("prebuilt_pcs"));
    let rows = sqlx::query_as::<_, PrebuiltPc>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<PrebuiltDetail, AppError> {
    let pc = find(pool, id).await?;
    detail(pool, pc).await
}

async fn find(pool: &PgPool, id: Uuid) -> Result<PrebuiltPc, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, table("prebuilt_pcs"));
    sqlx::query_as::<_, PrebuiltPc>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("prebuilt PC {}", id)))
}

async fn slug_taken(pool: &PgPool, slug: &str, except: Option<Uuid>) -> Result<bool, AppError> {
    let (taken,): (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        table("prebuilt_pcs")
    ))
    .bind(slug)
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

async fn replace_components(conn: &mut PgConnection, id: Uuid, components: &[(Uuid, i32)]) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM {} WHERE prebuilt_pc_id = $1", table("prebuilt_pc_components")))
        .bind(id)
        .execute(&mut *conn)
        .await?;
    for (product_id, quantity) in components {
        let exists: (bool,) = sqlx::query_as(&format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table("products")))
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
        if !exists.0 {
            return Err(AppError::Validation(format!("component product {} does not exist", product_id)));
        }
        sqlx::query(&format!(
            "INSERT INTO {} (prebuilt_pc_id, product_id, quantity) VALUES ($1, $2, $3)",
            table("prebuilt_pc_components")
        ))
        .bind(id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn create(pool: &PgPool, input: PrebuiltInput) -> Result<PrebuiltDetail, AppError> {
    let name = validation::required("name", &input.name)?;
    let now = chrono::Utc::now();
    let pc = PrebuiltPc {
        id: Uuid::new_v4(),
        slug: validation::slug_or_derive("slug", input.slug.as_deref(), &name)?,
        name,
        description: validation::optional(input.description),
        image_url: validation::optional(input.image_url),
        price: input.price,
        stock_quantity: input.stock_quantity.unwrap_or(0),
        status: input.status.unwrap_or(PublishStatus::Draft),
        is_visible: input.is_visible.unwrap_or(true),
        is_featured: input.is_featured.unwrap_or(false),
        created_at: now,
        updated_at: now,
    };
    validate(&pc)?;
    let components = merge_components(input.components)?;
    if slug_taken(pool, &pc.slug, None).await? {
        return Err(AppError::Conflict(format!("prebuilt PC slug already exists: {}", pc.slug)));
    }

    let mut tx = pool.begin().await?;
    let sql = format!(
        "INSERT INTO {} (id, name, slug, description, image_url, price, stock_quantity, status, is_visible, is_featured) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        table("prebuilt_pcs"),
        COLUMNS
    );
    let row = sqlx::query_as::<_, PrebuiltPc>(&sql)
        .bind(pc.id)
        .bind(&pc.name)
        .bind(&pc.slug)
        .bind(&pc.description)
        .bind(&pc.image_url)
        .bind(pc.price)
        .bind(pc.stock_quantity)
        .bind(pc.status)
        .bind(pc.is_visible)
        .bind(pc.is_featured)
        .fetch_one(&mut *tx)
        .await?;
    replace_components(&mut *tx, row.id, &components).await?;
    tx.commit().await?;
    tracing::info!(prebuilt_id = %row.id, components = components.len(), "prebuilt PC created");
    detail(pool, row).await
}

pub async fn update(pool: &PgPool, id: Uuid, patch: PrebuiltPatch) -> Result<PrebuiltDetail, AppError> {
    let mut pc = find(pool, id).await?;
    if let Some(name) = patch.name {
        pc.name = validation::required("name", &name)?;
    }
    if let Some(slug) = patch.slug {
        pc.slug = slug.trim().to_string();
    }
    pc.description = apply(pc.description, patch.description.map(validation::optional));
    pc.image_url = apply(pc.image_url, patch.image_url.map(validation::optional));
    pc.price = patch.price.unwrap_or(pc.price);
    pc.stock_quantity = patch.stock_quantity.unwrap_or(pc.stock_quantity);
    pc.status = patch.status.unwrap_or(pc.status);
    pc.is_visible = patch.is_visible.unwrap_or(pc.is_visible);
    pc.is_featured = patch.is_featured.unwrap_or(pc.is_featured);
    validate(&pc)?;
    let components = patch.components.map(merge_components).transpose()?;
    if slug_taken(pool, &pc.slug, Some(id)).await? {
        return Err(AppError::Conflict(format!("prebuilt PC slug already exists: {}", pc.slug)));
    }

    let mut tx = pool.begin().await?;
    let sql = format!(
        "UPDATE {} SET name = $2, slug = $3, description = $4, image_url = $5, price = $6, stock_quantity = $7, \
         status = $8, is_visible = $9, is_featured = $10, updated_at = NOW() WHERE id = $1 RETURNING {}",
        table("prebuilt_pcs"),
        COLUMNS
    );
    let row = sqlx::query_as::<_, PrebuiltPc>(&sql)
        .bind(id)
        .bind(&pc.name)
        .bind(&pc.slug)
        .bind(&pc.description)
        .bind(&pc.image_url)
        .bind(pc.price)
        .bind(pc.stock_quantity)
        .bind(pc.status)
        .bind(pc.is_visible)
        .bind(pc.is_featured)
        .fetch_one(&mut *tx)
        .await?;
    if let Some(components) = components {
        replace_components(&mut *tx, id, &components).await?;
    }
    tx.commit().await?;
    detail(pool, row).await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("prebuilt_pcs")))
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("prebuilt PC {}", id)));
    }
    tracing::info!(prebuilt_id = %id, "prebuilt PC deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_components_merge() {
        let gpu = Uuid::new_v4();
        let ram = Uuid::new_v4();
        let merged = merge_components(vec![
            ComponentInput { product_id: gpu, quantity: None },
            ComponentInput { product_id: ram, quantity: Some(2) },
            ComponentInput { product_id: ram, quantity: Some(2) },
        ])
        .unwrap();
        assert_eq!(merged, vec![(gpu, 1), (ram, 4)]);
    }

    #[test]
    fn zero_quantity_rejected() {
        let res = merge_components(vec![ComponentInput {
            product_id: Uuid::new_v4(),
            quantity: Some(0),
        }]);
        assert!(matches!(res, Err(AppError::Validation(_))));
    }
}
