//! Product catalog: storefront search and detail, admin CRUD with images, specs, tags and variations.

use crate::error::AppError;
use crate::models::{
    Category, Product, ProductDetail, ProductImage, ProductListItem, ProductSpec, ProductVariation, PublishStatus,
};
use crate::service::patch::{apply, nullable};
use crate::service::{category, notification, tag, validation};
use crate::store::{prefixed, table};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub const COLUMNS: &str = "id, name, slug, sku, description, short_description, brand, price, sale_price, \
                           stock_quantity, category_id, status, is_visible, is_featured, video_url, meta_title, \
                           meta_description, meta_keywords, created_at, updated_at";

pub const DEFAULT_PAGE: i64 = 24;
pub const MAX_PAGE: i64 = 100;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ProductQuery {
    /// Category slug; includes its descendants.
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    pub brand: Option<String>,
    /// Admin only; storefront always filters to PUBLISHED.
    pub status: Option<PublishStatus>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageInput {
    pub url: String,
    pub alt_text: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpecInput {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VariationInput {
    /// Existing variation to update; absent creates a new one.
    pub id: Option<Uuid>,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock_quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub slug: Option<String>,
    pub sku: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub brand: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub category_id: Option<Uuid>,
    pub status: Option<PublishStatus>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    pub video_url: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub specs: Vec<SpecInput>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub variations: Vec<VariationInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub short_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub brand: Option<Option<String>>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub sale_price: Option<Option<Decimal>>,
    pub stock_quantity: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<PublishStatus>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub video_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_keywords: Option<Option<String>>,
    /// Present lists replace the stored ones.
    pub images: Option<Vec<ImageInput>>,
    pub specs: Option<Vec<SpecInput>>,
    pub tags: Option<Vec<String>>,
    pub variations: Option<Vec<VariationInput>>,
}

/// Child collections to write; None leaves the stored rows untouched.
#[derive(Default)]
struct Children {
    images: Option<Vec<ImageInput>>,
    specs: Option<Vec<SpecInput>>,
    tags: Option<Vec<String>>,
    variations: Option<Vec<VariationInput>>,
}

/// ORDER BY clause for a whitelisted sort key.
pub fn order_clause(sort: Option<&str>) -> &'static str {
    match sort {
        Some("price_asc") => "LEAST(p.price, COALESCE(p.sale_price, p.price)) ASC, p.id",
        Some("price_desc") => "LEAST(p.price, COALESCE(p.sale_price, p.price)) DESC, p.id",
        Some("name") => "p.name ASC, p.id",
        Some("oldest") => "p.created_at ASC, p.id",
        _ => "p.created_at DESC, p.id",
    }
}

/// Escape LIKE wildcards in user input.
/// A missing row becomes `None`; other failures still propagate.
fn found<T>(res: Result<T, AppError>) -> Result<Option<T>, AppError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// ILIKE operand matching `q` literally.
fn escape_like(q: &str) -> String {
    q.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn like_pattern(q: &str) -> String {
    format!("%{}%", escape_like(q))
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &ProductQuery, storefront: bool) {
    qb.push(" WHERE TRUE");
    if storefront {
        qb.push(" AND p.status = ").push_bind(PublishStatus::Published);
        qb.push(" AND p.is_visible = TRUE");
    } else if let Some(status) = q.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(slug) = q.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(format!(
            " AND p.category_id IN (WITH RECURSIVE sub AS (SELECT id FROM {cats} WHERE slug = ",
            cats = table("categories")
        ));
        qb.push_bind(slug.to_string());
        qb.push(format!(
            " UNION ALL SELECT c.id FROM {cats} c JOIN sub ON c.parent_id = sub.id) SELECT id FROM sub)",
            cats = table("categories")
        ));
    }
    if let Some(text) = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(text);
        qb.push(" AND (p.name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR p.sku ILIKE ").push_bind(pattern.clone());
        qb.push(" OR p.brand ILIKE ").push_bind(pattern.clone());
        qb.push(" OR p.description ILIKE ").push_bind(pattern);
        qb.push(")");
    }
    if let Some(min) = q.min_price {
        qb.push(" AND LEAST(p.price, COALESCE(p.sale_price, p.price)) >= ").push_bind(min);
    }
    if let Some(max) = q.max_price {
        qb.push(" AND LEAST(p.price, COALESCE(p.sale_price, p.price)) <= ").push_bind(max);
    }
    if let Some(featured) = q.featured {
        qb.push(" AND p.is_featured = ").push_bind(featured);
    }
    if q.in_stock == Some(true) {
        qb.push(" AND p.stock_quantity > 0");
    }
    if let Some(brand) = q.brand.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND p.brand ILIKE ").push_bind(escape_like(brand));
    }
}

/// Page of products plus the total matching count.
pub async fn search(pool: &PgPool, q: &ProductQuery, storefront: bool) -> Result<(Vec<ProductListItem>, i64, i64, i64), AppError> {
    let limit = q.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let offset = q.offset.unwrap_or(0).max(0);

    let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} p", table("products")));
    push_filters(&mut count_qb, q, storefront);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {}, (SELECT i.url FROM {} i WHERE i.product_id = p.id ORDER BY i.sort_order, i.id LIMIT 1) AS image_url, \
         c.slug AS category_slug FROM {} p LEFT JOIN {} c ON c.id = p.category_id",
        prefixed(COLUMNS, "p"),
        table("product_images"),
        table("products"),
        table("categories")
    ));
    push_filters(&mut qb, q, storefront);
    qb.push(" ORDER BY ").push(order_clause(q.sort.as_deref()));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    tracing::debug!(sql = %qb.sql(), "product search");
    let rows = qb.build_query_as::<ProductListItem>().fetch_all(pool).await?;
    Ok((rows, total, limit, offset))
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Product, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, table("products"));
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))
}

/// Product with its children loaded.
pub async fn detail(pool: &PgPool, product: Product) -> Result<ProductDetail, AppError> {
    let id = product.id;
    let images = sqlx::query_as::<_, ProductImage>(&format!(
        "SELECT id, product_id, url, alt_text, sort_order FROM {} WHERE product_id = $1 ORDER BY sort_order, id",
        table("product_images")
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;
    let specs = sqlx::query_as::<_, ProductSpec>(&format!(
        "SELECT id, product_id, name, value, sort_order FROM {} WHERE product_id = $1 ORDER BY sort_order, id",
        table("product_specs")
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;
    let variations = sqlx::query_as::<_, ProductVariation>(&format!(
        "SELECT id, product_id, name, sku, price, stock_quantity FROM {} WHERE product_id = $1 ORDER BY price, name",
        table("product_variations")
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;
    let tags = tag::attached(pool, "product_tags", "product_id", id).await?;
    let category: Option<Category> = match product.category_id {
        Some(cid) => found(category::get(pool, cid).await)?,
        None => None,
    };
    Ok(ProductDetail {
        effective_price: product.effective_price(),
        video_embed_url: product.video_url.as_deref().and_then(validation::youtube_embed_url),
        product,
        category,
        images,
        specs,
        tags,
        variations,
    })
}

/// Storefront detail; unpublished or hidden products are not found.
pub async fn storefront_detail(pool: &PgPool, slug: &str) -> Result<ProductDetail, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE slug = $1 AND status = $2 AND is_visible = TRUE",
        COLUMNS,
        table("products")
    );
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(slug)
        .bind(PublishStatus::Published)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", slug)))?;
    detail(pool, product).await
}

fn validate_product(p: &Product) -> Result<(), AppError> {
    validation::max_length("name", &p.name, 200)?;
    validation::slug("slug", &p.slug)?;
    validation::max_length("sku", &p.sku, 64)?;
    validation::non_negative("price", p.price)?;
    if let Some(sale) = p.sale_price {
        validation::non_negative("sale_price", sale)?;
        if sale >= p.price {
            return Err(AppError::Validation("sale_price must be lower than price".into()));
        }
    }
    validation::non_negative_int("stock_quantity", p.stock_quantity)?;
    if let Some(url) = &p.video_url {
        validation::youtube_url("video_url", url)?;
    }
    Ok(())
}

fn validate_children(children: &Children) -> Result<(), AppError> {
    for img in children.images.iter().flatten() {
        validation::url("images.url", &img.url)?;
    }
    for spec in children.specs.iter().flatten() {
        validation::required("specs.name", &spec.name)?;
        validation::required("specs.value", &spec.value)?;
    }
    for v in children.variations.iter().flatten() {
        validation::required("variations.name", &v.name)?;
        validation::non_negative("variations.price", v.price)?;
        validation::non_negative_int("variations.stock_quantity", v.stock_quantity.unwrap_or(0))?;
    }
    Ok(())
}

async fn ensure_unique(pool: &PgPool, p: &Product, except: Option<Uuid>) -> Result<(), AppError> {
    let (slug_taken, sku_taken): (bool, bool) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {t} WHERE slug = $1 AND ($3::uuid IS NULL OR id <> $3)), \
                EXISTS(SELECT 1 FROM {t} WHERE sku = $2 AND ($3::uuid IS NULL OR id <> $3))",
        t = table("products")
    ))
    .bind(&p.slug)
    .bind(&p.sku)
    .bind(except)
    .fetch_one(pool)
    .await?;
    if slug_taken {
        return Err(AppError::Conflict(format!("product slug already exists: {}", p.slug)));
    }
    if sku_taken {
        return Err(AppError::Conflict(format!("product sku already exists: {}", p.sku)));
    }
    if let Some(cid) = p.category_id {
        category::get(pool, cid).await.map_err(|_| AppError::Validation(format!("category {} does not exist", cid)))?;
    }
    Ok(())
}

async fn write_children(conn: &mut PgConnection, product_id: Uuid, children: Children) -> Result<(), AppError> {
    if let Some(images) = children.images {
        sqlx::query(&format!("DELETE FROM {} WHERE product_id = $1", table("product_images")))
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        for (i, img) in images.into_iter().enumerate() {
            sqlx::query(&format!(
                "INSERT INTO {} (id, product_id, url, alt_text, sort_order) VALUES ($1, $2, $3, $4, $5)",
                table("product_images")
            ))
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(img.url.trim())
            .bind(validation::optional(img.alt_text))
            .bind(img.sort_order.unwrap_or(i as i32))
            .execute(&mut *conn)
            .await?;
        }
    }
    if let Some(specs) = children.specs {
        sqlx::query(&format!("DELETE FROM {} WHERE product_id = $1", table("product_specs")))
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        for (i, spec) in specs.into_iter().enumerate() {
            sqlx::query(&format!(
                "INSERT INTO {} (id, product_id, name, value, sort_order) VALUES ($1, $2, $3, $4, $5)",
                table("product_specs")
            ))
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(spec.name.trim())
            .bind(spec.value.trim())
            .bind(i as i32)
            .execute(&mut *conn)
            .await?;
        }
    }
    if let Some(names) = children.tags {
        tag::replace_attached(&mut *conn, "product_tags", "product_id", product_id, &names).await?;
    }
    if let Some(variations) = children.variations {
        let keep: Vec<Uuid> = variations.iter().filter_map(|v| v.id).collect();
        sqlx::query(&format!(
            "DELETE FROM {} WHERE product_id = $1 AND NOT (id = ANY($2))",
            table("product_variations")
        ))
        .bind(product_id)
        .bind(&keep)
        .execute(&mut *conn)
        .await?;
        for v in variations {
            let sku = validation::optional(v.sku);
            let stock = v.stock_quantity.unwrap_or(0);
            match v.id {
                Some(vid) => {
                    let res = sqlx::query(&format!(
                        "UPDATE {} SET name = $3, sku = $4, price = $5, stock_quantity = $6 WHERE id = $1 AND product_id = $2",
                        table("product_variations")
                    ))
                    .bind(vid)
                    .bind(product_id)
                    .bind(v.name.trim())
                    .bind(&sku)
                    .bind(v.price)
                    .bind(stock)
                    .execute(&mut *conn)
                    .await?;
                    if res.rows_affected() == 0 {
                        return Err(AppError::Validation(format!("variation {} does not belong to this product", vid)));
                    }
                }
                None => {
                    sqlx::query(&format!(
                        "INSERT INTO {} (id, product_id, name, sku, price, stock_quantity) VALUES ($1, $2, $3, $4, $5, $6)",
                        table("product_variations")
                    ))
                    .bind(Uuid::new_v4())
                    .bind(product_id)
                    .bind(v.name.trim())
                    .bind(&sku)
                    .bind(v.price)
                    .bind(stock)
                    .execute(&mut *conn)
                    .await?;
                }
            }
        }
    }
    Ok(())
}

pub async fn create(pool: &PgPool, input: ProductInput, low_stock_threshold: i32) -> Result<ProductDetail, AppError> {
    let name = validation::required("name", &input.name)?;
    let now = chrono::Utc::now();
    let p = Product {
        id: Uuid::new_v4(),
        slug: validation::slug_or_derive("slug", input.slug.as_deref(), &name)?,
        name,
        sku: validation::required("sku", &input.sku)?,
        description: validation::optional(input.description),
        short_description: validation::optional(input.short_description),
        brand: validation::optional(input.brand),
        price: input.price,
        sale_price: input.sale_price,
        stock_quantity: input.stock_quantity.unwrap_or(0),
        category_id: input.category_id,
        status: input.status.unwrap_or(PublishStatus::Draft),
        is_visible: input.is_visible.unwrap_or(true),
        is_featured: input.is_featured.unwrap_or(false),
        video_url: validation::optional(input.video_url),
        meta_title: validation::optional(input.meta_title),
        meta_description: validation::optional(input.meta_description),
        meta_keywords: validation::optional(input.meta_keywords),
        created_at: now,
        updated_at: now,
    };
    let children = Children {
        images: Some(input.images),
        specs: Some(input.specs),
        tags: Some(input.tags),
        variations: Some(input.variations),
    };
    validate_product(&p)?;
    validate_children(&children)?;
    ensure_unique(pool, &p, None).await?;

    let mut tx = pool.begin().await?;
    let sql = format!(
        "INSERT INTO {} (id, name, slug, sku, description, short_description, brand, price, sale_price, stock_quantity, \
         category_id, status, is_visible, is_featured, video_url, meta_title, meta_description, meta_keywords) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) RETURNING {}",
        table("products"),
        COLUMNS
    );
    let row = bind_product(sqlx::query_as::<_, Product>(&sql), &p)
        .fetch_one(&mut *tx)
        .await?;
    write_children(&mut *tx, row.id, children).await?;
    tx.commit().await?;
    tracing::info!(product_id = %row.id, sku = %row.sku, "product created");

    notification::low_stock(pool, row.id, row.id, &row.name, row.stock_quantity, low_stock_threshold).await?;
    detail(pool, row).await
}

/// Bind all writable columns in INSERT/UPDATE order ($1 = id).
fn bind_product<'q>(
    q: sqlx::query::QueryAs<'q, Postgres, Product, sqlx::postgres::PgArguments>,
    p: &'q Product,
) -> sqlx::query::QueryAs<'q, Postgres, Product, sqlx::postgres::PgArguments> {
    q.bind(p.id)
        .bind(&p.name)
        .bind(&p.slug)
        .bind(&p.sku)
        .bind(&p.description)
        .bind(&p.short_description)
        .bind(&p.brand)
        .bind(p.price)
        .bind(p.sale_price)
        .bind(p.stock_quantity)
        .bind(p.category_id)
        .bind(p.status)
        .bind(p.is_visible)
        .bind(p.is_featured)
        .bind(&p.video_url)
        .bind(&p.meta_title)
        .bind(&p.meta_description)
        .bind(&p.meta_keywords)
}

pub async fn update(pool: &PgPool, id: Uuid, patch: ProductPatch, low_stock_threshold: i32) -> Result<ProductDetail, AppError> {
    let mut p = get(pool, id).await?;
    if let Some(name) = patch.name {
        p.name = validation::required("name", &name)?;
    }
    if let Some(slug) = patch.slug {
        p.slug = slug.trim().to_string();
    }
    if let Some(sku) = patch.sku {
        p.sku = validation::required("sku", &sku)?;
    }
    p.description = apply(p.description, patch.description.map(validation::optional));
    p.short_description = apply(p.short_description, patch.short_description.map(validation::optional));
    p.brand = apply(p.brand, patch.brand.map(validation::optional));
    p.price = patch.price.unwrap_or(p.price);
    p.sale_price = apply(p.sale_price, patch.sale_price);
    p.stock_quantity = patch.stock_quantity.unwrap_or(p.stock_quantity);
    p.category_id = apply(p.category_id, patch.category_id);
    p.status = patch.status.unwrap_or(p.status);
    p.is_visible = patch.is_visible.unwrap_or(p.is_visible);
    p.is_featured = patch.is_featured.unwrap_or(p.is_featured);
    p.video_url = apply(p.video_url, patch.video_url.map(validation::optional));
    p.meta_title = apply(p.meta_title, patch.meta_title.map(validation::optional));
    p.meta_description = apply(p.meta_description, patch.meta_description.map(validation::optional));
    p.meta_keywords = apply(p.meta_keywords, patch.meta_keywords.map(validation::optional));
    let children = Children {
        images: patch.images,
        specs: patch.specs,
        tags: patch.tags,
        variations: patch.variations,
    };
    validate_product(&p)?;
    validate_children(&children)?;
    ensure_unique(pool, &p, Some(id)).await?;

    let mut tx = pool.begin().await?;
    let sql = format!(
        "UPDATE {} SET name = $2, slug = $3, sku = $4, description = $5, short_description = $6, brand = $7, \
         price = $8, sale_price = $9, stock_quantity = $10, category_id = $11, status = $12, is_visible = $13, \
         is_featured = $14, video_url = $15, meta_title = $16, meta_description = $17, meta_keywords = $18, \
         updated_at = NOW() WHERE id = $1 RETURNING {}",
        table("products"),
        COLUMNS
    );
    let row = bind_product(sqlx::query_as::<_, Product>(&sql), &p)
        .fetch_one(&mut *tx)
        .await?;
    write_children(&mut *tx, id, children).await?;
    tx.commit().await?;

    notification::low_stock(pool, row.id, row.id, &row.name, row.stock_quantity, low_stock_threshold).await?;
    detail(pool, row).await
}

pub async fn set_status(pool: &PgPool, id: Uuid, status: PublishStatus) -> Result<Product, AppError> {
    let sql = format!(
        "UPDATE {} SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        table("products"),
        COLUMNS
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;
    tracing::info!(product_id = %id, status = %status, "product status changed");
    Ok(row)
}

/// Refused while a prebuilt PC lists the product as a component.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let (bundles,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE product_id = $1",
        table("prebuilt_pc_components")
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    if bundles > 0 {
        return Err(AppError::Conflict(format!(
            "product is a component of {} prebuilt PC(s)",
            bundles
        )));
    }
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("products")))
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("product {}", id)));
    }
    tracing::info!(product_id = %id, "product deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_whitelist() {
        assert!(order_clause(Some("price_asc")).contains("ASC"));
        assert!(order_clause(Some("name")).starts_with("p.name"));
        assert_eq!(order_clause(Some("1; DROP TABLE products")), order_clause(None));
    }

    #[test]
    fn like_escapes_wildcards() {
        assert_eq!(like_pattern(" 100%_off "), "%100\\%\\_off%");
    }

    #[test]
    fn brand_filter_is_literal() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products p");
        let q = ProductQuery {
            brand: Some(" %".into()),
            ..Default::default()
        };
        push_filters(&mut qb, &q, false);
        assert!(qb.sql().contains("p.brand ILIKE $1"));
        assert_eq!(escape_like("%"), "\\%");
        assert_eq!(escape_like(" G_Skill "), "G\\_Skill");
    }

    #[test]
    fn missing_category_is_dropped_but_db_errors_surface() {
        assert_eq!(found(Ok(7)).unwrap(), Some(7));
        assert!(found::<i32>(Err(AppError::NotFound("category".into()))).unwrap().is_none());
        assert!(matches!(
            found::<i32>(Err(AppError::Db(sqlx::Error::PoolTimedOut))),
            Err(AppError::Db(_))
        ));
    }

    #[test]
    fn storefront_filters_force_published() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM products p");
        let q = ProductQuery {
            status: Some(PublishStatus::Draft),
            in_stock: Some(true),
            ..Default::default()
        };
        push_filters(&mut qb, &q, true);
        let sql = qb.sql();
        assert!(sql.contains("p.status = $1"));
        assert!(sql.contains("p.is_visible = TRUE"));
        assert!(sql.contains("p.stock_quantity > 0"));
        assert!(!sql.contains("$2"));
    }

    #[test]
    fn sale_price_must_undercut() {
        let now = chrono::Utc::now();
        let mut p = Product {
            id: Uuid::new_v4(),
            name: "Ryzen 7 7800X3D".into(),
            slug: "ryzen-7-7800x3d".into(),
            sku: "CPU-7800X3D".into(),
            description: None,
            short_description: None,
            brand: Some("AMD".into()),
            price: Decimal::new(44900, 2),
            sale_price: Some(Decimal::new(44900, 2)),
            stock_quantity: 3,
            category_id: None,
            status: PublishStatus::Published,
            is_visible: true,
            is_featured: false,
            video_url: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            created_at: now,
            updated_at: now,
        };
        assert!(validate_product(&p).is_err());
        p.sale_price = Some(Decimal::new(39900, 2));
        assert!(validate_product(&p).is_ok());
        p.video_url = Some("https://example.com/video".into());
        assert!(validate_product(&p).is_err());
    }
}
