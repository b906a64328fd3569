//! Table DDL and database bootstrap. All tables live in a schema named from `RIGSTORE_SCHEMA` env (default `rigstore`).

use crate::error::AppError;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Schema name for all tables. From env `RIGSTORE_SCHEMA`, default `rigstore`. Must be a valid PostgreSQL identifier.
pub fn store_schema() -> String {
    std::env::var("RIGSTORE_SCHEMA").unwrap_or_else(|_| "rigstore".into())
}

/// Returns schema-qualified table name (e.g. "rigstore.products").
pub fn table(name: &str) -> String {
    format!("{}.{}", store_schema(), name)
}

/// Prefix each column of a comma-separated list with a table alias ("id, name" -> "p.id, p.name").
pub fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// (table, column definitions). `{s}` is replaced by the schema name. Ordered so foreign keys resolve.
const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        phone TEXT,
        role TEXT NOT NULL DEFAULT 'CUSTOMER' CHECK (role IN ('ADMIN', 'CUSTOMER')),
        status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'BLOCKED')),
        email_verified BOOLEAN NOT NULL DEFAULT FALSE,
        verification_token TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "sessions",
        r#"
        token TEXT PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES {s}.users(id) ON DELETE CASCADE,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "categories",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        image_url TEXT,
        parent_id UUID REFERENCES {s}.categories(id) ON DELETE SET NULL,
        is_visible BOOLEAN NOT NULL DEFAULT TRUE,
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        sort_order INTEGER NOT NULL DEFAULT 0,
        meta_title TEXT,
        meta_description TEXT,
        meta_keywords TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "products",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        sku TEXT NOT NULL UNIQUE,
        description TEXT,
        short_description TEXT,
        brand TEXT,
        price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        sale_price NUMERIC(12, 2) CHECK (sale_price >= 0),
        stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
        category_id UUID REFERENCES {s}.categories(id) ON DELETE RESTRICT,
        status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
        is_visible BOOLEAN NOT NULL DEFAULT TRUE,
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        video_url TEXT,
        meta_title TEXT,
        meta_description TEXT,
        meta_keywords TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "product_images",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        product_id UUID NOT NULL REFERENCES {s}.products(id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        alt_text TEXT,
        sort_order INTEGER NOT NULL DEFAULT 0
        "#,
    ),
    (
        "product_specs",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        product_id UUID NOT NULL REFERENCES {s}.products(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0
        "#,
    ),
    (
        "tags",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL UNIQUE,
        slug TEXT NOT NULL UNIQUE
        "#,
    ),
    (
        "product_tags",
        r#"
        product_id UUID NOT NULL REFERENCES {s}.products(id) ON DELETE CASCADE,
        tag_id UUID NOT NULL REFERENCES {s}.tags(id) ON DELETE CASCADE,
        PRIMARY KEY (product_id, tag_id)
        "#,
    ),
    (
        "product_variations",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        product_id UUID NOT NULL REFERENCES {s}.products(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        sku TEXT UNIQUE,
        price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0)
        "#,
    ),
    (
        "prebuilt_pcs",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        image_url TEXT,
        price NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
        status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'PUBLISHED', 'ARCHIVED')),
        is_visible BOOLEAN NOT NULL DEFAULT TRUE,
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "prebuilt_pc_components",
        r#"
        prebuilt_pc_id UUID NOT NULL REFERENCES {s}.prebuilt_pcs(id) ON DELETE CASCADE,
        product_id UUID NOT NULL REFERENCES {s}.products(id) ON DELETE RESTRICT,
        quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity > 0),
        PRIMARY KEY (prebuilt_pc_id, product_id)
        "#,
    ),
    (
        "carts",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID UNIQUE REFERENCES {s}.users(id) ON DELETE CASCADE,
        session_id TEXT UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (user_id IS NOT NULL OR session_id IS NOT NULL)
        "#,
    ),
    (
        "cart_items",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        cart_id UUID NOT NULL REFERENCES {s}.carts(id) ON DELETE CASCADE,
        product_id UUID REFERENCES {s}.products(id) ON DELETE CASCADE,
        variation_id UUID REFERENCES {s}.product_variations(id) ON DELETE CASCADE,
        prebuilt_pc_id UUID REFERENCES {s}.prebuilt_pcs(id) ON DELETE CASCADE,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK ((product_id IS NOT NULL) <> (prebuilt_pc_id IS NOT NULL))
        "#,
    ),
    (
        "orders",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        order_number TEXT NOT NULL UNIQUE,
        user_id UUID REFERENCES {s}.users(id) ON DELETE SET NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        payment_status TEXT NOT NULL DEFAULT 'PENDING',
        payment_method TEXT NOT NULL,
        subtotal NUMERIC(12, 2) NOT NULL,
        shipping_cost NUMERIC(12, 2) NOT NULL,
        tax NUMERIC(12, 2) NOT NULL,
        total NUMERIC(12, 2) NOT NULL,
        shipping_address JSONB NOT NULL,
        notes TEXT,
        carrier TEXT,
        tracking_number TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "order_items",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        order_id UUID NOT NULL REFERENCES {s}.orders(id) ON DELETE CASCADE,
        product_id UUID REFERENCES {s}.products(id) ON DELETE SET NULL,
        variation_id UUID REFERENCES {s}.product_variations(id) ON DELETE SET NULL,
        prebuilt_pc_id UUID REFERENCES {s}.prebuilt_pcs(id) ON DELETE SET NULL,
        name TEXT NOT NULL,
        sku TEXT,
        unit_price NUMERIC(12, 2) NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        line_total NUMERIC(12, 2) NOT NULL
        "#,
    ),
    (
        "order_timeline",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        order_id UUID NOT NULL REFERENCES {s}.orders(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        note TEXT,
        actor_id UUID REFERENCES {s}.users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "notifications",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        link TEXT,
        entity_id UUID,
        is_read BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "hero_banners",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        subtitle TEXT,
        image_url TEXT NOT NULL,
        link_url TEXT,
        cta_text TEXT,
        sort_order INTEGER NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        starts_at TIMESTAMPTZ,
        ends_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "blog_categories",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "blogs",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        excerpt TEXT,
        content TEXT NOT NULL,
        cover_image TEXT,
        author_id UUID REFERENCES {s}.users(id) ON DELETE SET NULL,
        category_id UUID REFERENCES {s}.blog_categories(id) ON DELETE RESTRICT,
        is_published BOOLEAN NOT NULL DEFAULT FALSE,
        published_at TIMESTAMPTZ,
        is_featured BOOLEAN NOT NULL DEFAULT FALSE,
        views BIGINT NOT NULL DEFAULT 0,
        meta_title TEXT,
        meta_description TEXT,
        meta_keywords TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "blog_tags",
        r#"
        blog_id UUID NOT NULL REFERENCES {s}.blogs(id) ON DELETE CASCADE,
        tag_id UUID NOT NULL REFERENCES {s}.tags(id) ON DELETE CASCADE,
        PRIMARY KEY (blog_id, tag_id)
        "#,
    ),
    (
        "newsletter_subscribers",
        r#"
        email TEXT PRIMARY KEY,
        subscribed BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "marketing_campaigns",
        r#"
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        subject TEXT NOT NULL,
        audience TEXT NOT NULL,
        recipients INTEGER NOT NULL,
        sent INTEGER NOT NULL,
        failed INTEGER NOT NULL,
        created_by UUID REFERENCES {s}.users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "settings",
        r#"
        key TEXT PRIMARY KEY,
        value JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
    (
        "page_views",
        r#"
        id BIGSERIAL PRIMARY KEY,
        session_id TEXT NOT NULL,
        visitor_id TEXT NOT NULL,
        path TEXT NOT NULL,
        referrer TEXT,
        event TEXT NOT NULL,
        duration_ms BIGINT,
        scroll_depth INTEGER,
        user_id UUID,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        "#,
    ),
];

/// (index name, table, columns).
const INDEXES: &[(&str, &str, &str)] = &[
    ("idx_products_category", "products", "category_id"),
    ("idx_products_status", "products", "status, is_visible"),
    ("idx_cart_items_cart", "cart_items", "cart_id"),
    ("idx_orders_user", "orders", "user_id"),
    ("idx_orders_status", "orders", "status"),
    ("idx_order_items_order", "order_items", "order_id"),
    ("idx_order_timeline_order", "order_timeline", "order_id, created_at"),
    ("idx_notifications_unread", "notifications", "is_read, created_at"),
    ("idx_page_views_created", "page_views", "created_at"),
    ("idx_sessions_user", "sessions", "user_id"),
];

/// Create schema from `RIGSTORE_SCHEMA` env if not exists, then every table and index.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    let schema = store_schema();
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(pool)
        .await?;

    for (name, columns) in TABLES {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table(name),
            columns.replace("{s}", &schema)
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    for (index, name, columns) in INDEXES {
        let ddl = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            index,
            table(name),
            columns
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    tracing::info!(schema = %schema, tables = TABLES.len(), "store tables ensured");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url.rfind('/').ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_database_name() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@localhost:5432/rigstore?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "rigstore");
    }

    #[test]
    fn foreign_keys_reference_earlier_tables() {
        let mut seen: Vec<&str> = Vec::new();
        for (name, columns) in TABLES {
            for part in columns.split("REFERENCES {s}.").skip(1) {
                let target = part.split('(').next().unwrap_or("");
                assert!(
                    seen.contains(&target) || target == *name,
                    "{} references {} before it is created",
                    name,
                    target
                );
            }
            seen.push(name);
        }
    }

    #[test]
    fn prefixes_columns() {
        assert_eq!(prefixed("id, name,slug", "c"), "c.id, c.name, c.slug");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("shop\"db"), "\"shop\"\"db\"");
    }
}
