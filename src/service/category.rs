//! Category tree: storefront menu, admin CRUD, referential guards on delete.

use crate::error::AppError;
use crate::models::{Category, CategoryNode, CategoryWithCount};
use crate::service::patch::{apply, nullable};
use crate::service::validation;
use crate::store::{prefixed, table};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

const COLUMNS: &str = "id, name, slug, description, image_url, parent_id, is_visible, is_featured, sort_order, \
                       meta_title, meta_description, meta_keywords, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<Uuid>>,
    pub is_visible: Option<bool>,
    pub is_featured: Option<bool>,
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_keywords: Option<Option<String>>,
}

/// Nest categories under their parents. Only rows reachable from a root (no parent) are kept.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<Category>> = HashMap::new();
    for c in categories {
        by_parent.entry(c.parent_id).or_default().push(c);
    }
    fn attach(parent: Option<Uuid>, by_parent: &mut HashMap<Option<Uuid>, Vec<Category>>) -> Vec<CategoryNode> {
        let mut level = by_parent.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        level
            .into_iter()
            .map(|category| {
                let children = attach(Some(category.id), by_parent);
                CategoryNode { category, children }
            })
            .collect()
    }
    attach(None, &mut by_parent)
}

/// Drop hidden nodes together with everything below them.
pub fn prune_hidden(nodes: Vec<CategoryNode>) -> Vec<CategoryNode> {
    nodes
        .into_iter()
        .filter(|n| n.category.is_visible)
        .map(|n| CategoryNode {
            children: prune_hidden(n.children),
            category: n.category,
        })
        .collect()
}

fn find_slug(nodes: Vec<CategoryNode>, slug: &str) -> Option<CategoryNode> {
    for node in nodes {
        if node.category.slug == slug {
            return Some(node);
        }
        if let Some(found) = find_slug(node.children, slug) {
            return Some(found);
        }
    }
    None
}

/// True when making `new_parent` the parent of `id` would put `id` among its own ancestors.
pub fn creates_cycle(parents: &HashMap<Uuid, Option<Uuid>>, id: Uuid, new_parent: Option<Uuid>) -> bool {
    let mut cursor = new_parent;
    let mut steps = 0usize;
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            // Existing data already loops; refuse rather than spin.
            return true;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

async fn all(pool: &PgPool) -> Result<Vec<Category>, AppError> {
    let sql = format!("SELECT {} FROM {} ORDER BY sort_order, name", COLUMNS, table("categories"));
    Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?)
}

/// Storefront menu; a hidden category hides its whole subtree.
pub async fn visible_tree(pool: &PgPool) -> Result<Vec<CategoryNode>, AppError> {
    Ok(prune_hidden(build_tree(all(pool).await?)))
}

pub async fn featured(pool: &PgPool) -> Result<Vec<Category>, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE is_visible = TRUE AND is_featured = TRUE ORDER BY sort_order, name",
        COLUMNS,
        table("categories")
    );
    Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?)
}

/// Visible category by slug with its visible subtree. 404 when it or any ancestor is hidden.
pub async fn visible_by_slug(pool: &PgPool, slug: &str) -> Result<CategoryNode, AppError> {
    let tree = visible_tree(pool).await?;
    find_slug(tree, slug).ok_or_else(|| AppError::NotFound(format!("category {}", slug)))
}

pub async fn admin_list(pool: &PgPool) -> Result<Vec<CategoryWithCount>, AppError> {
    let cols = prefixed(COLUMNS, "c");
    let sql = format!(
        "SELECT {}, (SELECT COUNT(*) FROM {} p WHERE p.category_id = c.id) AS product_count \
         FROM {} c ORDER BY c.sort_order, c.name",
        cols,
        table("products"),
        table("categories")
    );
    Ok(sqlx::query_as::<_, CategoryWithCount>(&sql).fetch_all(pool).await?)
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Category, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", COLUMNS, table("categories"));
    sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {}", id)))
}

async fn ensure_slug_free(pool: &PgPool, slug: &str, except: Option<Uuid>) -> Result<(), AppError> {
    let (taken,): (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        table("categories")
    ))
    .bind(slug)
    .bind(except)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::Conflict(format!("category slug already exists: {}", slug)));
    }
    Ok(())
}

fn validate_fields(c: &Category) -> Result<(), AppError> {
    validation::max_length("name", &c.name, 120)?;
    validation::slug("slug", &c.slug)?;
    if let Some(url) = &c.image_url {
        validation::url("image_url", url)?;
    }
    Ok(())
}

pub async fn create(pool: &PgPool, input: CategoryInput) -> Result<Category, AppError> {
    let name = validation::required("name", &input.name)?;
    let slug = validation::slug_or_derive("slug", input.slug.as_deref(), &name)?;
    let now = chrono::Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name,
        slug,
        description: validation::optional(input.description),
        image_url: validation::optional(input.image_url),
        parent_id: input.parent_id,
        is_visible: input.is_visible.unwrap_or(true),
        is_featured: input.is_featured.unwrap_or(false),
        sort_order: input.sort_order.unwrap_or(0),
        meta_title: validation::optional(input.meta_title),
        meta_description: validation::optional(input.meta_description),
        meta_keywords: validation::optional(input.meta_keywords),
        created_at: now,
        updated_at: now,
    };
    validate_fields(&category)?;
    if let Some(parent) = category.parent_id {
        get(pool, parent).await?;
    }
    ensure_slug_free(pool, &category.slug, None).await?;

    let sql = format!(
        "INSERT INTO {} (id, name, slug, description, image_url, parent_id, is_visible, is_featured, sort_order, \
         meta_title, meta_description, meta_keywords) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING {}",
        table("categories"),
        COLUMNS
    );
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.image_url)
        .bind(category.parent_id)
        .bind(category.is_visible)
        .bind(category.is_featured)
        .bind(category.sort_order)
        .bind(&category.meta_title)
        .bind(&category.meta_description)
        .bind(&category.meta_keywords)
        .fetch_one(pool)
        .await?;
    tracing::info!(category_id = %row.id, slug = %row.slug, "category created");
    Ok(row)
}

pub async fn update(pool: &PgPool, id: Uuid, patch: CategoryPatch) -> Result<Category, AppError> {
    let mut c = get(pool, id).await?;
    if let Some(name) = patch.name {
        c.name = validation::required("name", &name)?;
    }
    if let Some(slug) = patch.slug {
        c.slug = slug.trim().to_string();
    }
    c.description = apply(c.description, patch.description.map(validation::optional));
    c.image_url = apply(c.image_url, patch.image_url.map(validation::optional));
    c.meta_title = apply(c.meta_title, patch.meta_title.map(validation::optional));
    c.meta_description = apply(c.meta_description, patch.meta_description.map(validation::optional));
    c.meta_keywords = apply(c.meta_keywords, patch.meta_keywords.map(validation::optional));
    c.is_visible = patch.is_visible.unwrap_or(c.is_visible);
    c.is_featured = patch.is_featured.unwrap_or(c.is_featured);
    c.sort_order = patch.sort_order.unwrap_or(c.sort_order);
    if let Some(parent) = patch.parent_id {
        if let Some(p) = parent {
            get(pool, p).await?;
        }
        let rows: Vec<(Uuid, Option<Uuid>)> =
            sqlx::query_as(&format!("SELECT id, parent_id FROM {}", table("categories")))
                .fetch_all(pool)
                .await?;
        let parents: HashMap<Uuid, Option<Uuid>> = rows.into_iter().collect();
        if creates_cycle(&parents, id, parent) {
            return Err(AppError::Validation(
                "a category cannot be moved under itself or its descendants".into(),
            ));
        }
        c.parent_id = parent;
    }
    validate_fields(&c)?;
    ensure_slug_free(pool, &c.slug, Some(id)).await?;

    let sql = format!(
        "UPDATE {} SET name = $2, slug = $3, description = $4, image_url = $5, parent_id = $6, is_visible = $7, \
         is_featured = $8, sort_order = $9, meta_title = $10, meta_description = $11, meta_keywords = $12, \
         updated_at = NOW() WHERE id = $1 RETURNING {}",
        table("categories"),
        COLUMNS
    );
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .bind(&c.name)
        .bind(&c.slug)
        .bind(&c.description)
        .bind(&c.image_url)
        .bind(c.parent_id)
        .bind(c.is_visible)
        .bind(c.is_featured)
        .bind(c.sort_order)
        .bind(&c.meta_title)
        .bind(&c.meta_description)
        .bind(&c.meta_keywords)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// Blocked while products reference the category; children move up to its parent.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let parent: Option<(Option<Uuid>,)> = sqlx::query_as(&format!(
        "SELECT parent_id FROM {} WHERE id = $1 FOR UPDATE",
        table("categories")
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let (parent_id,) = parent.ok_or_else(|| AppError::NotFound(format!("category {}", id)))?;

    let (products,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE category_id = $1",
        table("products")
    ))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if products > 0 {
        return Err(AppError::Conflict(format!(
            "category still has {} product(s); move or delete them first",
            products
        )));
    }

    let moved = sqlx::query(&format!(
        "UPDATE {} SET parent_id = $2, updated_at = NOW() WHERE parent_id = $1",
        table("categories")
    ))
    .bind(id)
    .bind(parent_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("categories")))
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    tracing::info!(category_id = %id, reassigned_children = moved, "category deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cat(name: &str, parent: Option<Uuid>, sort: i32) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: validation::slugify(name),
            description: None,
            image_url: None,
            parent_id: parent,
            is_visible: true,
            is_featured: false,
            sort_order: sort,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tree_nests_and_orders() {
        let components = cat("Components", None, 0);
        let gpus = cat("GPUs", Some(components.id), 2);
        let cpus = cat("CPUs", Some(components.id), 1);
        let laptops = cat("Laptops", None, 1);
        let tree = build_tree(vec![gpus, laptops, cpus, components]);
        let names: Vec<&str> = tree.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(names, vec!["Components", "Laptops"]);
        let children: Vec<&str> = tree[0].children.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(children, vec!["CPUs", "GPUs"]);
    }

    #[test]
    fn unreachable_rows_are_not_promoted() {
        let gpus = cat("GPUs", Some(Uuid::new_v4()), 0);
        assert!(build_tree(vec![gpus]).is_empty());
    }

    #[test]
    fn hidden_category_hides_its_subtree() {
        let mut components = cat("Components", None, 0);
        components.is_visible = false;
        let gpus = cat("GPUs", Some(components.id), 0);
        let laptops = cat("Laptops", None, 1);
        let mut gaming = cat("Gaming Laptops", Some(laptops.id), 0);
        gaming.is_visible = false;
        let ultrabooks = cat("Ultrabooks", Some(laptops.id), 1);

        let tree = prune_hidden(build_tree(vec![components, gpus, laptops, gaming, ultrabooks]));
        let roots: Vec<&str> = tree.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(roots, vec!["Laptops"]);
        let children: Vec<&str> = tree[0].children.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(children, vec!["Ultrabooks"]);

        assert!(find_slug(tree.clone(), "gpus").is_none());
        assert!(find_slug(tree.clone(), "gaming-laptops").is_none());
        assert_eq!(find_slug(tree, "ultrabooks").map(|n| n.category.name), Some("Ultrabooks".to_string()));
    }

    #[test]
    fn cycle_detection() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        // a <- b <- c
        let parents: HashMap<Uuid, Option<Uuid>> = [(a, None), (b, Some(a)), (c, Some(b))].into_iter().collect();
        assert!(creates_cycle(&parents, a, Some(c)));
        assert!(creates_cycle(&parents, b, Some(b)));
        assert!(!creates_cycle(&parents, c, Some(a)));
        assert!(!creates_cycle(&parents, a, None));
    }
}
