//! Hero banners and the blog.

use crate::error::AppError;
use crate::models::{Blog, BlogCategory, BlogDetail, HeroBanner};
use crate::service::patch::{apply, nullable};
use crate::service::{tag, validation};
use crate::store::{prefixed, table};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const BANNER_COLUMNS: &str = "id, title, subtitle, image_url, link_url, cta_text, sort_order, is_active, starts_at, \
                              ends_at, created_at, updated_at";
const BLOG_CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at";
pub const BLOG_COLUMNS: &str = "id, title, slug, excerpt, content, cover_image, author_id, category_id, is_published, \
                                published_at, is_featured, views, meta_title, meta_description, meta_keywords, \
                                created_at, updated_at";

// ---- hero banners ----

#[derive(Debug, Deserialize)]
pub struct BannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub cta_text: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BannerPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub subtitle: Option<Option<String>>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub link_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cta_text: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
}

fn validate_banner(b: &HeroBanner) -> Result<(), AppError> {
    validation::max_length("title", &b.title, 200)?;
    validation::url("image_url", &b.image_url)?;
    if let Some(link) = &b.link_url {
        validation::url("link_url", link)?;
    }
    if let (Some(start), Some(end)) = (b.starts_at, b.ends_at) {
        if end < start {
            return Err(AppError::Validation("ends_at must not be before starts_at".into()));
        }
    }
    Ok(())
}

/// Active banners inside their window, in display order.
pub async fn live_banners(pool: &PgPool) -> Result<Vec<HeroBanner>, AppError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE is_active = TRUE AND (starts_at IS NULL OR starts_at <= NOW()) \
         AND (ends_at IS NULL OR ends_at >= NOW()) ORDER BY sort_order, created_at",
        BANNER_COLUMNS,
        table("hero_banners")
    );
    let rows = sqlx::query_as::<_, HeroBanner>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn all_banners(pool: &PgPool) -> Result<Vec<HeroBanner>, AppError> {
    let sql = format!("SELECT {} FROM {} ORDER BY sort_order, created_at", BANNER_COLUMNS, table("hero_banners"));
    let rows = sqlx::query_as::<_, HeroBanner>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn get_banner(pool: &PgPool, id: Uuid) -> Result<HeroBanner, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", BANNER_COLUMNS, table("hero_banners"));
    sqlx::query_as::<_, HeroBanner>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("banner {}", id)))
}

async fn write_banner(pool: &PgPool, b: &HeroBanner, insert: bool) -> Result<HeroBanner, AppError> {
    let sql = if insert {
        format!(
            "INSERT INTO {} (id, title, subtitle, image_url, link_url, cta_text, sort_order, is_active, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            table("hero_banners"),
            BANNER_COLUMNS
        )
    } else {
        format!(
            "UPDATE {} SET title = $2, subtitle = $3, image_url = $4, link_url = $5, cta_text = $6, sort_order = $7, \
             is_active = $8, starts_at = $9, ends_at = $10, updated_at = NOW() WHERE id = $1 RETURNING {}",
            table("hero_banners"),
            BANNER_COLUMNS
        )
    };
    let row = sqlx::query_as::<_, HeroBanner>(&sql)
        .bind(b.id)
        .bind(&b.title)
        .bind(&b.subtitle)
        .bind(&b.image_url)
        .bind(&b.link_url)
        .bind(&b.cta_text)
        .bind(b.sort_order)
        .bind(b.is_active)
        .bind(b.starts_at)
        .bind(b.ends_at)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn create_banner(pool: &PgPool, input: BannerInput) -> Result<HeroBanner, AppError> {
    let now = Utc::now();
    let b = HeroBanner {
        id: Uuid::new_v4(),
        title: validation::required("title", &input.title)?,
        subtitle: validation::optional(input.subtitle),
        image_url: validation::required("image_url", &input.image_url)?,
        link_url: validation::optional(input.link_url),
        cta_text: validation::optional(input.cta_text),
        sort_order: input.sort_order.unwrap_or(0),
        is_active: input.is_active.unwrap_or(true),
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        created_at: now,
        updated_at: now,
    };
    validate_banner(&b)?;
    write_banner(pool, &b, true).await
}

pub async fn update_banner(pool: &PgPool, id: Uuid, patch: BannerPatch) -> Result<HeroBanner, AppError> {
    let mut b = get_banner(pool, id).await?;
    if let Some(title) = patch.title {
        b.title = validation::required("title", &title)?;
    }
    if let Some(image) = patch.image_url {
        b.image_url = validation::required("image_url", &image)?;
    }
    b.subtitle = apply(b.subtitle, patch.subtitle.map(validation::optional));
    b.link_url = apply(b.link_url, patch.link_url.map(validation::optional));
    b.cta_text = apply(b.cta_text, patch.cta_text.map(validation::optional));
    b.sort_order = patch.sort_order.unwrap_or(b.sort_order);
    b.is_active = patch.is_active.unwrap_or(b.is_active);
    b.starts_at = apply(b.starts_at, patch.starts_at);
    b.ends_at = apply(b.ends_at, patch.ends_at);
    validate_banner(&b)?;
    write_banner(pool, &b, false).await
}

pub async fn delete_banner(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    delete_by_id(pool, "hero_banners", "banner", id).await
}

async fn delete_by_id(pool: &PgPool, name: &str, label: &str, id: Uuid) -> Result<(), AppError> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table(name)))
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} {}", label, id)));
    }
    Ok(())
}

// ---- blog categories ----

#[derive(Debug, Deserialize)]
pub struct BlogCategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

pub async fn blog_categories(pool: &PgPool) -> Result<Vec<BlogCategory>, AppError> {
    let sql = format!("SELECT {} FROM {} ORDER BY name", BLOG_CATEGORY_COLUMNS, table("blog_categories"));
    let rows = sqlx::query_as::<_, BlogCategory>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn get_blog_category(pool: &PgPool, id: Uuid) -> Result<BlogCategory, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", BLOG_CATEGORY_COLUMNS, table("blog_categories"));
    sqlx::query_as::<_, BlogCategory>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("blog category {}", id)))
}

async fn blog_category_slug_taken(pool: &PgPool, slug: &str, except: Option<Uuid>) -> Result<bool, AppError> {
    let (taken,): (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        table("blog_categories")
    ))
    .bind(slug)
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

/// Create when `id` is None, otherwise replace name, slug and description.
pub async fn save_blog_category(pool: &PgPool, id: Option<Uuid>, input: BlogCategoryInput) -> Result<BlogCategory, AppError> {
    let name = validation::required("name", &input.name)?;
    let slug = validation::slug_or_derive("slug", input.slug.as_deref(), &name)?;
    if let Some(id) = id {
        get_blog_category(pool, id).await?;
    }
    if blog_category_slug_taken(pool, &slug, id).await? {
        return Err(AppError::Conflict(format!("blog category slug already exists: {}", slug)));
    }
    let description = validation::optional(input.description);
    let sql = match id {
        None => format!(
            "INSERT INTO {} (id, name, slug, description) VALUES ($1, $2, $3, $4) RETURNING {}",
            table("blog_categories"),
            BLOG_CATEGORY_COLUMNS
        ),
        Some(_) => format!(
            "UPDATE {} SET name = $2, slug = $3, description = $4 WHERE id = $1 RETURNING {}",
            table("blog_categories"),
            BLOG_CATEGORY_COLUMNS
        ),
    };
    let row = sqlx::query_as::<_, BlogCategory>(&sql)
        .bind(id.unwrap_or_else(Uuid::new_v4))
        .bind(&name)
        .bind(&slug)
        .bind(&description)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn delete_blog_category(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let (posts,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {} WHERE category_id = $1", table("blogs")))
        .bind(id)
        .fetch_one(pool)
        .await?;
    if posts > 0 {
        return Err(AppError::Conflict(format!("blog category still has {} post(s)", posts)));
    }
    delete_by_id(pool, "blog_categories", "blog category", id).await
}

// ---- blogs ----

#[derive(Debug, Default, Deserialize)]
pub struct BlogQuery {
    /// Blog category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
    pub featured: Option<bool>,
    /// Admin only.
    pub published: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BlogInput {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub meta_keywords: Option<Option<String>>,
}

/// published_at is stamped the first time a post is published and kept afterwards.
pub fn published_at(was: Option<DateTime<Utc>>, is_published: bool, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match (was, is_published) {
        (Some(t), _) => Some(t),
        (None, true) => Some(now),
        (None, false) => None,
    }
}

fn push_blog_filters(qb: &mut QueryBuilder<'_, Postgres>, q: &BlogQuery, storefront: bool) {
    qb.push(" WHERE TRUE");
    if storefront {
        qb.push(" AND b.is_published = TRUE");
    } else if let Some(published) = q.published {
        qb.push(" AND b.is_published = ").push_bind(published);
    }
    if let Some(slug) = q.category.as_deref().filter(|s| !s.is_empty()) {
        qb.push(format!(
            " AND b.category_id IN (SELECT id FROM {} WHERE slug = ",
            table("blog_categories")
        ));
        qb.push_bind(slug.to_string()).push(")");
    }
    if let Some(slug) = q.tag.as_deref().filter(|s| !s.is_empty()) {
        qb.push(format!(
            " AND EXISTS (SELECT 1 FROM {} bt JOIN {} t ON t.id = bt.tag_id WHERE bt.blog_id = b.id AND t.slug = ",
            table("blog_tags"),
            table("tags")
        ));
        qb.push_bind(slug.to_string()).push(")");
    }
    if let Some(featured) = q.featured {
        qb.push(" AND b.is_featured = ").push_bind(featured);
    }
}

pub async fn list_blogs(pool: &PgPool, q: &BlogQuery, storefront: bool, limit: i64, offset: i64) -> Result<(Vec<Blog>, i64), AppError> {
    let mut count_qb = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {} b", table("blogs")));
    push_blog_filters(&mut count_qb, q, storefront);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM {} b",
        prefixed(BLOG_COLUMNS, "b"),
        table("blogs")
    ));
    push_blog_filters(&mut qb, q, storefront);
    qb.push(" ORDER BY COALESCE(b.published_at, b.created_at) DESC, b.id LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<Blog>().fetch_all(pool).await?;
    Ok((rows, total))
}

pub async fn get_blog(pool: &PgPool, id: Uuid) -> Result<Blog, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", BLOG_COLUMNS, table("blogs"));
    sqlx::query_as::<_, Blog>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("blog {}", id)))
}

pub async fn blog_detail(pool: &PgPool, blog: Blog) -> Result<BlogDetail, AppError> {
    let author_name: Option<String> = match blog.author_id {
        Some(author) => sqlx::query_as::<_, (String,)>(&format!("SELECT name FROM {} WHERE id = $1", table("users")))
            .bind(author)
            .fetch_optional(pool)
            .await?
            .map(|(n,)| n),
        None => None,
    };
    let category = match blog.category_id {
        Some(cid) => get_blog_category(pool, cid).await.ok(),
        None => None,
    };
    let tags = tag::attached(pool, "blog_tags", "blog_id", blog.id).await?;
    Ok(BlogDetail {
        blog,
        author_name,
        category,
        tags,
    })
}

/// Published post by slug; each read counts as a view.
pub async fn view_published(pool: &PgPool, slug: &str) -> Result<BlogDetail, AppError> {
    let sql = format!(
        "UPDATE {} SET views = views + 1 WHERE slug = $1 AND is_published = TRUE RETURNING {}",
        table("blogs"),
        BLOG_COLUMNS
    );
    let blog = sqlx::query_as::<_, Blog>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("blog {}", slug)))?;
    blog_detail(pool, blog).await
}

fn validate_blog(b: &Blog) -> Result<(), AppError> {
    validation::max_length("title", &b.title, 200)?;
    validation::slug("slug", &b.slug)?;
    validation::required("content", &b.content)?;
    if let Some(cover) = &b.cover_image {
        validation::url("cover_image", cover)?;
    }
    Ok(())
}

async fn check_blog_refs(pool: &PgPool, b: &Blog, except: Option<Uuid>) -> Result<(), AppError> {
    let (taken,): (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        table("blogs")
    ))
    .bind(&b.slug)
    .bind(except)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(AppError::Conflict(format!("blog slug already exists: {}", b.slug)));
    }
    if let Some(cid) = b.category_id {
        get_blog_category(pool, cid)
            .await
            .map_err(|_| AppError::Validation(format!("blog category {} does not exist", cid)))?;
    }
    Ok(())
}

async fn write_blog(pool: &PgPool, b: &Blog, tags: Option<&[String]>, insert: bool) -> Result<BlogDetail, AppError> {
    let sql = if insert {
        format!(
            "INSERT INTO {} (id, title, slug, excerpt, content, cover_image, author_id, category_id, is_published, \
             published_at, is_featured, meta_title, meta_description, meta_keywords) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) RETURNING {}",
            table("blogs"),
            BLOG_COLUMNS
        )
    } else {
        format!(
            "UPDATE {} SET title = $2, slug = $3, excerpt = $4, content = $5, cover_image = $6, author_id = $7, \
             category_id = $8, is_published = $9, published_at = $10, is_featured = $11, meta_title = $12, \
             meta_description = $13, meta_keywords = $14, updated_at = NOW() WHERE id = $1 RETURNING {}",
            table("blogs"),
            BLOG_COLUMNS
        )
    };
    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<_, Blog>(&sql)
        .bind(b.id)
        .bind(&b.title)
        .bind(&b.slug)
        .bind(&b.excerpt)
        .bind(&b.content)
        .bind(&b.cover_image)
        .bind(b.author_id)
        .bind(b.category_id)
        .bind(b.is_published)
        .bind(b.published_at)
        .bind(b.is_featured)
        .bind(&b.meta_title)
        .bind(&b.meta_description)
        .bind(&b.meta_keywords)
        .fetch_one(&mut *tx)
        .await?;
    if let Some(names) = tags {
        tag::replace_attached(&mut *tx, "blog_tags", "blog_id", row.id, names).await?;
    }
    tx.commit().await?;
    blog_detail(pool, row).await
}

pub async fn create_blog(pool: &PgPool, author_id: Uuid, input: BlogInput) -> Result<BlogDetail, AppError> {
    let title = validation::required("title", &input.title)?;
    let now = Utc::now();
    let is_published = input.is_published.unwrap_or(false);
    let b = Blog {
        id: Uuid::new_v4(),
        slug: validation::slug_or_derive("slug", input.slug.as_deref(), &title)?,
        title,
        excerpt: validation::optional(input.excerpt),
        content: input.content,
        cover_image: validation::optional(input.cover_image),
        author_id: Some(author_id),
        category_id: input.category_id,
        is_published,
        published_at: published_at(None, is_published, now),
        is_featured: input.is_featured.unwrap_or(false),
        views: 0,
        meta_title: validation::optional(input.meta_title),
        meta_description: validation::optional(input.meta_description),
        meta_keywords: validation::optional(input.meta_keywords),
        created_at: now,
        updated_at: now,
    };
    validate_blog(&b)?;
    check_blog_refs(pool, &b, None).await?;
    let detail = write_blog(pool, &b, Some(&input.tags), true).await?;
    tracing::info!(blog_id = %detail.blog.id, published = is_published, "blog post created");
    Ok(detail)
}

pub async fn update_blog(pool: &PgPool, id: Uuid, patch: BlogPatch) -> Result<BlogDetail, AppError> {
    let mut b = get_blog(pool, id).await?;
    if let Some(title) = patch.title {
        b.title = validation::required("title", &title)?;
    }
    if let Some(slug) = patch.slug {
        b.slug = slug.trim().to_string();
    }
    if let Some(content) = patch.content {
        b.content = content;
    }
    b.excerpt = apply(b.excerpt, patch.excerpt.map(validation::optional));
    b.cover_image = apply(b.cover_image, patch.cover_image.map(validation::optional));
    b.category_id = apply(b.category_id, patch.category_id);
    b.is_published = patch.is_published.unwrap_or(b.is_published);
    b.published_at = published_at(b.published_at, b.is_published, Utc::now());
    b.is_featured = patch.is_featured.unwrap_or(b.is_featured);
    b.meta_title = apply(b.meta_title, patch.meta_title.map(validation::optional));
    b.meta_description = apply(b.meta_description, patch.meta_description.map(validation::optional));
    b.meta_keywords = apply(b.meta_keywords, patch.meta_keywords.map(validation::optional));
    validate_blog(&b)?;
    check_blog_refs(pool, &b, Some(id)).await?;
    write_blog(pool, &b, patch.tags.as_deref(), false).await
}

pub async fn delete_blog(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    delete_by_id(pool, "blogs", "blog", id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn first_publish_stamps_once() {
        let now = Utc::now();
        let earlier = now - Duration::days(3);
        assert_eq!(published_at(None, false, now), None);
        assert_eq!(published_at(None, true, now), Some(now));
        assert_eq!(published_at(Some(earlier), true, now), Some(earlier));
        assert_eq!(published_at(Some(earlier), false, now), Some(earlier));
    }

    #[test]
    fn storefront_blog_filter_ignores_published_flag() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM blogs b");
        let q = BlogQuery {
            published: Some(false),
            tag: Some("overclocking".into()),
            ..Default::default()
        };
        push_blog_filters(&mut qb, &q, true);
        let sql = qb.sql();
        assert!(sql.contains("b.is_published = TRUE"));
        assert!(sql.contains("t.slug = $1"));
    }

    #[test]
    fn banner_window_must_be_ordered() {
        let now = Utc::now();
        let b = HeroBanner {
            id: Uuid::new_v4(),
            title: "Black Friday".into(),
            subtitle: None,
            image_url: "https://cdn.example.com/bf.webp".into(),
            link_url: None,
            cta_text: None,
            sort_order: 0,
            is_active: true,
            starts_at: Some(now),
            ends_at: Some(now - Duration::hours(1)),
            created_at: now,
            updated_at: now,
        };
        assert!(validate_banner(&b).is_err());
    }
}
