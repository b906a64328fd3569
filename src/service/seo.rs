//! SEO checklist scoring for products, blog posts and categories.

use crate::error::AppError;
use crate::service::{category, content, product, validation};
use crate::store::table;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct SeoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Comma-separated.
    pub keywords: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub has_image: bool,
}

#[derive(Debug, Serialize, PartialEq, ToSchema)]
pub struct SeoCheck {
    #[schema(value_type = String)]
    pub id: &'static str,
    pub passed: bool,
    pub points: u32,
    pub max_points: u32,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeoReport {
    pub score: u32,
    pub checks: Vec<SeoCheck>,
}

pub const TITLE_RANGE: (usize, usize) = (30, 60);
pub const DESCRIPTION_RANGE: (usize, usize) = (120, 160);
pub const KEYWORD_RANGE: (usize, usize) = (3, 10);
pub const MIN_CONTENT: usize = 300;

pub fn keywords(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or("")
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn text(v: &Option<String>) -> &str {
    v.as_deref().map(str::trim).unwrap_or("")
}

/// Full weight inside the range, half when present but outside it.
fn length_check(id: &'static str, label: &str, value: &str, range: (usize, usize), weight: u32) -> SeoCheck {
    let len = value.chars().count();
    let (points, message) = if len == 0 {
        (0, format!("{} is missing", label))
    } else if len >= range.0 && len <= range.1 {
        (weight, format!("{} length is {} characters", label, len))
    } else {
        (
            weight / 2,
            format!("{} is {} characters; aim for {}-{}", label, len, range.0, range.1),
        )
    };
    SeoCheck {
        id,
        passed: points == weight,
        points,
        max_points: weight,
        message,
    }
}

fn flag(id: &'static str, passed: bool, weight: u32, ok: &str, missing: &str) -> SeoCheck {
    SeoCheck {
        id,
        passed,
        points: if passed { weight } else { 0 },
        max_points: weight,
        message: if passed { ok.to_string() } else { missing.to_string() },
    }
}

pub fn score(input: &SeoInput) -> SeoReport {
    let title = text(&input.title);
    let kw = keywords(input.keywords.as_deref());
    let slug = text(&input.slug);
    let content_len = text(&input.content).chars().count();

    let checks = vec![
        length_check("title_length", "Meta title", title, TITLE_RANGE, 20),
        length_check("description_length", "Meta description", text(&input.description), DESCRIPTION_RANGE, 20),
        flag(
            "keyword_count",
            kw.len() >= KEYWORD_RANGE.0 && kw.len() <= KEYWORD_RANGE.1,
            15,
            &format!("{} keywords", kw.len()),
            &format!("{} keywords; use {}-{}", kw.len(), KEYWORD_RANGE.0, KEYWORD_RANGE.1),
        ),
        flag(
            "slug",
            validation::slug("slug", slug).is_ok(),
            10,
            "Slug is URL friendly",
            "Slug should be lowercase words joined by hyphens",
        ),
        flag(
            "content_length",
            content_len >= MIN_CONTENT,
            20,
            &format!("Content has {} characters", content_len),
            &format!("Content has {} characters; write at least {}", content_len, MIN_CONTENT),
        ),
        flag("image", input.has_image, 10, "Has an image", "Add an image"),
        flag(
            "title_keyword",
            kw.first().map(|k| title.to_lowercase().contains(k.as_str())).unwrap_or(false),
            5,
            "Title contains the focus keyword",
            "Put the first keyword in the title",
        ),
    ];
    SeoReport {
        score: checks.iter().map(|c| c.points).sum(),
        checks,
    }
}

/// Meta fields fall back to the visible name and summary.
fn pick(meta: &Option<String>, fallback: Option<&String>) -> Option<String> {
    validation::optional(meta.clone()).or_else(|| fallback.cloned())
}

pub async fn for_product(pool: &PgPool, id: Uuid) -> Result<SeoReport, AppError> {
    let p = product::get(pool, id).await?;
    let (images,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE product_id = $1",
        table("product_images")
    ))
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(score(&SeoInput {
        title: pick(&p.meta_title, Some(&p.name)),
        description: pick(&p.meta_description, p.short_description.as_ref()),
        keywords: p.meta_keywords.clone(),
        slug: Some(p.slug.clone()),
        content: p.description.clone(),
        has_image: images > 0,
    }))
}

pub async fn for_blog(pool: &PgPool, id: Uuid) -> Result<SeoReport, AppError> {
    let b = content::get_blog(pool, id).await?;
    Ok(score(&SeoInput {
        title: pick(&b.meta_title, Some(&b.title)),
        description: pick(&b.meta_description, b.excerpt.as_ref()),
        keywords: b.meta_keywords.clone(),
        slug: Some(b.slug.clone()),
        content: Some(b.content.clone()),
        has_image: b.cover_image.is_some(),
    }))
}

pub async fn for_category(pool: &PgPool, id: Uuid) -> Result<SeoReport, AppError> {
    let c = category::get(pool, id).await?;
    Ok(score(&SeoInput {
        title: pick(&c.meta_title, Some(&c.name)),
        description: pick(&c.meta_description, c.description.as_ref()),
        keywords: c.meta_keywords.clone(),
        slug: Some(c.slug.clone()),
        content: c.description.clone(),
        has_image: c.image_url.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perfect() -> SeoInput {
        SeoInput {
            title: Some("Gaming PC builds: the RTX 4090 flagship guide".into()),
            description: Some("x".repeat(140)),
            keywords: Some("gaming pc, rtx 4090, custom build".into()),
            slug: Some("gaming-pc-rtx-4090".into()),
            content: Some("y".repeat(400)),
            has_image: true,
        }
    }

    #[test]
    fn weights_sum_to_100() {
        let report = score(&perfect());
        assert_eq!(report.checks.iter().map(|c| c.max_points).sum::<u32>(), 100);
        assert_eq!(report.score, 100);
        assert!(report.checks.iter().all(|c| c.passed));
    }

    #[test]
    fn empty_input_scores_zero() {
        let report = score(&SeoInput::default());
        assert_eq!(report.score, 0);
    }

    #[test]
    fn out_of_range_title_gets_half() {
        let mut input = perfect();
        input.title = Some("Gaming PC".into());
        let report = score(&input);
        let title = report.checks.iter().find(|c| c.id == "title_length").unwrap();
        assert_eq!(title.points, 10);
        assert!(!title.passed);
        // "gaming pc" is still in the title.
        assert_eq!(report.score, 90);
    }

    #[test]
    fn keyword_rules() {
        assert_eq!(keywords(Some(" A, b ,,c ")), vec!["a", "b", "c"]);
        let mut input = perfect();
        input.keywords = Some("ssd, nvme".into());
        let report = score(&input);
        let kw = report.checks.iter().find(|c| c.id == "keyword_count").unwrap();
        assert_eq!(kw.points, 0);
        input.keywords = Some("water cooling, aio, radiator".into());
        let report = score(&input);
        let tk = report.checks.iter().find(|c| c.id == "title_keyword").unwrap();
        assert!(!tk.passed);
    }

    #[test]
    fn bad_slug_loses_points() {
        let mut input = perfect();
        input.slug = Some("Gaming PC".into());
        assert_eq!(score(&input).score, 90);
    }
}
