//! Tags shared by products and blog posts; created on demand from names.

use crate::error::AppError;
use crate::models::Tag;
use crate::service::validation;
use crate::store::table;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Distinct, trimmed names keyed by slug; names that slugify to nothing are dropped.
pub fn normalize_names(names: &[String]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for name in names {
        let name = name.trim();
        let slug = validation::slugify(name);
        if slug.is_empty() || out.iter().any(|(_, s)| *s == slug) {
            continue;
        }
        out.push((name.to_string(), slug));
    }
    out
}

/// Find or create a tag per name; returns them in input order.
pub async fn upsert(conn: &mut PgConnection, names: &[String]) -> Result<Vec<Tag>, AppError> {
    let mut tags = Vec::new();
    for (name, slug) in normalize_names(names) {
        sqlx::query(&format!(
            "INSERT INTO {} (id, name, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            table("tags")
        ))
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&slug)
        .execute(&mut *conn)
        .await?;
        let tag = sqlx::query_as::<_, Tag>(&format!(
            "SELECT id, name, slug FROM {} WHERE slug = $1 OR name = $2 LIMIT 1",
            table("tags")
        ))
        .bind(&slug)
        .bind(&name)
        .fetch_one(&mut *conn)
        .await?;
        tags.push(tag);
    }
    Ok(tags)
}

pub async fn list(pool: &PgPool) -> Result<Vec<Tag>, AppError> {
    let rows = sqlx::query_as::<_, Tag>(&format!("SELECT id, name, slug FROM {} ORDER BY name", table("tags")))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Tags attached through a join table (`product_tags` or `blog_tags`).
pub async fn attached(pool: &PgPool, join_table: &str, owner_column: &str, owner: Uuid) -> Result<Vec<Tag>, AppError> {
    let sql = format!(
        "SELECT t.id, t.name, t.slug FROM {} t JOIN {} j ON j.tag_id = t.id WHERE j.{} = $1 ORDER BY t.name",
        table("tags"),
        table(join_table),
        owner_column
    );
    let rows = sqlx::query_as::<_, Tag>(&sql).bind(owner).fetch_all(pool).await?;
    Ok(rows)
}

/// Replace the tag set of one owner row.
pub async fn replace_attached(
    conn: &mut PgConnection,
    join_table: &str,
    owner_column: &str,
    owner: Uuid,
    names: &[String],
) -> Result<Vec<Tag>, AppError> {
    sqlx::query(&format!("DELETE FROM {} WHERE {} = $1", table(join_table), owner_column))
        .bind(owner)
        .execute(&mut *conn)
        .await?;
    let tags = upsert(&mut *conn, names).await?;
    for tag in &tags {
        sqlx::query(&format!(
            "INSERT INTO {} ({}, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            table(join_table),
            owner_column
        ))
        .bind(owner)
        .bind(tag.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_by_slug() {
        let names = vec!["RGB".to_string(), " rgb ".to_string(), "Water Cooling".to_string(), "!!".to_string()];
        let out = normalize_names(&names);
        assert_eq!(
            out,
            vec![
                ("RGB".to_string(), "rgb".to_string()),
                ("Water Cooling".to_string(), "water-cooling".to_string())
            ]
        );
    }
}
