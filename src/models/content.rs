use crate::models::catalog::Tag;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct HeroBanner {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub cta_text: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HeroBanner {
    /// Active and inside its optional display window.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.map(|s| s <= now).unwrap_or(true)
            && self.ends_at.map(|e| now <= e).unwrap_or(true)
    }
}

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct BlogCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub views: i64,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BlogDetail {
    #[serde(flatten)]
    pub blog: Blog,
    pub author_name: Option<String>,
    pub category: Option<BlogCategory>,
    pub tags: Vec<Tag>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn banner(starts: Option<i64>, ends: Option<i64>, active: bool) -> HeroBanner {
        let now = Utc::now();
        HeroBanner {
            id: Uuid::new_v4(),
            title: "Summer GPUs".into(),
            subtitle: None,
            image_url: "/uploads/banners/a.webp".into(),
            link_url: None,
            cta_text: None,
            sort_order: 0,
            is_active: active,
            starts_at: starts.map(|h| now + Duration::hours(h)),
            ends_at: ends.map(|h| now + Duration::hours(h)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn banner_window() {
        let now = Utc::now();
        assert!(banner(None, None, true).is_live_at(now));
        assert!(banner(Some(-1), Some(1), true).is_live_at(now));
        assert!(!banner(Some(1), None, true).is_live_at(now));
        assert!(!banner(None, Some(-1), true).is_live_at(now));
        assert!(!banner(None, None, false).is_live_at(now));
    }
}
