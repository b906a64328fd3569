//! Field validation shared by create/update services.

use crate::error::AppError;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern"))
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

fn youtube_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#].*)?$",
        )
        .expect("youtube pattern")
    })
}

/// Lowercase ASCII slug: runs of anything else collapse to one hyphen.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Trimmed, non-empty value of a required text field.
pub fn required(field: &str, value: &str) -> Result<String, AppError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

/// Trimmed optional text; blank becomes None.
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn max_length(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn slug(field: &str, value: &str) -> Result<(), AppError> {
    if !slug_re().is_match(value) {
        return Err(AppError::Validation(format!(
            "{} must contain only lowercase letters, digits and single hyphens",
            field
        )));
    }
    Ok(())
}

/// Explicit slug if given (validated), else derived from `source`.
pub fn slug_or_derive(field: &str, explicit: Option<&str>, source: &str) -> Result<String, AppError> {
    let s = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => slugify(source),
    };
    slug(field, &s)?;
    Ok(s)
}

/// Lowercased, validated email.
pub fn email(field: &str, value: &str) -> Result<String, AppError> {
    let v = value.trim().to_lowercase();
    if v.len() > 254 || !email_re().is_match(&v) {
        return Err(AppError::Validation(format!("{} must be a valid email", field)));
    }
    Ok(v)
}

pub fn non_negative(field: &str, value: Decimal) -> Result<(), AppError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::Validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

pub fn non_negative_int(field: &str, value: i32) -> Result<(), AppError> {
    if value < 0 {
        return Err(AppError::Validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

/// Absolute http(s) URL or a site-relative path.
pub fn url(field: &str, value: &str) -> Result<(), AppError> {
    let v = value.trim();
    let ok = v.starts_with("https://") || v.starts_with("http://") || (v.starts_with('/') && !v.starts_with("//"));
    if !ok || v.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!("{} must be an http(s) URL or a path", field)));
    }
    Ok(())
}

/// Embed URL for a YouTube watch/short/share link, None for anything else.
pub fn youtube_embed_url(value: &str) -> Option<String> {
    youtube_re()
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|id| format!("https://www.youtube.com/embed/{}", id.as_str()))
}

pub fn youtube_url(field: &str, value: &str) -> Result<(), AppError> {
    if youtube_embed_url(value).is_none() {
        return Err(AppError::Validation(format!("{} must be a YouTube video URL", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  RTX 4090 -- Founders Edition! "), "rtx-4090-founders-edition");
        assert_eq!(slugify("Cases & Cooling"), "cases-cooling");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn slug_rules() {
        assert!(slug("slug", "gaming-pcs").is_ok());
        assert!(slug("slug", "Gaming").is_err());
        assert!(slug("slug", "double--dash").is_err());
        assert!(slug("slug", "-lead").is_err());
        assert!(slug_or_derive("slug", Some("  "), "Graphics Cards").unwrap() == "graphics-cards");
        assert!(slug_or_derive("slug", None, "!!!").is_err());
    }

    #[test]
    fn email_rules() {
        assert_eq!(email("email", " Buyer@Example.COM ").unwrap(), "buyer@example.com");
        assert!(email("email", "no-at-sign.com").is_err());
        assert!(email("email", "a@b").is_err());
        assert!(email("email", "a b@c.de").is_err());
    }

    #[test]
    fn youtube_links() {
        let embed = Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string());
        assert_eq!(youtube_embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), embed);
        assert_eq!(youtube_embed_url("https://youtu.be/dQw4w9WgXcQ?t=42"), embed);
        assert_eq!(youtube_embed_url("youtube.com/shorts/dQw4w9WgXcQ"), embed);
        assert_eq!(youtube_embed_url("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), embed);
        assert_eq!(youtube_embed_url("https://vimeo.com/123456"), None);
    }

    #[test]
    fn numbers_and_urls() {
        assert!(non_negative("price", Decimal::new(-1, 2)).is_err());
        assert!(non_negative("price", Decimal::ZERO).is_ok());
        assert!(url("image_url", "https://cdn.example.com/a.png").is_ok());
        assert!(url("image_url", "/uploads/a.png").is_ok());
        assert!(url("image_url", "//evil.example.com/a.png").is_err());
        assert!(url("image_url", "javascript:alert(1)").is_err());
        assert!(required("name", "   ").is_err());
        assert_eq!(optional(Some("  ".into())), None);
    }
}
