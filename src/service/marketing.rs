//! Newsletter list and email campaigns.

use crate::config::settings::{SettingsKey, SmtpSettings};
use crate::error::AppError;
use crate::models::{Audience, Campaign, Role, Subscriber, UserStatus};
use crate::service::mail::{Mailer, OutgoingEmail};
use crate::service::{settings, validation};
use crate::store::table;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

const CAMPAIGN_COLUMNS: &str = "id, subject, audience, recipients, sent, failed, created_by, created_at";

#[derive(Debug, Deserialize)]
pub struct EmailInput {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SendInput {
    pub subject: String,
    pub html: String,
    pub audience: Audience,
}

#[derive(Debug, Deserialize)]
pub struct TestInput {
    pub to: String,
    pub subject: Option<String>,
    pub html: Option<String>,
}

pub async fn subscribe(pool: &PgPool, email: &str) -> Result<Subscriber, AppError> {
    let email = validation::email("email", email)?;
    let row = sqlx::query_as::<_, Subscriber>(&format!(
        "INSERT INTO {} (email, subscribed) VALUES ($1, TRUE) \
         ON CONFLICT (email) DO UPDATE SET subscribed = TRUE, updated_at = NOW() \
         RETURNING email, subscribed, created_at, updated_at",
        table("newsletter_subscribers")
    ))
    .bind(&email)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Unknown addresses are accepted silently.
pub async fn unsubscribe(pool: &PgPool, email: &str) -> Result<(), AppError> {
    let email = validation::email("email", email)?;
    sqlx::query(&format!(
        "UPDATE {} SET subscribed = FALSE, updated_at = NOW() WHERE email = $1",
        table("newsletter_subscribers")
    ))
    .bind(&email)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn subscribers(pool: &PgPool, limit: i64, offset: i64) -> Result<(Vec<Subscriber>, i64), AppError> {
    let rows = sqlx::query_as::<_, Subscriber>(&format!(
        "SELECT email, subscribed, created_at, updated_at FROM {} ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        table("newsletter_subscribers")
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table("newsletter_subscribers")))
        .fetch_one(pool)
        .await?;
    Ok((rows, total))
}

/// Lowercased, sorted, without duplicates.
pub fn dedupe(emails: impl IntoIterator<Item = String>) -> Vec<String> {
    emails
        .into_iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub async fn recipients(pool: &PgPool, audience: Audience) -> Result<Vec<String>, AppError> {
    let mut emails: Vec<String> = Vec::new();
    if matches!(audience, Audience::Subscribers | Audience::All) {
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT email FROM {} WHERE subscribed = TRUE",
            table("newsletter_subscribers")
        ))
        .fetch_all(pool)
        .await?;
        emails.extend(rows.into_iter().map(|(e,)| e));
    }
    if matches!(audience, Audience::Customers | Audience::All) {
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT email FROM {} WHERE role = $1 AND status = $2",
            table("users")
        ))
        .bind(Role::Customer)
        .bind(UserStatus::Active)
        .fetch_all(pool)
        .await?;
        emails.extend(rows.into_iter().map(|(e,)| e));
    }
    Ok(dedupe(emails))
}

async fn smtp(pool: &PgPool) -> Result<SmtpSettings, AppError> {
    let smtp = settings::load::<SmtpSettings>(pool, SettingsKey::Smtp).await?;
    if !smtp.is_configured() {
        return Err(AppError::Validation("SMTP is not configured".into()));
    }
    Ok(smtp)
}

/// Send to every recipient of the audience and record the campaign.
pub async fn send(pool: &PgPool, mailer: &dyn Mailer, admin_id: Uuid, input: SendInput) -> Result<Campaign, AppError> {
    let subject = validation::required("subject", &input.subject)?;
    validation::max_length("subject", &subject, 200)?;
    let html = validation::required("html", &input.html)?;
    let smtp = smtp(pool).await?;
    let to = recipients(pool, input.audience).await?;

    let mut sent = 0i32;
    let mut failed = 0i32;
    for address in &to {
        let email = OutgoingEmail {
            to: address.clone(),
            subject: subject.clone(),
            html: html.clone(),
        };
        match mailer.send(&smtp, &email).await {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(to = %address, error = %e, "campaign email failed");
            }
        }
    }

    let campaign = sqlx::query_as::<_, Campaign>(&format!(
        "INSERT INTO {} (id, subject, audience, recipients, sent, failed, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
        table("marketing_campaigns"),
        CAMPAIGN_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&subject)
    .bind(input.audience)
    .bind(to.len() as i32)
    .bind(sent)
    .bind(failed)
    .bind(admin_id)
    .fetch_one(pool)
    .await?;
    tracing::info!(
        campaign_id = %campaign.id,
        audience = %campaign.audience,
        recipients = campaign.recipients,
        sent,
        failed,
        "campaign sent"
    );
    Ok(campaign)
}

pub async fn campaigns(pool: &PgPool, limit: i64, offset: i64) -> Result<(Vec<Campaign>, i64), AppError> {
    let rows = sqlx::query_as::<_, Campaign>(&format!(
        "SELECT {} FROM {} ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        CAMPAIGN_COLUMNS,
        table("marketing_campaigns")
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table("marketing_campaigns")))
        .fetch_one(pool)
        .await?;
    Ok((rows, total))
}

/// Single message to check the SMTP settings; delivery errors are returned to the caller.
pub async fn send_test(pool: &PgPool, mailer: &dyn Mailer, input: TestInput) -> Result<(), AppError> {
    let to = validation::email("to", &input.to)?;
    let smtp = smtp(pool).await?;
    let email = OutgoingEmail {
        to,
        subject: validation::optional(input.subject).unwrap_or_else(|| "SMTP test".into()),
        html: validation::optional(input.html)
            .unwrap_or_else(|| "<p>Your store can send email.</p>".into()),
    };
    mailer.send(&smtp, &email).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_deduplicated_case_insensitively() {
        let list = dedupe(vec![
            "Buyer@Example.com".to_string(),
            "buyer@example.com ".to_string(),
            "other@example.com".to_string(),
            "".to_string(),
        ]);
        assert_eq!(list, vec!["buyer@example.com", "other@example.com"]);
    }
}
