//! Settings rows: typed reads for the backend, masked JSON for the admin console, a public view for the storefront.

use crate::config::settings::{
    PaymentSettings, SeasonalEffect, SeasonalSettings, SettingsKey, ShippingSettings, StoreSettings,
};
use crate::error::AppError;
use crate::service::validation;
use crate::store::table;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use utoipa::ToSchema;

/// Stored JSON of a section, or its default when never saved.
pub async fn raw(pool: &PgPool, key: SettingsKey) -> Result<Value, AppError> {
    let row: Option<(Value,)> = sqlx::query_as(&format!("SELECT value FROM {} WHERE key = $1", table("settings")))
        .bind(key.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or_else(|| key.default_value()))
}

/// Typed section. A stored value that no longer fits the type falls back to defaults.
pub async fn load<T: DeserializeOwned + Default>(pool: &PgPool, key: SettingsKey) -> Result<T, AppError> {
    let value = raw(pool, key).await?;
    match serde_json::from_value(value) {
        Ok(v) => Ok(v),
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "stored settings unreadable, using defaults");
            Ok(T::default())
        }
    }
}

/// Section as shown to admins: secrets masked.
pub async fn admin_view(pool: &PgPool, key: SettingsKey) -> Result<Value, AppError> {
    let mut value = raw(pool, key).await?;
    key.mask_secrets(&mut value);
    Ok(value)
}

/// Money and rate fields must not go negative.
fn check_amounts(key: SettingsKey, normalized: &Value) -> Result<(), AppError> {
    let parse_err = |e: serde_json::Error| AppError::Validation(format!("settings '{}': {}", key.as_str(), e));
    match key {
        SettingsKey::Store => {
            let store: StoreSettings = serde_json::from_value(normalized.clone()).map_err(parse_err)?;
            validation::non_negative("tax_rate", store.tax_rate)
        }
        SettingsKey::Shipping => {
            let shipping: ShippingSettings = serde_json::from_value(normalized.clone()).map_err(parse_err)?;
            validation::non_negative("flat_rate", shipping.flat_rate)?;
            match shipping.free_shipping_threshold {
                Some(threshold) => validation::non_negative("free_shipping_threshold", threshold),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

/// Validate and store a section. A masked secret in the body keeps the stored one.
pub async fn save(pool: &PgPool, key: SettingsKey, mut value: Value) -> Result<Value, AppError> {
    if !value.is_object() {
        return Err(AppError::Validation(format!("settings '{}' must be an object", key.as_str())));
    }
    let stored = raw(pool, key).await?;
    key.restore_masked_secrets(&mut value, &stored);
    let normalized = key
        .normalize(value)
        .map_err(|e| AppError::Validation(format!("settings '{}': {}", key.as_str(), e)))?;
    check_amounts(key, &normalized)?;
    sqlx::query(&format!(
        "INSERT INTO {} (key, value, updated_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        table("settings")
    ))
    .bind(key.as_str())
    .bind(&normalized)
    .execute(pool)
    .await?;
    tracing::info!(key = key.as_str(), "settings saved");
    let mut shown = normalized;
    key.mask_secrets(&mut shown);
    Ok(shown)
}

/// Storefront-safe settings.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicSettings {
    pub store_name: String,
    pub currency: String,
    #[schema(value_type = String)]
    pub tax_rate: Decimal,
    #[schema(value_type = String)]
    pub shipping_flat_rate: Decimal,
    #[schema(value_type = Option<String>)]
    pub free_shipping_threshold: Option<Decimal>,
    pub payment_provider: String,
    pub payment_public_key: Option<String>,
    pub cash_on_delivery: bool,
    pub seasonal_effect: Option<SeasonalEffect>,
}

pub fn public_view(
    store: StoreSettings,
    shipping: ShippingSettings,
    payment: PaymentSettings,
    seasonal: &SeasonalSettings,
    today: chrono::NaiveDate,
) -> PublicSettings {
    PublicSettings {
        store_name: store.name,
        currency: store.currency,
        tax_rate: store.tax_rate,
        shipping_flat_rate: shipping.flat_rate,
        free_shipping_threshold: shipping.free_shipping_threshold,
        payment_provider: payment.provider,
        payment_public_key: payment.public_key,
        cash_on_delivery: payment.cash_on_delivery,
        seasonal_effect: seasonal.active_effect(today),
    }
}

pub async fn public(pool: &PgPool) -> Result<PublicSettings, AppError> {
    let store = load::<StoreSettings>(pool, SettingsKey::Store).await?;
    let shipping = load::<ShippingSettings>(pool, SettingsKey::Shipping).await?;
    let payment = load::<PaymentSettings>(pool, SettingsKey::Payment).await?;
    let seasonal = load::<SeasonalSettings>(pool, SettingsKey::Seasonal).await?;
    Ok(public_view(store, shipping, payment, &seasonal, chrono::Utc::now().date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn negative_amounts_rejected() {
        let store = SettingsKey::Store.normalize(json!({ "tax_rate": "-0.05" })).unwrap();
        assert!(matches!(check_amounts(SettingsKey::Store, &store), Err(AppError::Validation(_))));
        let shipping = SettingsKey::Shipping
            .normalize(json!({ "flat_rate": "-1", "free_shipping_threshold": "100" }))
            .unwrap();
        assert!(check_amounts(SettingsKey::Shipping, &shipping).is_err());
        let shipping = SettingsKey::Shipping
            .normalize(json!({ "flat_rate": "0", "free_shipping_threshold": "-100" }))
            .unwrap();
        assert!(check_amounts(SettingsKey::Shipping, &shipping).is_err());
        let shipping = SettingsKey::Shipping.normalize(json!({ "flat_rate": "0" })).unwrap();
        assert!(check_amounts(SettingsKey::Shipping, &shipping).is_ok());
    }

    #[test]
    fn public_view_hides_secret_key() {
        let payment = PaymentSettings {
            secret_key: Some("sk_live_123".into()),
            public_key: Some("pk_live_123".into()),
            ..Default::default()
        };
        let view = public_view(
            StoreSettings::default(),
            ShippingSettings::default(),
            payment,
            &SeasonalSettings::default(),
            chrono::NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
        );
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("sk_live_123"));
        assert!(json.contains("pk_live_123"));
        assert_eq!(view.seasonal_effect, None);
    }
}
