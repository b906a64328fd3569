//! Admin-editable settings sections, stored as JSONB rows keyed by section name.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Placeholder returned instead of stored secrets.
pub const MASKED_SECRET: &str = "********";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsKey {
    Store,
    Smtp,
    Shipping,
    Payment,
    Seasonal,
}

impl SettingsKey {
    pub const ALL: [SettingsKey; 5] = [
        SettingsKey::Store,
        SettingsKey::Smtp,
        SettingsKey::Shipping,
        SettingsKey::Payment,
        SettingsKey::Seasonal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingsKey::Store => "store",
            SettingsKey::Smtp => "smtp",
            SettingsKey::Shipping => "shipping",
            SettingsKey::Payment => "payment",
            SettingsKey::Seasonal => "seasonal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// JSON pointers of secret fields in this section.
    fn secret_fields(self) -> &'static [&'static str] {
        match self {
            SettingsKey::Smtp => &["password"],
            SettingsKey::Payment => &["secret_key"],
            _ => &[],
        }
    }

    /// Default value of the section, as JSON.
    pub fn default_value(self) -> Value {
        let v = match self {
            SettingsKey::Store => serde_json::to_value(StoreSettings::default()),
            SettingsKey::Smtp => serde_json::to_value(SmtpSettings::default()),
            SettingsKey::Shipping => serde_json::to_value(ShippingSettings::default()),
            SettingsKey::Payment => serde_json::to_value(PaymentSettings::default()),
            SettingsKey::Seasonal => serde_json::to_value(SeasonalSettings::default()),
        };
        v.unwrap_or(Value::Null)
    }

    /// Check that `value` deserializes into this section's type; returns the normalized JSON.
    pub fn normalize(self, value: Value) -> Result<Value, serde_json::Error> {
        match self {
            SettingsKey::Store => serde_json::to_value(serde_json::from_value::<StoreSettings>(value)?),
            SettingsKey::Smtp => serde_json::to_value(serde_json::from_value::<SmtpSettings>(value)?),
            SettingsKey::Shipping => serde_json::to_value(serde_json::from_value::<ShippingSettings>(value)?),
            SettingsKey::Payment => serde_json::to_value(serde_json::from_value::<PaymentSettings>(value)?),
            SettingsKey::Seasonal => serde_json::to_value(serde_json::from_value::<SeasonalSettings>(value)?),
        }
    }

    /// Replace non-empty secrets with the mask.
    pub fn mask_secrets(self, value: &mut Value) {
        for field in self.secret_fields() {
            if let Some(slot) = value.get_mut(*field) {
                if slot.as_str().map(|s| !s.is_empty()).unwrap_or(false) {
                    *slot = Value::String(MASKED_SECRET.into());
                }
            }
        }
    }

    /// A masked secret in an incoming update keeps the stored secret.
    pub fn restore_masked_secrets(self, incoming: &mut Value, stored: &Value) {
        for field in self.secret_fields() {
            let masked = incoming.get(*field).and_then(Value::as_str) == Some(MASKED_SECRET);
            if masked {
                let previous = stored.get(*field).cloned().unwrap_or(Value::Null);
                if let Some(slot) = incoming.get_mut(*field) {
                    *slot = previous;
                }
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct StoreSettings {
    pub name: String,
    pub currency: String,
    /// Fraction, e.g. 0.08 for 8%.
    #[schema(value_type = String)]
    pub tax_rate: Decimal,
    pub contact_email: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: "RigStore".into(),
            currency: "USD".into(),
            tax_rate: Decimal::ZERO,
            contact_email: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: Option<String>,
    /// Encrypted when true: implicit TLS on port 465, STARTTLS on any other port.
    /// Plaintext (local relay) when false.
    pub secure: bool,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        SmtpSettings {
            host: String::new(),
            port: 587,
            username: None,
            password: None,
            from_address: String::new(),
            from_name: None,
            secure: true,
        }
    }
}

impl SmtpSettings {
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.from_address.trim().is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ShippingSettings {
    #[schema(value_type = String)]
    pub flat_rate: Decimal,
    /// Orders at or above this subtotal ship free. None disables free shipping.
    #[schema(value_type = Option<String>)]
    pub free_shipping_threshold: Option<Decimal>,
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            flat_rate: Decimal::new(1500, 2),
            free_shipping_threshold: Some(Decimal::new(50000, 2)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    pub provider: String,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub enabled: bool,
    pub cash_on_delivery: bool,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            provider: "manual".into(),
            public_key: None,
            secret_key: None,
            enabled: true,
            cash_on_delivery: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeasonalEffect {
    Snow,
    FlyingSanta,
    Fireworks,
    Hearts,
    Pumpkins,
}

/// A recurring calendar day, written "MM-DD".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn of(date: NaiveDate) -> Self {
        MonthDay {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl TryFrom<String> for MonthDay {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (m, d) = s
            .split_once('-')
            .ok_or_else(|| format!("expected MM-DD, got '{}'", s))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{}'", s))?;
        let day: u32 = d.parse().map_err(|_| format!("invalid day in '{}'", s))?;
        // 2000 is a leap year, so 02-29 is accepted.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(format!("no such day '{}'", s));
        }
        Ok(MonthDay { month, day })
    }
}

impl From<MonthDay> for String {
    fn from(md: MonthDay) -> Self {
        format!("{:02}-{:02}", md.month, md.day)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalSettings {
    pub enabled: bool,
    pub effect: SeasonalEffect,
    pub starts_on: Option<MonthDay>,
    pub ends_on: Option<MonthDay>,
}

impl Default for SeasonalSettings {
    fn default() -> Self {
        SeasonalSettings {
            enabled: false,
            effect: SeasonalEffect::Snow,
            starts_on: None,
            ends_on: None,
        }
    }
}

impl SeasonalSettings {
    /// Inclusive window; a start after the end wraps over New Year.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        if !self.enabled {
            return false;
        }
        let md = MonthDay::of(today);
        match (self.starts_on, self.ends_on) {
            (Some(start), Some(end)) if start <= end => start <= md && md <= end,
            (Some(start), Some(end)) => md >= start || md <= end,
            (Some(start), None) => md >= start,
            (None, Some(end)) => md <= end,
            (None, None) => true,
        }
    }

    pub fn active_effect(&self, today: NaiveDate) -> Option<SeasonalEffect> {
        self.is_active_on(today).then_some(self.effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seasonal(start: Option<&str>, end: Option<&str>) -> SeasonalSettings {
        SeasonalSettings {
            enabled: true,
            effect: SeasonalEffect::Snow,
            starts_on: start.map(|s| MonthDay::try_from(s.to_string()).unwrap()),
            ends_on: end.map(|s| MonthDay::try_from(s.to_string()).unwrap()),
        }
    }

    #[test]
    fn window_crossing_new_year() {
        let s = seasonal(Some("12-01"), Some("01-06"));
        assert!(s.is_active_on(date(2025, 12, 24)));
        assert!(s.is_active_on(date(2026, 1, 6)));
        assert!(!s.is_active_on(date(2026, 1, 7)));
        assert!(!s.is_active_on(date(2025, 11, 30)));
    }

    #[test]
    fn plain_window_and_open_ends() {
        let s = seasonal(Some("10-15"), Some("10-31"));
        assert!(s.is_active_on(date(2026, 10, 31)));
        assert!(!s.is_active_on(date(2026, 11, 1)));
        assert!(seasonal(None, None).is_active_on(date(2026, 6, 1)));
        assert!(seasonal(Some("06-01"), None).is_active_on(date(2026, 12, 31)));
        assert!(!seasonal(None, Some("02-14")).is_active_on(date(2026, 2, 15)));
    }

    #[test]
    fn disabled_is_never_active() {
        let mut s = seasonal(None, None);
        s.enabled = false;
        assert_eq!(s.active_effect(date(2026, 12, 25)), None);
    }

    #[test]
    fn month_day_parsing() {
        assert!(MonthDay::try_from("02-29".to_string()).is_ok());
        assert!(MonthDay::try_from("13-01".to_string()).is_err());
        assert!(MonthDay::try_from("0431".to_string()).is_err());
        let md: MonthDay = serde_json::from_value(json!("12-01")).unwrap();
        assert_eq!(serde_json::to_value(md).unwrap(), json!("12-01"));
    }

    #[test]
    fn secrets_masked_and_restored() {
        let stored = json!({ "host": "smtp.example.com", "password": "hunter2" });
        let mut shown = stored.clone();
        SettingsKey::Smtp.mask_secrets(&mut shown);
        assert_eq!(shown["password"], json!(MASKED_SECRET));

        let mut incoming = json!({ "host": "smtp2.example.com", "password": MASKED_SECRET });
        SettingsKey::Smtp.restore_masked_secrets(&mut incoming, &stored);
        assert_eq!(incoming["password"], json!("hunter2"));
    }

    #[test]
    fn normalize_rejects_wrong_shape() {
        assert!(SettingsKey::Shipping.normalize(json!({ "flat_rate": "abc" })).is_err());
        let v = SettingsKey::Seasonal
            .normalize(json!({ "enabled": true, "effect": "FLYING_SANTA" }))
            .unwrap();
        assert_eq!(v["effect"], json!("FLYING_SANTA"));
        assert_eq!(SettingsKey::parse("payment"), Some(SettingsKey::Payment));
        assert_eq!(SettingsKey::parse("nope"), None);
    }
}
