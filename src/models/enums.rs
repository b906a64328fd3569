//! Enumerations stored as TEXT columns. Encode/Decode go through their SCREAMING_SNAKE_CASE names.

use serde::{Deserialize, Serialize};
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Decode};
use utoipa::ToSchema;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("invalid {}: '{}'", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <str as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <str as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'q> Encode<'q, Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
            ) -> Result<IsNull, BoxDynError> {
                <&str as Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: <Postgres as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse::<$name>().map_err(Into::into)
            }
        }
    };
}

text_enum!(Role {
    Admin => "ADMIN",
    Customer => "CUSTOMER",
});

text_enum!(UserStatus {
    Active => "ACTIVE",
    Blocked => "BLOCKED",
});

text_enum!(
    /// Publication state shared by products and prebuilt PCs.
    PublishStatus {
        Draft => "DRAFT",
        Published => "PUBLISHED",
        Archived => "ARCHIVED",
    }
);

text_enum!(OrderStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

text_enum!(PaymentMethod {
    CashOnDelivery => "CASH_ON_DELIVERY",
    Card => "CARD",
    BankTransfer => "BANK_TRANSFER",
});

text_enum!(NotificationKind {
    NewOrder => "NEW_ORDER",
    LowStock => "LOW_STOCK",
    Milestone => "MILESTONE",
    NewCustomer => "NEW_CUSTOMER",
    System => "SYSTEM",
});

text_enum!(
    /// Recipient set of a marketing send.
    Audience {
        Subscribers => "SUBSCRIBERS",
        Customers => "CUSTOMERS",
        All => "ALL",
    }
);

text_enum!(TrackEvent {
    PageView => "PAGE_VIEW",
    Engagement => "ENGAGEMENT",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_matches_serde_name() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str(), Some(status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for kind in NotificationKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json.as_str(), Some(kind.as_str()));
        }
        let method: PaymentMethod = serde_json::from_str("\"CASH_ON_DELIVERY\"").unwrap();
        assert_eq!(method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn unknown_text_rejected() {
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert!("SUPERUSER".parse::<Role>().is_err());
    }
}
