use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Payment provider that owns a subscription relationship
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentProvider {
    Radom,
    #[sqlx(rename = "paypal")]
    #[serde(rename = "paypal")]
    #[strum(serialize = "paypal")]
    PayPal,
    #[sqlx(rename = "gocardless")]
    #[serde(rename = "gocardless")]
    #[strum(serialize = "gocardless")]
    GoCardless,
    Stripe,
}

impl PaymentProvider {
    /// Human-readable display name for the provider
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentProvider::Radom => "Radom",
            PaymentProvider::PayPal => "PayPal",
            PaymentProvider::GoCardless => "GoCardless",
            PaymentProvider::Stripe => "Stripe",
        }
    }

    /// Direct-debit providers create the account before the payer authorizes anything
    /// and only activate it once the first mandate is confirmed.
    pub fn is_direct_debit(&self) -> bool {
        matches!(self, PaymentProvider::GoCardless)
    }

    pub fn all() -> &'static [PaymentProvider] {
        &[
            PaymentProvider::Radom,
            PaymentProvider::PayPal,
            PaymentProvider::GoCardless,
            PaymentProvider::Stripe,
        ]
    }
}
