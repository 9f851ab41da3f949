use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::{
    account_status::AccountStatus,
    payment_account::{AccountMatch, ProviderRef},
    payment_provider::PaymentProvider,
};

/// Provider-independent meaning of a webhook event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EventKind {
    /// New subscription or completed checkout
    SubscriptionActivated,
    /// A (renewal or one-off) payment cleared
    PaymentConfirmed,
    PaymentFailed,
    SubscriptionExpired,
    SubscriptionCancelled,
    /// Refund, reversal or chargeback of a subscription payment
    PaymentRefunded,
    /// Direct-debit mandate created
    MandateCreated,
}

impl EventKind {
    /// Status an account ends up in after this event.
    pub fn target_status(&self) -> AccountStatus {
        match self {
            EventKind::SubscriptionActivated
            | EventKind::PaymentConfirmed
            | EventKind::MandateCreated => AccountStatus::Active,
            EventKind::PaymentFailed | EventKind::SubscriptionExpired => AccountStatus::Disabled,
            EventKind::SubscriptionCancelled | EventKind::PaymentRefunded => {
                AccountStatus::Cancelled
            }
        }
    }

    /// Events that reverse any commission credited for the subscription.
    pub fn reverses_commission(&self) -> bool {
        matches!(
            self,
            EventKind::SubscriptionCancelled | EventKind::PaymentRefunded
        )
    }
}

/// A provider webhook event after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    /// Provider event id, or a body fingerprint when the provider sends none
    pub event_id: String,
    pub kind: EventKind,
    pub reference: ProviderRef,
    pub amount_cents: Option<i64>,
    pub product_id: Option<String>,
    /// User id carried in the payload itself (checkout metadata, client reference)
    pub user_id: Option<Uuid>,
}

impl ProviderEvent {
    pub fn new(event_id: impl Into<String>, kind: EventKind, reference: ProviderRef) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            reference,
            amount_cents: None,
            product_id: None,
            user_id: None,
        }
    }

    pub fn provider(&self) -> PaymentProvider {
        self.reference.provider()
    }

    pub fn account_match(&self) -> AccountMatch {
        AccountMatch::new(self.reference.clone(), self.user_id)
    }
}
