use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{account_status::AccountStatus, payment_provider::PaymentProvider};

// ============================================================================
// Provider References
// ============================================================================

/// Provider-scoped identifiers of one subscription relationship.
///
/// Each variant carries only the identifiers its provider actually issues.
/// `checkout_*` / `billing_request_id` is the id known at checkout time,
/// before the provider has created a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderRef {
    Radom {
        subscription_id: Option<String>,
        checkout_session_id: Option<String>,
    },
    #[serde(rename = "paypal")]
    PayPal {
        subscription_id: Option<String>,
        /// Correlation id handed to PayPal as `custom_id`
        checkout_id: Option<String>,
    },
    #[serde(rename = "gocardless")]
    GoCardless {
        subscription_id: Option<String>,
        billing_request_id: Option<String>,
        mandate_id: Option<String>,
    },
    Stripe {
        subscription_id: Option<String>,
        checkout_session_id: Option<String>,
    },
}

impl ProviderRef {
    /// Rebuild a reference from flattened storage columns.
    pub fn from_parts(
        provider: PaymentProvider,
        subscription_id: Option<String>,
        checkout_id: Option<String>,
        mandate_id: Option<String>,
    ) -> Self {
        match provider {
            PaymentProvider::Radom => ProviderRef::Radom {
                subscription_id,
                checkout_session_id: checkout_id,
            },
            PaymentProvider::PayPal => ProviderRef::PayPal {
                subscription_id,
                checkout_id,
            },
            PaymentProvider::GoCardless => ProviderRef::GoCardless {
                subscription_id,
                billing_request_id: checkout_id,
                mandate_id,
            },
            PaymentProvider::Stripe => ProviderRef::Stripe {
                subscription_id,
                checkout_session_id: checkout_id,
            },
        }
    }

    /// Empty reference for a provider, used as a starting point by normalizers.
    pub fn empty(provider: PaymentProvider) -> Self {
        Self::from_parts(provider, None, None, None)
    }

    pub fn provider(&self) -> PaymentProvider {
        match self {
            ProviderRef::Radom { .. } => PaymentProvider::Radom,
            ProviderRef::PayPal { .. } => PaymentProvider::PayPal,
            ProviderRef::GoCardless { .. } => PaymentProvider::GoCardless,
            ProviderRef::Stripe { .. } => PaymentProvider::Stripe,
        }
    }

    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            ProviderRef::Radom { subscription_id, .. }
            | ProviderRef::PayPal { subscription_id, .. }
            | ProviderRef::GoCardless { subscription_id, .. }
            | ProviderRef::Stripe { subscription_id, .. } => subscription_id.as_deref(),
        }
    }

    /// Checkout session, billing request or PayPal correlation id.
    pub fn checkout_id(&self) -> Option<&str> {
        match self {
            ProviderRef::Radom {
                checkout_session_id,
                ..
            }
            | ProviderRef::Stripe {
                checkout_session_id,
                ..
            } => checkout_session_id.as_deref(),
            ProviderRef::PayPal { checkout_id, .. } => checkout_id.as_deref(),
            ProviderRef::GoCardless {
                billing_request_id,
                ..
            } => billing_request_id.as_deref(),
        }
    }

    pub fn mandate_id(&self) -> Option<&str> {
        match self {
            ProviderRef::GoCardless { mandate_id, .. } => mandate_id.as_deref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscription_id().is_none() && self.checkout_id().is_none() && self.mandate_id().is_none()
    }

    /// Overlay the identifiers present in `newer` onto this reference.
    ///
    /// A reference from a different provider starts a new subscription
    /// instance and replaces this one wholesale.
    pub fn merged_with(&self, newer: &ProviderRef) -> ProviderRef {
        if self.provider() != newer.provider() {
            return newer.clone();
        }
        let pick = |new: Option<&str>, old: Option<&str>| new.or(old).map(str::to_string);
        ProviderRef::from_parts(
            self.provider(),
            pick(newer.subscription_id(), self.subscription_id()),
            pick(newer.checkout_id(), self.checkout_id()),
            pick(newer.mandate_id(), self.mandate_id()),
        )
    }

    /// Lookup keys in match precedence order: subscription, checkout or
    /// billing request, mandate. All keys are scoped to this provider.
    pub fn match_keys(&self) -> Vec<MatchKey> {
        let provider = self.provider();
        let mut keys = Vec::with_capacity(3);
        if let Some(id) = self.subscription_id() {
            keys.push(MatchKey::Subscription(provider, id.to_string()));
        }
        if let Some(id) = self.checkout_id() {
            keys.push(MatchKey::Checkout(provider, id.to_string()));
        }
        if let Some(id) = self.mandate_id() {
            keys.push(MatchKey::Mandate(provider, id.to_string()));
        }
        keys
    }
}

// ============================================================================
// Match Keys
// ============================================================================

/// A single lookup key for a payment account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKey {
    Subscription(PaymentProvider, String),
    Checkout(PaymentProvider, String),
    Mandate(PaymentProvider, String),
    User(Uuid),
}

/// Everything a webhook or caller knows about which account it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMatch {
    pub reference: ProviderRef,
    pub user_id: Option<Uuid>,
}

impl AccountMatch {
    pub fn new(reference: ProviderRef, user_id: Option<Uuid>) -> Self {
        Self { reference, user_id }
    }

    pub fn provider(&self) -> PaymentProvider {
        self.reference.provider()
    }
}

// ============================================================================
// Payment Account
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PaymentAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reference: ProviderRef,
    /// Recurring charge in minor currency units
    pub amount_cents: i64,
    /// Catalog plan id
    pub plan_id: Option<String>,
    /// Provider product / plan / price id reported by the provider
    pub product_id: Option<String>,
    pub referral_id: Option<String>,
    pub status: AccountStatus,
    /// Confirmed direct-debit mandates, first one activates the account
    pub mandate_count: i32,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PaymentAccount {
    pub fn provider(&self) -> PaymentProvider {
        self.reference.provider()
    }

    /// Whether a key identifies this account.
    pub fn matches(&self, key: &MatchKey) -> bool {
        match key {
            MatchKey::Subscription(provider, id) => {
                self.provider() == *provider && self.reference.subscription_id() == Some(id.as_str())
            }
            MatchKey::Checkout(provider, id) => {
                self.provider() == *provider && self.reference.checkout_id() == Some(id.as_str())
            }
            MatchKey::Mandate(provider, id) => {
                self.provider() == *provider && self.reference.mandate_id() == Some(id.as_str())
            }
            MatchKey::User(user_id) => self.user_id == *user_id,
        }
    }

    /// Subscription id of an instance the provider may still bill or cancel.
    pub fn live_subscription_id(&self) -> Option<&str> {
        if self.status.is_terminal() {
            return None;
        }
        self.reference.subscription_id()
    }
}

/// Fields written on insert.
#[derive(Debug, Clone)]
pub struct NewPaymentAccount {
    pub user_id: Uuid,
    pub reference: ProviderRef,
    pub amount_cents: i64,
    pub plan_id: Option<String>,
    pub product_id: Option<String>,
    pub referral_id: Option<String>,
    pub status: AccountStatus,
}

/// Last-write-wins update. `None` leaves a column untouched, unless
/// `replace_instance` is set.
#[derive(Debug, Clone, Default)]
pub struct PaymentAccountUpdate {
    pub reference: Option<ProviderRef>,
    pub amount_cents: Option<i64>,
    pub plan_id: Option<String>,
    pub product_id: Option<String>,
    pub referral_id: Option<String>,
    pub status: Option<AccountStatus>,
    /// A new subscription instance takes over the row: every instance field is
    /// written as given (`None` clears it) and the mandate counter restarts at zero.
    pub replace_instance: bool,
}
