use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, plan::Plan},
};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a subscription in a payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a provider needs to open a hosted checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub email: String,
    pub plan: Plan,
    /// Our own correlation id, echoed back by providers that support it
    pub correlation_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of creating a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    /// Id the provider will report in its webhooks for this checkout
    pub session_id: String,
    /// URL to redirect the user to
    pub redirect_url: String,
}

// ============================================================================
// Payment Provider Port
// ============================================================================

/// Outbound operations against a payment provider.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession>;

    /// Start the recurring subscription once a direct-debit mandate exists.
    async fn create_subscription(
        &self,
        _mandate_id: &str,
        _plan: &Plan,
    ) -> AppResult<SubscriptionId> {
        Err(AppError::ProviderNotSupported)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()>;
}
