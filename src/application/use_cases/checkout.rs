use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::payment_provider::PaymentProvider};

/// What we knew about the user when the checkout was opened. Providers that
/// do not echo our metadata back in their webhooks are resolved through this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionMetadata {
    pub session_id: String,
    pub provider: PaymentProvider,
    pub user_id: Uuid,
    /// Catalog plan chosen at checkout
    pub plan_id: Option<String>,
    pub referral_id: Option<String>,
}

/// Short-lived store for checkout metadata, keyed by provider and session id.
#[async_trait]
pub trait CheckoutSessionStore: Send + Sync {
    async fn put(&self, metadata: &CheckoutSessionMetadata, ttl_secs: u64) -> AppResult<()>;

    /// Reads do not consume the entry: providers retry deliveries.
    async fn get(
        &self,
        provider: PaymentProvider,
        session_id: &str,
    ) -> AppResult<Option<CheckoutSessionMetadata>>;
}
