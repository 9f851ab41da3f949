use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    use_cases::checkout::{CheckoutSessionMetadata, CheckoutSessionStore},
};

/// Checkout Session Metadata in Redis, stored as JSON with a TTL.
#[derive(Clone)]
pub struct RedisCheckoutSessionStore {
    manager: ConnectionManager,
}

impl RedisCheckoutSessionStore {
    pub async fn new(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            AppError::Internal(format!(
                "Redis connection failed (check redis password/URL): {e}"
            ))
        })?;
        let manager = ConnectionManager::new(client).await.map_err(|e| {
            AppError::Internal(format!(
                "Redis auth/connection failed (check redis password/URL): {e}"
            ))
        })?;

        Ok(Self { manager })
    }

    fn key(provider: PaymentProvider, session_id: &str) -> String {
        format!("checkout:{}:{session_id}", provider.as_ref())
    }
}

#[async_trait]
impl CheckoutSessionStore for RedisCheckoutSessionStore {
    async fn put(&self, metadata: &CheckoutSessionMetadata, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let key = Self::key(metadata.provider, &metadata.session_id);
        let value =
            serde_json::to_string(metadata).map_err(|e| AppError::Internal(e.to_string()))?;

        let _: () = conn
            .set_ex(key, value, ttl_secs.max(1))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(())
    }

    async fn get(
        &self,
        provider: PaymentProvider,
        session_id: &str,
    ) -> AppResult<Option<CheckoutSessionMetadata>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn
            .get(Self::key(provider, session_id))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        raw.map(|value| {
            serde_json::from_str(&value).map_err(|e| AppError::Internal(e.to_string()))
        })
        .transpose()
    }
}
