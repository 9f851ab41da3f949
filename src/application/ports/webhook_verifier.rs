use std::collections::HashMap;

use async_trait::async_trait;

use crate::app_error::AppResult;

/// Request headers of an inbound webhook, keyed by lowercase header name.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders(HashMap<String, String>);

impl WebhookHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Authenticates a raw webhook delivery before anything is parsed.
///
/// Implementations return `AppError::InvalidSignature` when the delivery
/// cannot be attributed to the provider.
#[async_trait]
pub trait WebhookVerifier: Send + Sync {
    async fn verify(&self, headers: &WebhookHeaders, body: &str) -> AppResult<()>;
}
