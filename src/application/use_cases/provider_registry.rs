use std::{collections::HashMap, sync::Arc};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    ports::{payment_provider::PaymentProviderPort, webhook_verifier::WebhookVerifier},
};

/// Outbound clients and inbound verifiers of the providers configured at startup.
///
/// A provider without credentials is simply absent; lookups for it fail with
/// `ProviderNotConfigured`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<PaymentProvider, Arc<dyn PaymentProviderPort>>,
    verifiers: HashMap<PaymentProvider, Arc<dyn WebhookVerifier>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(
        mut self,
        port: Arc<dyn PaymentProviderPort>,
        verifier: Arc<dyn WebhookVerifier>,
    ) -> Self {
        let provider = port.provider();
        self.providers.insert(provider, port);
        self.verifiers.insert(provider, verifier);
        self
    }

    pub fn provider(&self, provider: PaymentProvider) -> AppResult<Arc<dyn PaymentProviderPort>> {
        self.providers
            .get(&provider)
            .cloned()
            .ok_or(AppError::ProviderNotConfigured)
    }

    pub fn verifier(&self, provider: PaymentProvider) -> AppResult<Arc<dyn WebhookVerifier>> {
        self.verifiers
            .get(&provider)
            .cloned()
            .ok_or(AppError::ProviderNotConfigured)
    }

    /// Configured providers in a stable order.
    pub fn configured(&self) -> Vec<PaymentProvider> {
        PaymentProvider::all()
            .iter()
            .copied()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }
}
