//! Stub payment providers, webhook verifiers and notifier.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, plan::Plan},
    ports::{
        notifier::{NotificationTemplate, Notifier},
        payment_provider::{CheckoutRequest, CheckoutSession, PaymentProviderPort, SubscriptionId},
        webhook_verifier::{WebhookHeaders, WebhookVerifier},
    },
};

// ============================================================================
// StubPaymentProvider
// ============================================================================

/// Records every outbound call. Session ids are derived from the request's
/// correlation id, subscription ids from the mandate id (`SB_<mandate>`).
pub struct StubPaymentProvider {
    provider: PaymentProvider,
    checkouts: Mutex<Vec<CheckoutRequest>>,
    cancelled: Mutex<Vec<String>>,
    created_subscriptions: Mutex<Vec<String>>,
    fail_cancellations: AtomicBool,
}

impl StubPaymentProvider {
    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            checkouts: Mutex::new(vec![]),
            cancelled: Mutex::new(vec![]),
            created_subscriptions: Mutex::new(vec![]),
            fail_cancellations: AtomicBool::new(false),
        }
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Mandate ids a subscription was created for.
    pub fn created_subscriptions(&self) -> Vec<String> {
        self.created_subscriptions.lock().unwrap().clone()
    }

    pub fn fail_cancellations(&self) {
        self.fail_cancellations.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProviderPort for StubPaymentProvider {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        self.checkouts.lock().unwrap().push(request.clone());
        let session_id = format!("{}_{}", self.provider, request.correlation_id);
        Ok(CheckoutSession {
            redirect_url: format!("https://pay.example.com/{session_id}"),
            session_id,
        })
    }

    async fn create_subscription(&self, mandate_id: &str, _plan: &Plan) -> AppResult<SubscriptionId> {
        self.created_subscriptions
            .lock()
            .unwrap()
            .push(mandate_id.to_string());
        Ok(SubscriptionId::new(format!("SB_{mandate_id}")))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        if self.fail_cancellations.load(Ordering::SeqCst) {
            return Err(AppError::Provider("cancellation refused".into()));
        }
        self.cancelled
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }
}

// ============================================================================
// StaticVerifier
// ============================================================================

/// Accepts or rejects every delivery, regardless of headers.
pub struct StaticVerifier {
    accept: bool,
}

impl StaticVerifier {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl WebhookVerifier for StaticVerifier {
    async fn verify(&self, _headers: &WebhookHeaders, _body: &str) -> AppResult<()> {
        if self.accept {
            Ok(())
        } else {
            Err(AppError::InvalidSignature)
        }
    }
}

// ============================================================================
// RecordingNotifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, NotificationTemplate, serde_json::Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, NotificationTemplate, serde_json::Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_templates(&self) -> Vec<NotificationTemplate> {
        self.sent().into_iter().map(|(_, template, _)| template).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        email: &str,
        template: NotificationTemplate,
        variables: serde_json::Value,
    ) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), template, variables));
        Ok(())
    }
}
