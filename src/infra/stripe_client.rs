use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    infra::http_client::{build_client, read_json, send},
    ports::payment_provider::{CheckoutRequest, CheckoutSession, PaymentProviderPort},
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(secret_key: SecretString) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            secret_key,
        })
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    fn checkout_params(request: &CheckoutRequest, price_id: &str) -> Vec<(String, String)> {
        vec![
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), request.user_id.to_string()),
            ("customer_email".to_string(), request.email.clone()),
            ("metadata[user_id]".to_string(), request.user_id.to_string()),
            (
                "subscription_data[metadata][user_id]".to_string(),
                request.user_id.to_string(),
            ),
        ]
    }
}

#[async_trait]
impl PaymentProviderPort for StripeClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Stripe
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let price_id = request.plan.stripe_price_id.as_deref().ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Plan {} is not sold through Stripe",
                request.plan.plan_id
            ))
        })?;

        let response = send(
            "Stripe",
            self.client
                .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
                .header("Authorization", self.auth_header())
                .form(&Self::checkout_params(request, price_id)),
        )
        .await?;
        let session: StripeCheckoutSession = read_json("Stripe", response).await?;

        let redirect_url = session
            .url
            .ok_or_else(|| AppError::Provider("Stripe checkout session has no URL".into()))?;
        Ok(CheckoutSession {
            session_id: session.id,
            redirect_url,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        let response = send(
            "Stripe",
            self.client
                .delete(format!("{}/subscriptions/{}", STRIPE_API_BASE, subscription_id))
                .header("Authorization", self.auth_header()),
        )
        .await?;
        let subscription: StripeSubscription = read_json("Stripe", response).await?;
        tracing::info!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Stripe subscription cancelled"
        );
        Ok(())
    }
}

// ============================================================================
// Stripe API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
}
