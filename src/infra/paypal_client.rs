use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    infra::http_client::{build_client, expect_status, read_json, send},
    ports::{
        payment_provider::{CheckoutRequest, CheckoutSession, PaymentProviderPort},
        webhook_verifier::{WebhookHeaders, WebhookVerifier},
    },
};

/// PayPal REST client. Every call obtains a fresh client-credentials token.
#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    domain: Url,
    client_id: String,
    client_secret: SecretString,
}

impl PayPalClient {
    pub fn new(domain: Url, client_id: String, client_secret: SecretString) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            domain,
            client_id,
            client_secret,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.domain.as_str().trim_end_matches('/'), path)
    }

    fn basic_auth(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            self.client_id,
            self.client_secret.expose_secret()
        ));
        format!("Basic {}", encoded)
    }

    async fn access_token(&self) -> AppResult<String> {
        let response = send(
            "PayPal",
            self.client
                .post(self.endpoint("oauth2/token"))
                .header("Authorization", self.basic_auth())
                .form(&[("grant_type", "client_credentials")]),
        )
        .await?;
        let token: AccessToken = read_json("PayPal", response).await?;
        Ok(token.access_token)
    }

    fn subscription_body(request: &CheckoutRequest, plan_id: &str) -> CreateSubscription {
        CreateSubscription {
            plan_id: plan_id.to_string(),
            custom_id: request.correlation_id.clone(),
            subscriber: Subscriber {
                email_address: request.email.clone(),
            },
            application_context: ApplicationContext {
                return_url: request.success_url.clone(),
                cancel_url: request.cancel_url.clone(),
                user_action: "SUBSCRIBE_NOW",
            },
        }
    }

    async fn verify_webhook(&self, request: &VerifyWebhookRequest<'_>) -> AppResult<String> {
        let token = self.access_token().await?;
        let response = send(
            "PayPal",
            self.client
                .post(self.endpoint("notifications/verify-webhook-signature"))
                .bearer_auth(token)
                .json(request),
        )
        .await?;
        let verification: VerificationResult = read_json("PayPal", response).await?;
        Ok(verification.verification_status)
    }
}

#[async_trait]
impl PaymentProviderPort for PayPalClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PayPal
    }

    /// The correlation id travels as `custom_id` and is reported back in
    /// `BILLING.SUBSCRIPTION.ACTIVATED`.
    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let plan_id = request.plan.paypal_plan_id.as_deref().ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Plan {} is not sold through PayPal",
                request.plan.plan_id
            ))
        })?;

        let token = self.access_token().await?;
        let response = send(
            "PayPal",
            self.client
                .post(self.endpoint("billing/subscriptions"))
                .bearer_auth(token)
                .json(&Self::subscription_body(request, plan_id)),
        )
        .await?;
        let created: CreatedSubscription = read_json("PayPal", response).await?;

        let redirect_url = created
            .links
            .into_iter()
            .find(|link| link.rel == "approve")
            .map(|link| link.href)
            .ok_or_else(|| AppError::Provider("PayPal subscription has no approve link".into()))?;

        tracing::debug!(subscription_id = %created.id, "PayPal subscription created");
        Ok(CheckoutSession {
            session_id: request.correlation_id.clone(),
            redirect_url,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        let token = self.access_token().await?;

        // Unknown subscriptions fail here rather than on the cancel call
        let response = send(
            "PayPal",
            self.client
                .get(self.endpoint(&format!("billing/subscriptions/{subscription_id}")))
                .bearer_auth(&token),
        )
        .await?;
        expect_status("PayPal", response, StatusCode::OK).await?;

        let response = send(
            "PayPal",
            self.client
                .post(self.endpoint(&format!(
                    "billing/subscriptions/{subscription_id}/cancel"
                )))
                .bearer_auth(&token)
                .json(&serde_json::json!({ "reason": "" })),
        )
        .await?;
        expect_status("PayPal", response, StatusCode::NO_CONTENT).await
    }
}

// ============================================================================
// Webhook verification
// ============================================================================

/// Verifies deliveries through PayPal's `verify-webhook-signature` API.
pub struct PayPalWebhookVerifier {
    client: PayPalClient,
    webhook_id: String,
}

impl PayPalWebhookVerifier {
    pub fn new(client: PayPalClient, webhook_id: String) -> Self {
        Self { client, webhook_id }
    }
}

#[async_trait]
impl WebhookVerifier for PayPalWebhookVerifier {
    async fn verify(&self, headers: &WebhookHeaders, body: &str) -> AppResult<()> {
        let header = |name: &str| headers.get(name).ok_or(AppError::InvalidSignature);
        let webhook_event: Value =
            serde_json::from_str(body).map_err(|_| AppError::InvalidSignature)?;

        let request = VerifyWebhookRequest {
            auth_algo: header("paypal-auth-algo")?,
            cert_url: header("paypal-cert-url")?,
            transmission_id: header("paypal-transmission-id")?,
            transmission_sig: header("paypal-transmission-sig")?,
            transmission_time: header("paypal-transmission-time")?,
            webhook_id: &self.webhook_id,
            webhook_event,
        };

        let status = self.client.verify_webhook(&request).await?;
        if status == "SUCCESS" {
            Ok(())
        } else {
            tracing::warn!(status = %status, "PayPal rejected webhook signature");
            Err(AppError::InvalidSignature)
        }
    }
}

// ============================================================================
// PayPal API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateSubscription {
    plan_id: String,
    custom_id: String,
    subscriber: Subscriber,
    application_context: ApplicationContext,
}

#[derive(Debug, Serialize)]
struct Subscriber {
    email_address: String,
}

#[derive(Debug, Serialize)]
struct ApplicationContext {
    return_url: String,
    cancel_url: String,
    user_action: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreatedSubscription {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Serialize)]
struct VerifyWebhookRequest<'a> {
    auth_algo: &'a str,
    cert_url: &'a str,
    transmission_id: &'a str,
    transmission_sig: &'a str,
    transmission_time: &'a str,
    webhook_id: &'a str,
    webhook_event: Value,
}

#[derive(Debug, Deserialize)]
struct VerificationResult {
    verification_status: String,
}
