use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, plan::Plan},
    infra::http_client::{build_client, expect_status, read_json, send},
    ports::payment_provider::{
        CheckoutRequest, CheckoutSession, PaymentProviderPort, SubscriptionId,
    },
};

const GOCARDLESS_VERSION: &str = "2015-07-06";

/// GoCardless direct debit. A checkout is a billing request collecting a
/// Bacs mandate; the subscription is created once the mandate webhook arrives.
#[derive(Clone)]
pub struct GoCardlessClient {
    client: Client,
    domain: Url,
    access_token: SecretString,
}

impl GoCardlessClient {
    pub fn new(domain: Url, access_token: SecretString) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            domain,
            access_token,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!(
                "{}/{}",
                self.domain.as_str().trim_end_matches('/'),
                path
            ))
            .bearer_auth(self.access_token.expose_secret())
            .header("GoCardless-Version", GOCARDLESS_VERSION)
    }

    async fn create_billing_request(&self, request: &CheckoutRequest) -> AppResult<String> {
        let body = BillingRequestEnvelope {
            billing_requests: NewBillingRequest {
                mandate_request: MandateRequest { scheme: "bacs" },
                metadata: UserMetadata {
                    user_id: request.user_id.to_string(),
                },
            },
        };
        let response = send("GoCardless", self.post("billing_requests").json(&body)).await?;
        let created: Created<Resource> = read_json("GoCardless", response).await?;
        Ok(created.into_inner(|c| c.billing_requests)?.id)
    }

    async fn create_flow(
        &self,
        billing_request_id: &str,
        request: &CheckoutRequest,
    ) -> AppResult<String> {
        let body = FlowEnvelope {
            billing_request_flows: NewFlow {
                redirect_uri: request.success_url.clone(),
                exit_uri: request.cancel_url.clone(),
                links: FlowLinks {
                    billing_request: billing_request_id.to_string(),
                },
            },
        };
        let response = send("GoCardless", self.post("billing_request_flows").json(&body)).await?;
        let created: Created<Flow> = read_json("GoCardless", response).await?;
        Ok(created.into_inner(|c| c.billing_request_flows)?.authorisation_url)
    }
}

#[async_trait]
impl PaymentProviderPort for GoCardlessClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::GoCardless
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let billing_request_id = self.create_billing_request(request).await?;
        let redirect_url = self.create_flow(&billing_request_id, request).await?;
        Ok(CheckoutSession {
            session_id: billing_request_id,
            redirect_url,
        })
    }

    async fn create_subscription(&self, mandate_id: &str, plan: &Plan) -> AppResult<SubscriptionId> {
        let body = SubscriptionEnvelope {
            subscriptions: NewSubscription {
                amount: plan.price_cents,
                currency: plan.currency.clone(),
                interval_unit: "monthly",
                name: plan.name.clone(),
                links: SubscriptionLinks {
                    mandate: mandate_id.to_string(),
                },
            },
        };
        let response = send("GoCardless", self.post("subscriptions").json(&body)).await?;
        let created: Created<Resource> = read_json("GoCardless", response).await?;
        let id = created.into_inner(|c| c.subscriptions)?.id;

        tracing::info!(mandate_id, subscription_id = %id, "GoCardless subscription created");
        Ok(SubscriptionId::new(id))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        let response = send(
            "GoCardless",
            self.post(&format!("subscriptions/{subscription_id}/actions/cancel"))
                .json(&serde_json::json!({ "data": {} })),
        )
        .await?;
        expect_status("GoCardless", response, StatusCode::OK).await
    }
}

// ============================================================================
// GoCardless API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct BillingRequestEnvelope {
    billing_requests: NewBillingRequest,
}

#[derive(Debug, Serialize)]
struct NewBillingRequest {
    mandate_request: MandateRequest,
    metadata: UserMetadata,
}

#[derive(Debug, Serialize)]
struct MandateRequest {
    scheme: &'static str,
}

#[derive(Debug, Serialize)]
struct UserMetadata {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct FlowEnvelope {
    billing_request_flows: NewFlow,
}

#[derive(Debug, Serialize)]
struct NewFlow {
    redirect_uri: String,
    exit_uri: String,
    links: FlowLinks,
}

#[derive(Debug, Serialize)]
struct FlowLinks {
    billing_request: String,
}

#[derive(Debug, Serialize)]
struct SubscriptionEnvelope {
    subscriptions: NewSubscription,
}

#[derive(Debug, Serialize)]
struct NewSubscription {
    /// Minor units
    amount: i64,
    currency: String,
    interval_unit: &'static str,
    name: String,
    links: SubscriptionLinks,
}

#[derive(Debug, Serialize)]
struct SubscriptionLinks {
    mandate: String,
}

/// GoCardless wraps every created resource in a key named after its type.
#[derive(Debug, Deserialize)]
struct Created<T> {
    billing_requests: Option<T>,
    billing_request_flows: Option<T>,
    subscriptions: Option<T>,
}

impl<T> Created<T> {
    fn into_inner(self, pick: impl FnOnce(Self) -> Option<T>) -> AppResult<T> {
        pick(self).ok_or_else(|| AppError::Provider("Unexpected GoCardless response shape".into()))
    }
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Flow {
    authorisation_url: String,
}
