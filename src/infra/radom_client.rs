use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    app_error::AppResult,
    domain::entities::payment_provider::PaymentProvider,
    infra::{
        config::Mode,
        http_client::{build_client, expect_status, read_json, send},
    },
    ports::payment_provider::{CheckoutRequest, CheckoutSession, PaymentProviderPort},
};

const RADOM_API_BASE: &str = "https://api.radom.com";
const RADOM_CHECKOUT_BASE: &str = "https://pay.radom.com/checkout";
/// One billing interval of 30 days.
const CHARGING_INTERVAL_SECS: u64 = 30 * 24 * 3600;

const USDC_TOKEN: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const USDT_TOKEN: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
const SEPOLIA_TEST_TOKEN: &str = "0xa4fCE8264370437e718aE207805b4e6233638b9E";

#[derive(Clone)]
pub struct RadomClient {
    client: Client,
    access_token: SecretString,
    currency: String,
    mode: Mode,
}

impl RadomClient {
    pub fn new(access_token: SecretString, currency: String, mode: Mode) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            access_token,
            currency,
            mode,
        })
    }

    fn payment_methods(&self) -> Vec<PaymentMethod> {
        let mut methods = vec![
            PaymentMethod::native("Bitcoin"),
            PaymentMethod::native("Ethereum"),
            PaymentMethod::token("Ethereum", USDC_TOKEN),
            PaymentMethod::token("Ethereum", USDT_TOKEN),
        ];
        if !self.mode.is_production() {
            methods.push(PaymentMethod::token("SepoliaTestnet", SEPOLIA_TEST_TOKEN));
        }
        methods
    }

    fn checkout_body(&self, request: &CheckoutRequest, product_id: &str) -> CheckoutSessionBody {
        let plan = &request.plan;
        CheckoutSessionBody {
            line_items: vec![LineItem {
                product_id: product_id.to_string(),
                item_data: ItemData {
                    name: plan.name.clone(),
                    description: plan.description.clone(),
                    charging_interval_seconds: CHARGING_INTERVAL_SECS,
                    price: plan.price_cents as f64 / 100.0,
                    is_metered: false,
                    currency: self.currency.clone(),
                    send_subscription_emails: true,
                },
            }],
            currency: self.currency.clone(),
            gateway: Gateway {
                managed: ManagedGateway {
                    methods: self.payment_methods(),
                },
            },
            success_url: request.success_url.clone(),
            cancel_url: request.cancel_url.clone(),
            metadata: vec![MetadataEntry {
                key: "user_id".to_string(),
                value: request.user_id.to_string(),
            }],
            charge_customer_network_fee: true,
        }
    }
}

#[async_trait]
impl PaymentProviderPort for RadomClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Radom
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutSession> {
        let product_id = request
            .plan
            .radom_product_id
            .as_deref()
            .unwrap_or(request.plan.plan_id.as_str());
        let body = self.checkout_body(request, product_id);

        let response = send(
            "Radom",
            self.client
                .post(format!("{RADOM_API_BASE}/checkout_session"))
                .header("Authorization", self.access_token.expose_secret())
                .json(&body),
        )
        .await?;
        let created: CreatedCheckoutSession = read_json("Radom", response).await?;

        let redirect_url = created
            .checkout_session_url
            .unwrap_or_else(|| format!("{RADOM_CHECKOUT_BASE}/{}", created.checkout_session_id));
        Ok(CheckoutSession {
            session_id: created.checkout_session_id,
            redirect_url,
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        let response = send(
            "Radom",
            self.client
                .post(format!("{RADOM_API_BASE}/subscription/{subscription_id}/cancel"))
                .header("Authorization", self.access_token.expose_secret()),
        )
        .await?;
        expect_status("Radom", response, StatusCode::OK).await
    }
}

// ============================================================================
// Radom API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionBody {
    line_items: Vec<LineItem>,
    currency: String,
    gateway: Gateway,
    success_url: String,
    cancel_url: String,
    metadata: Vec<MetadataEntry>,
    charge_customer_network_fee: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LineItem {
    product_id: String,
    item_data: ItemData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemData {
    name: String,
    description: Option<String>,
    charging_interval_seconds: u64,
    /// Major units
    price: f64,
    is_metered: bool,
    currency: String,
    send_subscription_emails: bool,
}

#[derive(Debug, Serialize)]
struct Gateway {
    managed: ManagedGateway,
}

#[derive(Debug, Serialize)]
struct ManagedGateway {
    methods: Vec<PaymentMethod>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentMethod {
    network: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'static str>,
    discount_percent_off: u32,
}

impl PaymentMethod {
    fn native(network: &'static str) -> Self {
        Self {
            network,
            token: None,
            discount_percent_off: 0,
        }
    }

    fn token(network: &'static str, token: &'static str) -> Self {
        Self {
            network,
            token: Some(token),
            discount_percent_off: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct MetadataEntry {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedCheckoutSession {
    checkout_session_id: String,
    checkout_session_url: Option<String>,
}
