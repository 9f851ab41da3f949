use serde::{Deserialize, Serialize};

use super::payment_provider::PaymentProvider;

/// A purchasable plan and the ids each provider knows it by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub name: String,
    pub tag: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub price_cents: i64,
    pub currency: String,
    pub radom_product_id: Option<String>,
    pub paypal_plan_id: Option<String>,
    pub stripe_price_id: Option<String>,
}

impl Plan {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Id the provider reports for this plan in its webhooks.
    ///
    /// GoCardless subscriptions are created by us from the plan amount, so the
    /// catalog plan id doubles as its product id.
    pub fn product_id_for(&self, provider: PaymentProvider) -> Option<&str> {
        match provider {
            PaymentProvider::Radom => self.radom_product_id.as_deref(),
            PaymentProvider::PayPal => self.paypal_plan_id.as_deref(),
            PaymentProvider::Stripe => self.stripe_price_id.as_deref(),
            PaymentProvider::GoCardless => Some(self.plan_id.as_str()),
        }
    }
}

/// Plan catalog lookup by provider-specific product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLookup {
    pub provider: PaymentProvider,
    pub product_id: String,
}

impl ProductLookup {
    pub fn new(provider: PaymentProvider, product_id: impl Into<String>) -> Self {
        Self {
            provider,
            product_id: product_id.into(),
        }
    }

    pub fn matches(&self, plan: &Plan) -> bool {
        plan.product_id_for(self.provider) == Some(self.product_id.as_str())
    }
}
