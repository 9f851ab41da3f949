use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{billing::BillingUseCases, reconciler::WebhookReconciler, referral::ReferralUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub referral_use_cases: Arc<ReferralUseCases>,
    pub reconciler: Arc<WebhookReconciler>,
}
