use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        account_status::AccountStatus,
        payment_account::{AccountMatch, PaymentAccount, ProviderRef},
        payment_provider::PaymentProvider,
        plan::{Plan, ProductLookup},
    },
    ports::{
        account_directory::AccountDirectory,
        payment_provider::{CheckoutRequest, CheckoutSession},
        plan_catalog::PlanCatalog,
    },
    use_cases::{
        checkout::{CheckoutSessionMetadata, CheckoutSessionStore},
        payment_account::{AccountFields, PaymentAccountUseCases},
        provider_registry::ProviderRegistry,
        referral::ReferralRepo,
    },
    validators::is_valid_referral_id,
};

// ============================================================================
// Inputs / Outputs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutInput {
    pub provider: PaymentProvider,
    pub plan_id: String,
    pub referral_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailablePlans {
    pub plans: Vec<Plan>,
    pub active_plan_id: Option<String>,
}

/// Where checkouts send the user back to, and how long their metadata lives.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub webapp_domain: String,
    pub metadata_ttl_secs: u64,
}

impl CheckoutSettings {
    fn return_url(&self) -> String {
        format!("{}/dashboard", self.webapp_domain.trim_end_matches('/'))
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    accounts: PaymentAccountUseCases,
    plans: Arc<dyn PlanCatalog>,
    directory: Arc<dyn AccountDirectory>,
    referrals: Arc<dyn ReferralRepo>,
    sessions: Arc<dyn CheckoutSessionStore>,
    registry: ProviderRegistry,
    settings: CheckoutSettings,
}

impl BillingUseCases {
    pub fn new(
        accounts: PaymentAccountUseCases,
        plans: Arc<dyn PlanCatalog>,
        directory: Arc<dyn AccountDirectory>,
        referrals: Arc<dyn ReferralRepo>,
        sessions: Arc<dyn CheckoutSessionStore>,
        registry: ProviderRegistry,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            accounts,
            plans,
            directory,
            referrals,
            sessions,
            registry,
            settings,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------------

    /// Open a hosted checkout with `input.provider` and remember who opened it.
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        input: CreateCheckoutInput,
    ) -> AppResult<CheckoutSession> {
        if let Some(account) = self.accounts.get_by_user(user_id).await?
            && (account.status.is_active() || account.live_subscription_id().is_some())
        {
            return Err(AppError::Conflict(format!(
                "A {} subscription exists, cancel it first",
                account.provider().display_name()
            )));
        }

        let port = self.registry.provider(input.provider)?;
        let plan = self
            .plans
            .get_plan(&input.plan_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let product_id = plan
            .product_id_for(input.provider)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Plan {} is not offered through {}",
                    plan.plan_id,
                    input.provider.display_name()
                ))
            })?;
        let contact = self
            .directory
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let referral_id = self
            .resolve_referral(user_id, input.referral_id.as_deref())
            .await?;

        let return_url = self.settings.return_url();
        let request = CheckoutRequest {
            user_id,
            email: contact.email,
            plan: plan.clone(),
            correlation_id: Uuid::new_v4().to_string(),
            success_url: return_url.clone(),
            cancel_url: return_url,
        };
        let session = port.create_checkout(&request).await?;

        self.sessions
            .put(
                &CheckoutSessionMetadata {
                    session_id: session.session_id.clone(),
                    provider: input.provider,
                    user_id,
                    plan_id: Some(plan.plan_id.clone()),
                    referral_id: referral_id.clone(),
                },
                self.settings.metadata_ttl_secs,
            )
            .await?;

        if input.provider.is_direct_debit() {
            // The account exists before the payer authorizes anything.
            let matcher = AccountMatch::new(
                ProviderRef::from_parts(
                    input.provider,
                    None,
                    Some(session.session_id.clone()),
                    None,
                ),
                Some(user_id),
            );
            self.accounts
                .upsert(
                    &matcher,
                    AccountFields {
                        amount_cents: Some(plan.price_cents),
                        plan_id: Some(plan.plan_id.clone()),
                        product_id: Some(product_id),
                        referral_id,
                        status: AccountStatus::Disabled,
                    },
                )
                .await?;
        }

        tracing::info!(
            user_id = %user_id,
            provider = %input.provider,
            plan_id = %plan.plan_id,
            session_id = %session.session_id,
            "Checkout created"
        );
        Ok(session)
    }

    /// Keep a referral only if it exists and belongs to someone else.
    async fn resolve_referral(
        &self,
        user_id: Uuid,
        referral_id: Option<&str>,
    ) -> AppResult<Option<String>> {
        let Some(referral_id) = referral_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        if !is_valid_referral_id(referral_id) {
            tracing::warn!(user_id = %user_id, "Malformed referral id dropped from checkout");
            return Ok(None);
        }
        match self.referrals.get(referral_id).await? {
            Some(referral) if referral.host_id == user_id => {
                tracing::warn!(user_id = %user_id, referral_id, "Self-referral dropped from checkout");
                Ok(None)
            }
            Some(referral) => Ok(Some(referral.referral_id)),
            None => {
                tracing::warn!(user_id = %user_id, referral_id, "Unknown referral dropped from checkout");
                Ok(None)
            }
        }
    }

    /// Ask the provider to cancel the user's subscription.
    ///
    /// Returns false on any failure. The account changes state only when the
    /// provider's cancellation webhook arrives.
    pub async fn cancel_plan(&self, user_id: Uuid) -> bool {
        match self.try_cancel_plan(user_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Plan cancellation failed");
                false
            }
        }
    }

    async fn try_cancel_plan(&self, user_id: Uuid) -> AppResult<()> {
        let account = self
            .accounts
            .get_by_user(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if account.status.is_terminal() {
            return Err(AppError::InvalidInput("Subscription already cancelled".into()));
        }
        let subscription_id = account
            .reference
            .subscription_id()
            .ok_or_else(|| AppError::InvalidInput("No provider subscription to cancel".into()))?;

        let port = self.registry.provider(account.provider())?;
        port.cancel_subscription(subscription_id).await?;
        tracing::info!(
            user_id = %user_id,
            provider = %account.provider(),
            subscription_id,
            "Cancellation requested"
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Plans & permissions
    // ------------------------------------------------------------------------

    pub async fn get_account(&self, user_id: Uuid) -> AppResult<Option<PaymentAccount>> {
        self.accounts.get_by_user(user_id).await
    }

    pub async fn get_product(&self, lookup: &ProductLookup) -> AppResult<Option<Plan>> {
        self.plans.get_product(lookup).await
    }

    /// Plan of the user's active subscription.
    pub async fn current_plan(&self, user_id: Uuid) -> AppResult<Option<Plan>> {
        let Some(account) = self.accounts.get_by_user(user_id).await? else {
            return Ok(None);
        };
        if !account.status.is_active() {
            return Ok(None);
        }
        if let Some(plan_id) = &account.plan_id
            && let Some(plan) = self.plans.get_plan(plan_id).await?
        {
            return Ok(Some(plan));
        }
        match &account.product_id {
            Some(product_id) => {
                self.plans
                    .get_product(&ProductLookup::new(account.provider(), product_id.clone()))
                    .await
            }
            None => Ok(None),
        }
    }

    pub async fn available_plans(&self, user_id: Uuid) -> AppResult<AvailablePlans> {
        let plans = self.plans.list_plans().await?;
        let active_plan_id = self.current_plan(user_id).await?.map(|p| p.plan_id);
        Ok(AvailablePlans {
            plans,
            active_plan_id,
        })
    }

    pub async fn has_permissions(&self, user_id: Uuid, feature: &str) -> AppResult<bool> {
        Ok(self
            .current_plan(user_id)
            .await?
            .is_some_and(|plan| plan.has_feature(feature)))
    }
}
