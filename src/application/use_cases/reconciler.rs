use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        account_status::AccountStatus,
        payment_account::{AccountMatch, PaymentAccount, ProviderRef},
        payment_provider::PaymentProvider,
        plan::{Plan, ProductLookup},
        provider_event::{EventKind, ProviderEvent},
        referral::CommissionKey,
    },
    ports::{
        account_directory::AccountDirectory,
        notifier::{NotificationTemplate, Notifier},
        plan_catalog::PlanCatalog,
        webhook_verifier::WebhookHeaders,
    },
    use_cases::{
        checkout::{CheckoutSessionMetadata, CheckoutSessionStore},
        payment_account::{AccountFields, PaymentAccountUseCases, StatusChange, UpsertOutcome},
        provider_registry::ProviderRegistry,
        referral::ReferralUseCases,
    },
    webhooks,
};

// ============================================================================
// Repository
// ============================================================================

/// Provider event ids that have been applied.
#[async_trait]
pub trait ProcessedEventRepo: Send + Sync {
    async fn is_processed(&self, provider: PaymentProvider, event_id: &str) -> AppResult<bool>;
    async fn mark_processed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        kind: EventKind,
    ) -> AppResult<()>;
}

// ============================================================================
// Outcomes
// ============================================================================

/// Counts for one webhook delivery. The endpoint acknowledges regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WebhookReport {
    pub received: usize,
    pub applied: usize,
    pub duplicates: usize,
    pub dropped: usize,
}

enum Disposition {
    Applied,
    /// No account could be identified; logged and acknowledged
    Unmatched,
}

// ============================================================================
// Reconciler
// ============================================================================

#[derive(Clone)]
pub struct WebhookReconciler {
    accounts: PaymentAccountUseCases,
    referrals: ReferralUseCases,
    sessions: Arc<dyn CheckoutSessionStore>,
    plans: Arc<dyn PlanCatalog>,
    directory: Arc<dyn AccountDirectory>,
    notifier: Arc<dyn Notifier>,
    events: Arc<dyn ProcessedEventRepo>,
    registry: ProviderRegistry,
}

impl WebhookReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: PaymentAccountUseCases,
        referrals: ReferralUseCases,
        sessions: Arc<dyn CheckoutSessionStore>,
        plans: Arc<dyn PlanCatalog>,
        directory: Arc<dyn AccountDirectory>,
        notifier: Arc<dyn Notifier>,
        events: Arc<dyn ProcessedEventRepo>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            accounts,
            referrals,
            sessions,
            plans,
            directory,
            notifier,
            events,
            registry,
        }
    }

    /// Verify, normalize and apply one webhook delivery.
    ///
    /// Only verification failures and unconfigured providers are returned as
    /// errors; everything after verification is logged and acknowledged.
    pub async fn handle(
        &self,
        provider: PaymentProvider,
        headers: &WebhookHeaders,
        body: &str,
    ) -> AppResult<WebhookReport> {
        let verifier = self.registry.verifier(provider)?;
        verifier.verify(headers, body).await?;

        let events = match webhooks::normalize(provider, body) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Unreadable webhook payload dropped");
                return Ok(WebhookReport::default());
            }
        };

        let mut report = WebhookReport {
            received: events.len(),
            ..Default::default()
        };
        for event in &events {
            match self.process(event).await {
                Ok(Some(Disposition::Applied)) => report.applied += 1,
                Ok(Some(Disposition::Unmatched)) => report.dropped += 1,
                Ok(None) => report.duplicates += 1,
                Err(e) => {
                    tracing::error!(
                        provider = %provider,
                        event_id = %event.event_id,
                        kind = %event.kind,
                        retryable = e.is_retryable(),
                        error = %e,
                        "Webhook event failed"
                    );
                    report.dropped += 1;
                }
            }
        }

        tracing::info!(
            provider = %provider,
            received = report.received,
            applied = report.applied,
            duplicates = report.duplicates,
            dropped = report.dropped,
            "Webhook processed"
        );
        Ok(report)
    }

    /// Apply an event once. `None` means it was already processed.
    async fn process(&self, event: &ProviderEvent) -> AppResult<Option<Disposition>> {
        let provider = event.provider();
        if self.events.is_processed(provider, &event.event_id).await? {
            tracing::debug!(provider = %provider, event_id = %event.event_id, "Duplicate webhook event");
            return Ok(None);
        }

        let disposition = self.apply(event).await?;
        if let Disposition::Unmatched = disposition {
            tracing::info!(
                provider = %provider,
                event_id = %event.event_id,
                kind = %event.kind,
                "No payment account matches event, dropped"
            );
        }
        self.events
            .mark_processed(provider, &event.event_id, event.kind)
            .await?;
        Ok(Some(disposition))
    }

    async fn apply(&self, event: &ProviderEvent) -> AppResult<Disposition> {
        match event.kind {
            EventKind::SubscriptionActivated => self.activate(event).await,
            EventKind::PaymentConfirmed => {
                let change = self
                    .accounts
                    .set_status(&event.account_match(), AccountStatus::Active)
                    .await?;
                Ok(disposition_of(&change))
            }
            EventKind::PaymentFailed | EventKind::SubscriptionExpired => {
                let change = self
                    .accounts
                    .set_status(&event.account_match(), AccountStatus::Disabled)
                    .await?;
                if let StatusChange::Changed { account, .. } = &change {
                    self.notify(account.user_id, NotificationTemplate::PaymentIssue, json!({}))
                        .await;
                }
                Ok(disposition_of(&change))
            }
            EventKind::SubscriptionCancelled | EventKind::PaymentRefunded => {
                self.cancel(event).await
            }
            EventKind::MandateCreated => self.mandate_created(event).await,
        }
    }

    // ------------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------------

    async fn activate(&self, event: &ProviderEvent) -> AppResult<Disposition> {
        let provider = event.provider();
        let metadata = self.checkout_metadata(provider, event.reference.checkout_id()).await;
        let user_id = event.user_id.or(metadata.as_ref().map(|m| m.user_id));
        let plan = self
            .resolve_plan(
                provider,
                event.product_id.as_deref(),
                metadata.as_ref().and_then(|m| m.plan_id.as_deref()),
            )
            .await?;

        let fields = AccountFields {
            amount_cents: event.amount_cents.or(plan.as_ref().map(|p| p.price_cents)),
            plan_id: plan.as_ref().map(|p| p.plan_id.clone()),
            product_id: event.product_id.clone(),
            referral_id: metadata.and_then(|m| m.referral_id),
            status: AccountStatus::Active,
        };
        let outcome = self
            .accounts
            .upsert(&AccountMatch::new(event.reference.clone(), user_id), fields)
            .await?;

        let account = match &outcome {
            UpsertOutcome::Unmatched => return Ok(Disposition::Unmatched),
            UpsertOutcome::Ignored(_) => return Ok(Disposition::Applied),
            other => match other.account() {
                Some(account) => account.clone(),
                None => return Ok(Disposition::Unmatched),
            },
        };

        if outcome.newly_active() {
            self.welcome(&account, plan.as_ref()).await;
        }
        self.credit_referral(&account).await?;
        Ok(Disposition::Applied)
    }

    async fn cancel(&self, event: &ProviderEvent) -> AppResult<Disposition> {
        let change = self
            .accounts
            .set_status(&event.account_match(), AccountStatus::Cancelled)
            .await?;
        let Some(account) = change.account() else {
            return Ok(Disposition::Unmatched);
        };

        // Reversal is keyed and happens at most once, also on replays.
        if let Some(key) = commission_key(account) {
            self.referrals.reverse_purchase(&key).await?;
        }
        if let StatusChange::Changed { account, .. } = &change {
            self.notify(account.user_id, NotificationTemplate::Goodbye, json!({}))
                .await;
        }
        Ok(Disposition::Applied)
    }

    /// The first confirmed mandate starts the provider subscription; later
    /// ones are re-authorizations.
    async fn mandate_created(&self, event: &ProviderEvent) -> AppResult<Disposition> {
        let provider = event.provider();
        let Some((account, count)) = self.accounts.record_mandate(&event.account_match()).await?
        else {
            return Ok(Disposition::Unmatched);
        };

        if count > 1 && account.reference.subscription_id().is_some() {
            tracing::info!(account_id = %account.id, mandate_count = count, "Mandate re-authorized");
            if account.status == AccountStatus::Disabled {
                self.accounts
                    .set_status(
                        &AccountMatch::new(account.reference.clone(), None),
                        AccountStatus::Active,
                    )
                    .await?;
            }
            return Ok(Disposition::Applied);
        }

        let mandate_id = account
            .reference
            .mandate_id()
            .ok_or_else(|| AppError::InvalidInput("Mandate event without mandate id".into()))?;
        let plan = match &account.plan_id {
            Some(plan_id) => self.plans.get_plan(plan_id).await?,
            None => None,
        }
        .ok_or(AppError::NotFound)?;

        let port = self.registry.provider(provider)?;
        let subscription_id = port.create_subscription(mandate_id, &plan).await?;
        tracing::info!(
            account_id = %account.id,
            provider = %provider,
            subscription_id = %subscription_id,
            "Direct-debit subscription created"
        );

        let reference = ProviderRef::from_parts(
            provider,
            Some(subscription_id.to_string()),
            account.reference.checkout_id().map(str::to_string),
            Some(mandate_id.to_string()),
        );
        let outcome = self
            .accounts
            .upsert(
                &AccountMatch::new(reference, Some(account.user_id)),
                AccountFields {
                    amount_cents: Some(plan.price_cents),
                    plan_id: Some(plan.plan_id.clone()),
                    status: AccountStatus::Active,
                    ..Default::default()
                },
            )
            .await?;

        if let Some(account) = outcome.account() {
            if outcome.newly_active() {
                self.welcome(account, Some(&plan)).await;
            }
            self.credit_referral(account).await?;
        }
        Ok(Disposition::Applied)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Metadata lookup failures degrade to "no metadata".
    async fn checkout_metadata(
        &self,
        provider: PaymentProvider,
        session_id: Option<&str>,
    ) -> Option<CheckoutSessionMetadata> {
        let session_id = session_id?;
        match self.sessions.get(provider, session_id).await {
            Ok(Some(metadata)) => Some(metadata),
            Ok(None) => {
                tracing::warn!(provider = %provider, session_id, "No checkout metadata for session");
                None
            }
            Err(e) => {
                tracing::warn!(provider = %provider, session_id, error = %e, "Checkout metadata lookup failed");
                None
            }
        }
    }

    async fn resolve_plan(
        &self,
        provider: PaymentProvider,
        product_id: Option<&str>,
        plan_id: Option<&str>,
    ) -> AppResult<Option<Plan>> {
        if let Some(product_id) = product_id
            && let Some(plan) = self
                .plans
                .get_product(&ProductLookup::new(provider, product_id))
                .await?
        {
            return Ok(Some(plan));
        }
        match plan_id {
            Some(plan_id) => self.plans.get_plan(plan_id).await,
            None => Ok(None),
        }
    }

    async fn credit_referral(&self, account: &PaymentAccount) -> AppResult<()> {
        if !account.status.is_active() {
            return Ok(());
        }
        let (Some(referral_id), Some(key)) = (&account.referral_id, commission_key(account)) else {
            return Ok(());
        };
        self.referrals
            .credit_purchase(referral_id, key, account.amount_cents)
            .await?;
        Ok(())
    }

    async fn welcome(&self, account: &PaymentAccount, plan: Option<&Plan>) {
        let variables = json!({ "plan": plan.map(|p| p.name.as_str()) });
        self.notify(account.user_id, NotificationTemplate::Welcome, variables)
            .await;
    }

    /// Fire-and-forget: failures are logged and never affect the event.
    async fn notify(
        &self,
        user_id: Uuid,
        template: NotificationTemplate,
        mut variables: serde_json::Value,
    ) {
        let contact = match self.directory.get_by_id(user_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                tracing::warn!(user_id = %user_id, template = %template, "No contact for notification");
                return;
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Contact lookup failed");
                return;
            }
        };

        if let Some(map) = variables.as_object_mut() {
            let name = contact.username.clone().unwrap_or_else(|| contact.email.clone());
            map.insert("username".into(), json!(name));
        }
        if let Err(e) = self.notifier.send(&contact.email, template, variables).await {
            tracing::warn!(user_id = %user_id, template = %template, error = %e, "Notification failed");
        }
    }
}

fn disposition_of(change: &StatusChange) -> Disposition {
    match change {
        StatusChange::Unmatched => Disposition::Unmatched,
        _ => Disposition::Applied,
    }
}

/// One commission per subscription instance.
fn commission_key(account: &PaymentAccount) -> Option<CommissionKey> {
    account
        .reference
        .subscription_id()
        .or(account.reference.checkout_id())
        .map(|id| CommissionKey::new(account.provider(), id))
}
