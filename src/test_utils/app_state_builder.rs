//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::jwt,
    domain::entities::{
        payment_account::PaymentAccount, payment_provider::PaymentProvider, plan::Plan,
        referral::Referral,
    },
    infra::config::{AppConfig, Mode},
    ports::account_directory::AccountContact,
    test_utils::{
        InMemoryAccountDirectory, InMemoryCheckoutSessionStore, InMemoryLedgerRepo,
        InMemoryPaymentAccountRepo, InMemoryPayoutRepo, InMemoryPlanCatalog,
        InMemoryReferralRepo, InMemoryWebhookEventRepo, RecordingNotifier, StaticVerifier,
        StubPaymentProvider,
    },
    use_cases::{
        billing::{BillingUseCases, CheckoutSettings},
        payment_account::PaymentAccountUseCases,
        provider_registry::ProviderRegistry,
        reconciler::WebhookReconciler,
        referral::{PayoutPolicy, ReferralUseCases},
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";
pub const TEST_WEBAPP_DOMAIN: &str = "http://localhost:3000";

/// Access token for `user_id`, signed with the test secret.
pub fn test_access_token(user_id: Uuid) -> String {
    jwt::issue(
        user_id,
        &SecretString::new(TEST_JWT_SECRET.into()),
        Duration::hours(1),
    )
    .unwrap()
}

/// Handles to the in-memory state behind a built `AppState`.
pub struct TestMocks {
    pub accounts: Arc<InMemoryPaymentAccountRepo>,
    pub referrals: Arc<InMemoryReferralRepo>,
    pub ledger: Arc<InMemoryLedgerRepo>,
    pub payouts: Arc<InMemoryPayoutRepo>,
    pub sessions: Arc<InMemoryCheckoutSessionStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub providers: HashMap<PaymentProvider, Arc<StubPaymentProvider>>,
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let user_id = Uuid::new_v4();
/// let (app_state, mocks) = TestAppStateBuilder::new()
///     .with_contact(create_test_contact(user_id))
///     .with_plan(create_test_plan(|_| {}))
///     .with_provider(PaymentProvider::Radom)
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    accounts: Vec<PaymentAccount>,
    plans: Vec<Plan>,
    contacts: Vec<AccountContact>,
    referrals: Vec<Referral>,
    providers: Vec<(PaymentProvider, bool)>,
    allow_full_balance: bool,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            accounts: vec![],
            plans: vec![],
            contacts: vec![],
            referrals: vec![],
            providers: vec![],
            allow_full_balance: false,
        }
    }

    pub fn with_account(mut self, account: PaymentAccount) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_contact(mut self, contact: AccountContact) -> Self {
        self.contacts.push(contact);
        self
    }

    pub fn with_referral(mut self, referral: Referral) -> Self {
        self.referrals.push(referral);
        self
    }

    /// Configure a stub provider whose webhooks always verify.
    pub fn with_provider(mut self, provider: PaymentProvider) -> Self {
        self.providers.push((provider, true));
        self
    }

    /// Configure a stub provider whose webhooks never verify.
    pub fn with_rejecting_provider(mut self, provider: PaymentProvider) -> Self {
        self.providers.push((provider, false));
        self
    }

    pub fn with_full_balance_payouts(mut self) -> Self {
        self.allow_full_balance = true;
        self
    }

    /// Build the AppState with all configured mocks.
    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the AppState and return handles to its in-memory state.
    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let accounts = Arc::new(InMemoryPaymentAccountRepo::with_accounts(self.accounts));
        let plans = Arc::new(InMemoryPlanCatalog::with_plans(self.plans));
        let directory = Arc::new(InMemoryAccountDirectory::with_contacts(self.contacts));
        let referrals = Arc::new(InMemoryReferralRepo::new());
        for referral in self.referrals {
            referrals.seed(referral);
        }
        let ledger = Arc::new(InMemoryLedgerRepo::new());
        let payouts = Arc::new(InMemoryPayoutRepo::new());
        let sessions = Arc::new(InMemoryCheckoutSessionStore::new());
        let events = Arc::new(InMemoryWebhookEventRepo::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let mut registry = ProviderRegistry::new();
        let mut providers = HashMap::new();
        for (provider, accept) in self.providers {
            let stub = Arc::new(StubPaymentProvider::new(provider));
            let verifier = if accept {
                StaticVerifier::accepting()
            } else {
                StaticVerifier::rejecting()
            };
            registry = registry.with_provider(stub.clone(), Arc::new(verifier));
            providers.insert(provider, stub);
        }

        let account_use_cases = PaymentAccountUseCases::new(accounts.clone());
        let referral_use_cases = ReferralUseCases::new(
            referrals.clone(),
            ledger.clone(),
            payouts.clone(),
            PayoutPolicy {
                allow_full_balance: self.allow_full_balance,
            },
        );

        let billing_use_cases = BillingUseCases::new(
            account_use_cases.clone(),
            plans.clone(),
            directory.clone(),
            referrals.clone(),
            sessions.clone(),
            registry.clone(),
            CheckoutSettings {
                webapp_domain: TEST_WEBAPP_DOMAIN.to_string(),
                metadata_ttl_secs: 60,
            },
        );

        let reconciler = WebhookReconciler::new(
            account_use_cases,
            referral_use_cases.clone(),
            sessions.clone(),
            plans,
            directory,
            notifier.clone(),
            events,
            registry,
        );

        // Create minimal config for testing
        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            access_token_ttl: Duration::hours(24),
            webapp_domain: Url::parse(TEST_WEBAPP_DOMAIN).unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            redis_url: String::new(),
            database_url: String::new(),
            checkout_metadata_ttl_secs: 60,
            checkout_currency: "GBP".to_string(),
            payout_allow_full_balance: self.allow_full_balance,
            mode: Mode::Development,
            radom: None,
            paypal: None,
            gocardless: None,
            stripe: None,
            loops: None,
        });

        let app_state = AppState {
            config,
            billing_use_cases: Arc::new(billing_use_cases),
            referral_use_cases: Arc::new(referral_use_cases),
            reconciler: Arc::new(reconciler),
        };

        let mocks = TestMocks {
            accounts,
            referrals,
            ledger,
            payouts,
            sessions,
            notifier,
            providers,
        };

        (app_state, mocks)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
