//! In-memory implementations of the account-side repositories and ports.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_account::{MatchKey, NewPaymentAccount, PaymentAccount, PaymentAccountUpdate},
        payment_provider::PaymentProvider,
        plan::{Plan, ProductLookup},
        provider_event::EventKind,
    },
    ports::{
        account_directory::{AccountContact, AccountDirectory},
        plan_catalog::PlanCatalog,
    },
    use_cases::{
        checkout::{CheckoutSessionMetadata, CheckoutSessionStore},
        payment_account::PaymentAccountRepo,
        reconciler::ProcessedEventRepo,
    },
};

// ============================================================================
// InMemoryPaymentAccountRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentAccountRepo {
    pub accounts: Mutex<Vec<PaymentAccount>>,
}

impl InMemoryPaymentAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<PaymentAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    pub fn seed(&self, account: PaymentAccount) {
        self.accounts.lock().unwrap().push(account);
    }

    pub fn all(&self) -> Vec<PaymentAccount> {
        self.accounts.lock().unwrap().clone()
    }

    pub fn find_by_user(&self, user_id: Uuid) -> Option<PaymentAccount> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.user_id == user_id)
            .cloned()
    }
}

#[async_trait]
impl PaymentAccountRepo for InMemoryPaymentAccountRepo {
    async fn find(&self, key: &MatchKey) -> AppResult<Option<PaymentAccount>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.matches(key))
            .cloned())
    }

    async fn insert(&self, input: &NewPaymentAccount) -> AppResult<PaymentAccount> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.iter().any(|a| a.user_id == input.user_id) {
            return Err(AppError::Conflict("payment account already exists".into()));
        }
        let now = chrono::Utc::now().naive_utc();
        let account = PaymentAccount {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            reference: input.reference.clone(),
            amount_cents: input.amount_cents,
            plan_id: input.plan_id.clone(),
            product_id: input.product_id.clone(),
            referral_id: input.referral_id.clone(),
            status: input.status,
            mandate_count: 0,
            created_at: Some(now),
            updated_at: Some(now),
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn update(&self, id: Uuid, update: &PaymentAccountUpdate) -> AppResult<PaymentAccount> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound)?;

        if let Some(reference) = &update.reference {
            account.reference = reference.clone();
        }
        if let Some(amount) = update.amount_cents {
            account.amount_cents = amount;
        }
        if let Some(status) = update.status {
            account.status = status;
        }
        if update.replace_instance {
            account.plan_id = update.plan_id.clone();
            account.product_id = update.product_id.clone();
            account.referral_id = update.referral_id.clone();
            account.mandate_count = 0;
        } else {
            if update.plan_id.is_some() {
                account.plan_id = update.plan_id.clone();
            }
            if update.product_id.is_some() {
                account.product_id = update.product_id.clone();
            }
            if update.referral_id.is_some() {
                account.referral_id = update.referral_id.clone();
            }
        }
        account.updated_at = Some(chrono::Utc::now().naive_utc());
        Ok(account.clone())
    }

    async fn increment_mandate_count(&self, id: Uuid) -> AppResult<i32> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound)?;
        account.mandate_count += 1;
        Ok(account.mandate_count)
    }
}

// ============================================================================
// InMemoryPlanCatalog
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanCatalog {
    pub plans: Mutex<Vec<Plan>>,
}

impl InMemoryPlanCatalog {
    pub fn with_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: Mutex::new(plans),
        }
    }
}

#[async_trait]
impl PlanCatalog for InMemoryPlanCatalog {
    async fn get_product(&self, lookup: &ProductLookup) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| lookup.matches(p))
            .cloned())
    }

    async fn get_plan(&self, plan_id: &str) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.plan_id == plan_id)
            .cloned())
    }

    async fn list_plans(&self) -> AppResult<Vec<Plan>> {
        Ok(self.plans.lock().unwrap().clone())
    }
}

// ============================================================================
// InMemoryAccountDirectory
// ============================================================================

#[derive(Default)]
pub struct InMemoryAccountDirectory {
    pub contacts: Mutex<HashMap<Uuid, AccountContact>>,
}

impl InMemoryAccountDirectory {
    pub fn with_contacts(contacts: Vec<AccountContact>) -> Self {
        Self {
            contacts: Mutex::new(contacts.into_iter().map(|c| (c.user_id, c)).collect()),
        }
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn get_by_id(&self, user_id: Uuid) -> AppResult<Option<AccountContact>> {
        Ok(self.contacts.lock().unwrap().get(&user_id).cloned())
    }
}

// ============================================================================
// InMemoryCheckoutSessionStore
// ============================================================================

/// Ignores TTLs; entries live as long as the store.
#[derive(Default)]
pub struct InMemoryCheckoutSessionStore {
    pub sessions: Mutex<HashMap<(PaymentProvider, String), CheckoutSessionMetadata>>,
}

impl InMemoryCheckoutSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckoutSessionStore for InMemoryCheckoutSessionStore {
    async fn put(&self, metadata: &CheckoutSessionMetadata, _ttl_secs: u64) -> AppResult<()> {
        self.sessions.lock().unwrap().insert(
            (metadata.provider, metadata.session_id.clone()),
            metadata.clone(),
        );
        Ok(())
    }

    async fn get(
        &self,
        provider: PaymentProvider,
        session_id: &str,
    ) -> AppResult<Option<CheckoutSessionMetadata>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&(provider, session_id.to_string()))
            .cloned())
    }
}

// ============================================================================
// InMemoryWebhookEventRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryWebhookEventRepo {
    pub processed: Mutex<HashSet<(PaymentProvider, String)>>,
}

impl InMemoryWebhookEventRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessedEventRepo for InMemoryWebhookEventRepo {
    async fn is_processed(&self, provider: PaymentProvider, event_id: &str) -> AppResult<bool> {
        Ok(self
            .processed
            .lock()
            .unwrap()
            .contains(&(provider, event_id.to_string())))
    }

    async fn mark_processed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        _kind: EventKind,
    ) -> AppResult<()> {
        self.processed
            .lock()
            .unwrap()
            .insert((provider, event_id.to_string()));
        Ok(())
    }
}
