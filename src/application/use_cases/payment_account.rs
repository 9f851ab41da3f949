use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        account_status::AccountStatus,
        payment_account::{
            AccountMatch, MatchKey, NewPaymentAccount, PaymentAccount, PaymentAccountUpdate,
        },
    },
};

// ============================================================================
// Repository
// ============================================================================

#[async_trait]
pub trait PaymentAccountRepo: Send + Sync {
    async fn find(&self, key: &MatchKey) -> AppResult<Option<PaymentAccount>>;
    async fn insert(&self, input: &NewPaymentAccount) -> AppResult<PaymentAccount>;
    async fn update(&self, id: Uuid, update: &PaymentAccountUpdate) -> AppResult<PaymentAccount>;
    /// Atomically increments the mandate counter and returns the new value.
    async fn increment_mandate_count(&self, id: Uuid) -> AppResult<i32>;
}

// ============================================================================
// Inputs / Outcomes
// ============================================================================

/// Values written by an upsert. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default)]
pub struct AccountFields {
    pub amount_cents: Option<i64>,
    pub plan_id: Option<String>,
    pub product_id: Option<String>,
    pub referral_id: Option<String>,
    pub status: AccountStatus,
}

#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    Created(PaymentAccount),
    Updated {
        account: PaymentAccount,
        previous_status: AccountStatus,
    },
    /// A new subscription instance took over the user's account row
    Replaced(PaymentAccount),
    /// Matched a cancelled instance; nothing was written
    Ignored(PaymentAccount),
    Unmatched,
}

impl UpsertOutcome {
    pub fn account(&self) -> Option<&PaymentAccount> {
        match self {
            UpsertOutcome::Created(account)
            | UpsertOutcome::Replaced(account)
            | UpsertOutcome::Ignored(account)
            | UpsertOutcome::Updated { account, .. } => Some(account),
            UpsertOutcome::Unmatched => None,
        }
    }

    /// Whether this upsert moved an account into `active` from anything else.
    pub fn newly_active(&self) -> bool {
        match self {
            UpsertOutcome::Created(account) | UpsertOutcome::Replaced(account) => {
                account.status.is_active()
            }
            UpsertOutcome::Updated {
                account,
                previous_status,
            } => account.status.is_active() && !previous_status.is_active(),
            UpsertOutcome::Ignored(_) | UpsertOutcome::Unmatched => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatusChange {
    Changed {
        account: PaymentAccount,
        from: AccountStatus,
    },
    Unchanged(PaymentAccount),
    /// Transition not allowed by the state machine; nothing was written
    Rejected(PaymentAccount),
    Unmatched,
}

impl StatusChange {
    pub fn account(&self) -> Option<&PaymentAccount> {
        match self {
            StatusChange::Changed { account, .. }
            | StatusChange::Unchanged(account)
            | StatusChange::Rejected(account) => Some(account),
            StatusChange::Unmatched => None,
        }
    }
}

/// How an account was located.
enum Located {
    /// Through a provider-scoped identifier
    Scoped(PaymentAccount),
    /// Through the user id only
    ByUser(PaymentAccount),
}

/// Subscription id of a live account that the incoming reference would
/// overwrite.
fn held_subscription<'a>(account: &'a PaymentAccount, matcher: &AccountMatch) -> Option<&'a str> {
    let held = account.live_subscription_id()?;
    let same = account.provider() == matcher.provider()
        && matcher.reference.subscription_id() == Some(held);
    (!same).then_some(held)
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentAccountUseCases {
    repo: Arc<dyn PaymentAccountRepo>,
}

impl PaymentAccountUseCases {
    pub fn new(repo: Arc<dyn PaymentAccountRepo>) -> Self {
        Self { repo }
    }

    async fn locate(&self, matcher: &AccountMatch) -> AppResult<Option<Located>> {
        for key in matcher.reference.match_keys() {
            if let Some(account) = self.repo.find(&key).await? {
                return Ok(Some(Located::Scoped(account)));
            }
        }
        if let Some(user_id) = matcher.user_id
            && let Some(account) = self.repo.find(&MatchKey::User(user_id)).await?
        {
            return Ok(Some(Located::ByUser(account)));
        }
        Ok(None)
    }

    /// Read by any of the match keys, in precedence order.
    pub async fn get(&self, matcher: &AccountMatch) -> AppResult<Option<PaymentAccount>> {
        Ok(self.locate(matcher).await?.map(|located| match located {
            Located::Scoped(account) | Located::ByUser(account) => account,
        }))
    }

    pub async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<PaymentAccount>> {
        self.repo.find(&MatchKey::User(user_id)).await
    }

    /// Locate an account by match precedence and write `fields`, or insert
    /// a new account when nothing matches and a user id is known.
    ///
    /// Falling back to the user id never takes over an `active` account that
    /// belongs to another provider, nor a live account that already holds a
    /// different subscription. Only a cancelled instance is replaced.
    pub async fn upsert(
        &self,
        matcher: &AccountMatch,
        fields: AccountFields,
    ) -> AppResult<UpsertOutcome> {
        let provider = matcher.provider();

        match self.locate(matcher).await? {
            Some(Located::Scoped(account)) => {
                if account.status.is_terminal() {
                    tracing::info!(
                        account_id = %account.id,
                        provider = %provider,
                        "Ignoring update for a cancelled subscription instance"
                    );
                    return Ok(UpsertOutcome::Ignored(account));
                }
                let previous_status = account.status;
                let update = PaymentAccountUpdate {
                    reference: Some(account.reference.merged_with(&matcher.reference)),
                    amount_cents: fields.amount_cents,
                    plan_id: fields.plan_id,
                    product_id: fields.product_id,
                    referral_id: fields.referral_id,
                    status: Some(fields.status),
                    replace_instance: false,
                };
                let account = self.repo.update(account.id, &update).await?;
                Ok(UpsertOutcome::Updated {
                    account,
                    previous_status,
                })
            }
            Some(Located::ByUser(account)) => {
                if account.provider() != provider && account.status.is_active() {
                    tracing::error!(
                        account_id = %account.id,
                        user_id = %account.user_id,
                        active_provider = %account.provider(),
                        incoming_provider = %provider,
                        "User already has an active subscription with another provider"
                    );
                    return Err(AppError::Conflict(format!(
                        "user already has an active {} subscription",
                        account.provider().display_name()
                    )));
                }

                if let Some(held) = held_subscription(&account, matcher) {
                    tracing::error!(
                        account_id = %account.id,
                        user_id = %account.user_id,
                        provider = %provider,
                        held_subscription_id = %held,
                        incoming_subscription_id = ?matcher.reference.subscription_id(),
                        "User already holds another subscription instance"
                    );
                    return Err(AppError::Conflict(format!(
                        "user already holds {} subscription {}",
                        account.provider().display_name(),
                        held
                    )));
                }

                let same_instance = account.provider() == provider
                    && !account.status.is_terminal()
                    && account.reference.subscription_id().is_none();

                if same_instance {
                    let previous_status = account.status;
                    let update = PaymentAccountUpdate {
                        reference: Some(account.reference.merged_with(&matcher.reference)),
                        amount_cents: fields.amount_cents,
                        plan_id: fields.plan_id,
                        product_id: fields.product_id,
                        referral_id: fields.referral_id,
                        status: Some(fields.status),
                        replace_instance: false,
                    };
                    let account = self.repo.update(account.id, &update).await?;
                    return Ok(UpsertOutcome::Updated {
                        account,
                        previous_status,
                    });
                }

                // New subscription instance: drop every field of the old one.
                let update = PaymentAccountUpdate {
                    reference: Some(matcher.reference.clone()),
                    amount_cents: Some(fields.amount_cents.unwrap_or(0)),
                    plan_id: fields.plan_id,
                    product_id: fields.product_id,
                    referral_id: fields.referral_id,
                    status: Some(fields.status),
                    replace_instance: true,
                };
                let replaced = self.repo.update(account.id, &update).await?;
                tracing::info!(
                    account_id = %replaced.id,
                    user_id = %replaced.user_id,
                    provider = %provider,
                    "Payment account replaced by a new subscription instance"
                );
                Ok(UpsertOutcome::Replaced(replaced))
            }
            None => {
                let Some(user_id) = matcher.user_id else {
                    return Ok(UpsertOutcome::Unmatched);
                };
                let account = self
                    .repo
                    .insert(&NewPaymentAccount {
                        user_id,
                        reference: matcher.reference.clone(),
                        amount_cents: fields.amount_cents.unwrap_or(0),
                        plan_id: fields.plan_id,
                        product_id: fields.product_id,
                        referral_id: fields.referral_id,
                        status: fields.status,
                    })
                    .await?;
                Ok(UpsertOutcome::Created(account))
            }
        }
    }

    /// Transition status without touching other fields.
    ///
    /// Only provider-scoped keys, or the user id of an account held with the
    /// same provider, can locate the account.
    pub async fn set_status(
        &self,
        matcher: &AccountMatch,
        status: AccountStatus,
    ) -> AppResult<StatusChange> {
        let account = match self.locate(matcher).await? {
            Some(Located::Scoped(account)) => account,
            Some(Located::ByUser(account)) if account.provider() == matcher.provider() => account,
            Some(Located::ByUser(_)) | None => return Ok(StatusChange::Unmatched),
        };

        if account.status == status {
            return Ok(StatusChange::Unchanged(account));
        }
        if !account.status.can_transition_to(status) {
            tracing::warn!(
                account_id = %account.id,
                from = %account.status,
                to = %status,
                "Rejected payment account status transition"
            );
            return Ok(StatusChange::Rejected(account));
        }

        let from = account.status;
        let account = self
            .repo
            .update(
                account.id,
                &PaymentAccountUpdate {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        Ok(StatusChange::Changed { account, from })
    }

    /// Record a confirmed direct-debit mandate and return the updated account
    /// with the new mandate count.
    pub async fn record_mandate(
        &self,
        matcher: &AccountMatch,
    ) -> AppResult<Option<(PaymentAccount, i32)>> {
        let account = match self.locate(matcher).await? {
            Some(Located::Scoped(account)) => account,
            Some(Located::ByUser(account)) if account.provider() == matcher.provider() => account,
            Some(Located::ByUser(_)) | None => return Ok(None),
        };
        if account.status.is_terminal() {
            return Ok(None);
        }

        let account = self
            .repo
            .update(
                account.id,
                &PaymentAccountUpdate {
                    reference: Some(account.reference.merged_with(&matcher.reference)),
                    ..Default::default()
                },
            )
            .await?;
        let count = self.repo.increment_mandate_count(account.id).await?;
        Ok(Some((
            PaymentAccount {
                mandate_count: count,
                ..account
            },
            count,
        )))
    }
}
