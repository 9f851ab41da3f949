use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        referral::{
            CommissionEntry, CommissionKey, CommissionStatus, Earnings, PayoutHistory,
            PayoutSubmission, Referral, commission_cents, commission_percentage,
        },
        statistics::{LedgerDelta, Statistics, StatisticsPeriod, current_buckets},
    },
    validators::is_valid_email,
};

// ============================================================================
// Repositories
// ============================================================================

#[async_trait]
pub trait ReferralRepo: Send + Sync {
    async fn create(&self, referral_id: &str, host_id: Uuid) -> AppResult<Referral>;
    async fn get(&self, referral_id: &str) -> AppResult<Option<Referral>>;
    async fn newest_for_host(&self, host_id: Uuid) -> AppResult<Option<Referral>>;
    /// Returns false when the host owns no such link.
    async fn delete(&self, host_id: Uuid, referral_id: &str) -> AppResult<bool>;
    /// Set insert; returns true when the guest was not yet recorded.
    async fn add_guest(&self, referral_id: &str, guest_id: Uuid) -> AppResult<bool>;
}

pub type Buckets = [(StatisticsPeriod, NaiveDate); 3];

/// Earnings and statistics storage. Every method applies its increments to
/// all buckets and to Earnings atomically, creating missing rows.
#[async_trait]
pub trait ReferralLedgerRepo: Send + Sync {
    async fn get_earnings(&self, host_id: Uuid) -> AppResult<Option<Earnings>>;

    async fn apply_delta(&self, host_id: Uuid, buckets: &Buckets, delta: &LedgerDelta)
    -> AppResult<()>;

    /// Store the entry and apply `delta`, unless an entry with the same key
    /// already exists. Returns whether anything was credited.
    async fn credit_commission(
        &self,
        entry: &CommissionEntry,
        buckets: &Buckets,
        delta: &LedgerDelta,
    ) -> AppResult<bool>;

    /// Flip a credited entry to reversed and subtract exactly what it credited.
    /// Returns the entry when this call performed the reversal.
    async fn reverse_commission(
        &self,
        key: &CommissionKey,
        buckets: &Buckets,
    ) -> AppResult<Option<CommissionEntry>>;

    /// Newest bucket per period type that has any activity.
    async fn latest_statistics(&self, host_id: Uuid) -> AppResult<Vec<Statistics>>;
}

#[derive(Debug, Clone)]
pub struct NewPayoutSubmission {
    pub host_id: Uuid,
    pub paypal_email: String,
    pub amount_cents: i64,
    pub scheduled_time: NaiveDateTime,
}

#[async_trait]
pub trait PayoutRepo: Send + Sync {
    async fn create_submission(&self, input: &NewPayoutSubmission) -> AppResult<PayoutSubmission>;
    async fn list_history(&self, host_id: Uuid) -> AppResult<Vec<PayoutHistory>>;
}

// ============================================================================
// Inputs
// ============================================================================

/// Something that happened through a referral link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralActivity {
    Click,
    Signup,
    Purchase { amount_cents: i64, cancelled: bool },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayoutRequest {
    pub paypal_email: String,
    pub amount_cents: i64,
    pub scheduled_time: NaiveDateTime,
}

/// Whether the full balance may be paid out. The historical rule rejects a
/// request equal to the balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayoutPolicy {
    pub allow_full_balance: bool,
}

impl PayoutPolicy {
    pub fn permits(&self, amount_cents: i64, balance_cents: i64) -> bool {
        if self.allow_full_balance {
            amount_cents <= balance_cents
        } else {
            amount_cents < balance_cents
        }
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct ReferralUseCases {
    referrals: Arc<dyn ReferralRepo>,
    ledger: Arc<dyn ReferralLedgerRepo>,
    payouts: Arc<dyn PayoutRepo>,
    payout_policy: PayoutPolicy,
}

impl ReferralUseCases {
    pub fn new(
        referrals: Arc<dyn ReferralRepo>,
        ledger: Arc<dyn ReferralLedgerRepo>,
        payouts: Arc<dyn PayoutRepo>,
        payout_policy: PayoutPolicy,
    ) -> Self {
        Self {
            referrals,
            ledger,
            payouts,
            payout_policy,
        }
    }

    fn buckets_now() -> Buckets {
        current_buckets(Utc::now().date_naive())
    }

    // ------------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------------

    pub async fn generate_link(&self, host_id: Uuid) -> AppResult<Referral> {
        let referral = self.referrals.create(&generate_referral_id(), host_id).await?;
        tracing::info!(host_id = %host_id, referral_id = %referral.referral_id, "Referral link created");
        Ok(referral)
    }

    pub async fn get_newest_link(&self, host_id: Uuid) -> AppResult<Option<Referral>> {
        self.referrals.newest_for_host(host_id).await
    }

    pub async fn remove_link(&self, host_id: Uuid, referral_id: &str) -> AppResult<()> {
        if !self.referrals.delete(host_id, referral_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Look up a referral; `None` when the link no longer exists.
    pub async fn get_referral(&self, referral_id: &str) -> AppResult<Option<Referral>> {
        self.referrals.get(referral_id).await
    }

    pub async fn link_clicked(&self, referral_id: &str) -> AppResult<()> {
        let referral = self
            .referrals
            .get(referral_id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.update_statistics(referral.host_id, ReferralActivity::Click)
            .await?;
        Ok(())
    }

    /// Record a guest signing up through a link. A guest is counted once.
    pub async fn log_signup(&self, referral_id: &str, guest_id: Uuid) -> AppResult<bool> {
        let referral = self
            .referrals
            .get(referral_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if referral.host_id == guest_id {
            return Err(AppError::InvalidInput(
                "A referral link cannot be used by its owner".into(),
            ));
        }

        let added = self.referrals.add_guest(referral_id, guest_id).await?;
        if added {
            self.update_statistics(referral.host_id, ReferralActivity::Signup)
                .await?;
        }
        Ok(added)
    }

    // ------------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------------

    /// Apply one activity to the host's current weekly, monthly and yearly
    /// buckets. Purchases are valued at the host's current tier and also move
    /// Earnings; a cancelled purchase subtracts instead.
    pub async fn update_statistics(
        &self,
        host_id: Uuid,
        activity: ReferralActivity,
    ) -> AppResult<LedgerDelta> {
        let delta = match activity {
            ReferralActivity::Click => LedgerDelta::click(),
            ReferralActivity::Signup => LedgerDelta::signup(),
            ReferralActivity::Purchase {
                amount_cents,
                cancelled,
            } => {
                let commission = self.current_commission(host_id, amount_cents).await?;
                let delta = LedgerDelta::purchase(commission);
                if cancelled { delta.negated() } else { delta }
            }
        };
        self.ledger
            .apply_delta(host_id, &Self::buckets_now(), &delta)
            .await?;
        Ok(delta)
    }

    async fn current_commission(&self, host_id: Uuid, amount_cents: i64) -> AppResult<i64> {
        let earnings = self
            .ledger
            .get_earnings(host_id)
            .await?
            .unwrap_or_else(|| Earnings::empty(host_id));
        let percent = commission_percentage(earnings.total_purchases);
        commission_cents(amount_cents, percent).ok_or_else(|| {
            AppError::InvalidInput(format!("Purchase amount {amount_cents} is out of range"))
        })
    }

    /// Credit the host of `referral_id` for a referred purchase, once per key.
    ///
    /// A missing referral is logged and skipped.
    pub async fn credit_purchase(
        &self,
        referral_id: &str,
        key: CommissionKey,
        amount_cents: i64,
    ) -> AppResult<Option<CommissionEntry>> {
        let Some(referral) = self.referrals.get(referral_id).await? else {
            tracing::warn!(referral_id, source_id = %key.source_id, "Referral not found, commission skipped");
            return Ok(None);
        };
        if amount_cents < 0 {
            tracing::warn!(referral_id, source_id = %key.source_id, amount_cents, "Negative purchase amount credited as zero");
        }
        let amount_cents = amount_cents.max(0);

        let commission = self
            .current_commission(referral.host_id, amount_cents)
            .await?;
        let entry = CommissionEntry {
            key,
            host_id: referral.host_id,
            referral_id: referral.referral_id,
            purchase_cents: amount_cents,
            commission_cents: commission,
            status: CommissionStatus::Credited,
        };

        let credited = self
            .ledger
            .credit_commission(&entry, &Self::buckets_now(), &LedgerDelta::purchase(commission))
            .await?;
        if !credited {
            tracing::debug!(source_id = %entry.key.source_id, "Commission already credited");
            return Ok(None);
        }

        tracing::info!(
            host_id = %entry.host_id,
            referral_id = %entry.referral_id,
            commission_cents = entry.commission_cents,
            "Referral commission credited"
        );
        Ok(Some(entry))
    }

    /// Reverse the commission credited for `key`, once.
    pub async fn reverse_purchase(&self, key: &CommissionKey) -> AppResult<Option<CommissionEntry>> {
        let reversed = self
            .ledger
            .reverse_commission(key, &Self::buckets_now())
            .await?;
        match &reversed {
            Some(entry) => tracing::info!(
                host_id = %entry.host_id,
                commission_cents = entry.commission_cents,
                "Referral commission reversed"
            ),
            None => tracing::debug!(source_id = %key.source_id, "No credited commission to reverse"),
        }
        Ok(reversed)
    }

    /// Newest bucket per period type, zero-valued where there is no activity.
    pub async fn get_statistics(&self, host_id: Uuid) -> AppResult<Vec<Statistics>> {
        let stored = self.ledger.latest_statistics(host_id).await?;
        let today = Utc::now().date_naive();

        Ok(StatisticsPeriod::all()
            .into_iter()
            .map(|period| {
                stored
                    .iter()
                    .filter(|s| s.period == period)
                    .max_by_key(|s| s.period_start)
                    .cloned()
                    .unwrap_or_else(|| Statistics::empty(host_id, period, period.start_of(today)))
            })
            .collect())
    }

    pub async fn get_unpaid_earnings(&self, host_id: Uuid) -> AppResult<i64> {
        Ok(self
            .ledger
            .get_earnings(host_id)
            .await?
            .map(|e| e.unpaid_cents())
            .unwrap_or(0))
    }

    // ------------------------------------------------------------------------
    // Payouts
    // ------------------------------------------------------------------------

    pub async fn request_payout(
        &self,
        host_id: Uuid,
        request: PayoutRequest,
    ) -> AppResult<PayoutSubmission> {
        let email = request.paypal_email.trim();
        if !is_valid_email(email) {
            return Err(AppError::ValidationError(
                "A valid PayPal email is required".into(),
            ));
        }
        if request.amount_cents <= 0 {
            return Err(AppError::ValidationError(
                "Payout amount must be positive".into(),
            ));
        }

        let balance = self
            .ledger
            .get_earnings(host_id)
            .await?
            .map(|e| e.amount_cents)
            .unwrap_or(0);
        if !self.payout_policy.permits(request.amount_cents, balance) {
            return Err(AppError::PayoutNotAvailable);
        }

        let submission = self
            .payouts
            .create_submission(&NewPayoutSubmission {
                host_id,
                paypal_email: email.to_string(),
                amount_cents: request.amount_cents,
                scheduled_time: request.scheduled_time,
            })
            .await?;
        tracing::info!(host_id = %host_id, amount_cents = submission.amount_cents, "Payout requested");
        Ok(submission)
    }

    pub async fn get_payout_history(&self, host_id: Uuid) -> AppResult<Vec<PayoutHistory>> {
        self.payouts.list_history(host_id).await
    }
}

fn generate_referral_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
