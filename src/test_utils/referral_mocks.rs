//! In-memory implementations of the referral repositories.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{
        referral::{
            CommissionEntry, CommissionKey, CommissionStatus, Earnings, PayoutHistory,
            PayoutSubmission, Referral,
        },
        statistics::{LedgerDelta, Statistics, StatisticsPeriod},
    },
    use_cases::referral::{Buckets, NewPayoutSubmission, PayoutRepo, ReferralLedgerRepo, ReferralRepo},
};

// ============================================================================
// InMemoryReferralRepo
// ============================================================================

/// Keeps insertion order, so the last link created for a host is the newest.
#[derive(Default)]
pub struct InMemoryReferralRepo {
    pub referrals: Mutex<Vec<Referral>>,
}

impl InMemoryReferralRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, referral: Referral) {
        self.referrals.lock().unwrap().push(referral);
    }
}

#[async_trait]
impl ReferralRepo for InMemoryReferralRepo {
    async fn create(&self, referral_id: &str, host_id: Uuid) -> AppResult<Referral> {
        let referral = Referral {
            referral_id: referral_id.to_string(),
            host_id,
            guest_ids: vec![],
            created_at: Some(chrono::Utc::now().naive_utc()),
        };
        self.referrals.lock().unwrap().push(referral.clone());
        Ok(referral)
    }

    async fn get(&self, referral_id: &str) -> AppResult<Option<Referral>> {
        Ok(self
            .referrals
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.referral_id == referral_id)
            .cloned())
    }

    async fn newest_for_host(&self, host_id: Uuid) -> AppResult<Option<Referral>> {
        Ok(self
            .referrals
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.host_id == host_id)
            .cloned())
    }

    async fn delete(&self, host_id: Uuid, referral_id: &str) -> AppResult<bool> {
        let mut referrals = self.referrals.lock().unwrap();
        let before = referrals.len();
        referrals.retain(|r| !(r.host_id == host_id && r.referral_id == referral_id));
        Ok(referrals.len() != before)
    }

    async fn add_guest(&self, referral_id: &str, guest_id: Uuid) -> AppResult<bool> {
        let mut referrals = self.referrals.lock().unwrap();
        let Some(referral) = referrals.iter_mut().find(|r| r.referral_id == referral_id) else {
            return Ok(false);
        };
        if referral.guest_ids.contains(&guest_id) {
            return Ok(false);
        }
        referral.guest_ids.push(guest_id);
        Ok(true)
    }
}

// ============================================================================
// InMemoryLedgerRepo
// ============================================================================

#[derive(Default)]
struct LedgerState {
    earnings: HashMap<Uuid, Earnings>,
    statistics: HashMap<(Uuid, StatisticsPeriod, NaiveDate), Statistics>,
    commissions: HashMap<CommissionKey, CommissionEntry>,
}

impl LedgerState {
    fn apply(&mut self, host_id: Uuid, buckets: &Buckets, delta: &LedgerDelta) {
        for (period, start) in buckets {
            self.statistics
                .entry((host_id, *period, *start))
                .or_insert_with(|| Statistics::empty(host_id, *period, *start))
                .apply(delta);
        }
        if delta.touches_earnings() {
            let earnings = self
                .earnings
                .entry(host_id)
                .or_insert_with(|| Earnings::empty(host_id));
            earnings.amount_cents += delta.earned_cents;
            earnings.total_purchases += delta.purchases;
        }
    }
}

/// One lock around all ledger tables, mirroring the single transaction
/// used by the Postgres implementation.
#[derive(Default)]
pub struct InMemoryLedgerRepo {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_earnings(&self, earnings: Earnings) {
        self.state
            .lock()
            .unwrap()
            .earnings
            .insert(earnings.user_id, earnings);
    }

    pub fn seed_statistics(&self, stats: Statistics) {
        self.state
            .lock()
            .unwrap()
            .statistics
            .insert((stats.host_id, stats.period, stats.period_start), stats);
    }
}

#[async_trait]
impl ReferralLedgerRepo for InMemoryLedgerRepo {
    async fn get_earnings(&self, host_id: Uuid) -> AppResult<Option<Earnings>> {
        Ok(self.state.lock().unwrap().earnings.get(&host_id).copied())
    }

    async fn apply_delta(
        &self,
        host_id: Uuid,
        buckets: &Buckets,
        delta: &LedgerDelta,
    ) -> AppResult<()> {
        self.state.lock().unwrap().apply(host_id, buckets, delta);
        Ok(())
    }

    async fn credit_commission(
        &self,
        entry: &CommissionEntry,
        buckets: &Buckets,
        delta: &LedgerDelta,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.commissions.contains_key(&entry.key) {
            return Ok(false);
        }
        state.commissions.insert(entry.key.clone(), entry.clone());
        state.apply(entry.host_id, buckets, delta);
        Ok(true)
    }

    async fn reverse_commission(
        &self,
        key: &CommissionKey,
        buckets: &Buckets,
    ) -> AppResult<Option<CommissionEntry>> {
        let mut state = self.state.lock().unwrap();
        let Some(entry) = state.commissions.get_mut(key) else {
            return Ok(None);
        };
        if entry.status != CommissionStatus::Credited {
            return Ok(None);
        }
        entry.status = CommissionStatus::Reversed;
        let entry = entry.clone();
        let delta = LedgerDelta::purchase(entry.commission_cents).negated();
        state.apply(entry.host_id, buckets, &delta);
        Ok(Some(entry))
    }

    async fn latest_statistics(&self, host_id: Uuid) -> AppResult<Vec<Statistics>> {
        let state = self.state.lock().unwrap();
        Ok(StatisticsPeriod::all()
            .into_iter()
            .filter_map(|period| {
                state
                    .statistics
                    .values()
                    .filter(|s| s.host_id == host_id && s.period == period)
                    .max_by_key(|s| s.period_start)
                    .cloned()
            })
            .collect())
    }
}

// ============================================================================
// InMemoryPayoutRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPayoutRepo {
    pub submissions: Mutex<Vec<PayoutSubmission>>,
    pub history: Mutex<Vec<PayoutHistory>>,
}

impl InMemoryPayoutRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<PayoutSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn seed_history(&self, payout: PayoutHistory) {
        self.history.lock().unwrap().push(payout);
    }
}

#[async_trait]
impl PayoutRepo for InMemoryPayoutRepo {
    async fn create_submission(&self, input: &NewPayoutSubmission) -> AppResult<PayoutSubmission> {
        let submission = PayoutSubmission {
            id: Uuid::new_v4(),
            host_id: input.host_id,
            paypal_email: input.paypal_email.clone(),
            amount_cents: input.amount_cents,
            scheduled_time: input.scheduled_time,
            created_at: Some(chrono::Utc::now().naive_utc()),
        };
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(submission)
    }

    async fn list_history(&self, host_id: Uuid) -> AppResult<Vec<PayoutHistory>> {
        let mut history: Vec<_> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.host_id == host_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(history)
    }
}
