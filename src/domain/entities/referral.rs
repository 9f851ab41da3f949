use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::payment_provider::PaymentProvider;

/// A referral link owned by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Referral {
    pub referral_id: String,
    pub host_id: Uuid,
    pub guest_ids: Vec<Uuid>,
    pub created_at: Option<NaiveDateTime>,
}

/// Running commission balance of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Earnings {
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub total_purchases: i64,
}

impl Earnings {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            amount_cents: 0,
            total_purchases: 0,
        }
    }

    /// Balance a host can see; a negative running total shows as zero.
    pub fn unpaid_cents(&self) -> i64 {
        self.amount_cents.max(0)
    }
}

// ============================================================================
// Commission tiers
// ============================================================================

/// Tier thresholds, highest first: (minimum total purchases, percentage).
const COMMISSION_TIERS: [(i64, i64); 4] = [(400, 40), (200, 35), (100, 30), (50, 25)];
const BASE_COMMISSION_PERCENT: i64 = 20;

/// Commission percentage for a host with `total_purchases` referred purchases.
pub fn commission_percentage(total_purchases: i64) -> i64 {
    COMMISSION_TIERS
        .iter()
        .find(|(threshold, _)| total_purchases >= *threshold)
        .map(|(_, pct)| *pct)
        .unwrap_or(BASE_COMMISSION_PERCENT)
}

/// `amount_cents * percent / 100`, rounded half away from zero. `None` when
/// the product does not fit in an `i64`.
pub fn commission_cents(amount_cents: i64, percent: i64) -> Option<i64> {
    let scaled = amount_cents.checked_abs()?.checked_mul(percent)?;
    let rounded = scaled.checked_add(50)? / 100;
    Some(if amount_cents < 0 { -rounded } else { rounded })
}

// ============================================================================
// Commission entries
// ============================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "commission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CommissionStatus {
    Credited,
    Reversed,
}

/// Identifies the purchase a commission was earned on: one per subscription instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommissionKey {
    pub provider: PaymentProvider,
    pub source_id: String,
}

impl CommissionKey {
    pub fn new(provider: PaymentProvider, source_id: impl Into<String>) -> Self {
        Self {
            provider,
            source_id: source_id.into(),
        }
    }
}

/// Commission credited to a host for one referred purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionEntry {
    pub key: CommissionKey,
    pub host_id: Uuid,
    pub referral_id: String,
    pub purchase_cents: i64,
    pub commission_cents: i64,
    pub status: CommissionStatus,
}

// ============================================================================
// Payouts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutSubmission {
    pub id: Uuid,
    pub host_id: Uuid,
    pub paypal_email: String,
    pub amount_cents: i64,
    pub scheduled_time: NaiveDateTime,
    pub created_at: Option<NaiveDateTime>,
}

/// Settled payout, written by the payout processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutHistory {
    pub id: Uuid,
    pub host_id: Uuid,
    pub amount_cents: i64,
    pub paypal_email: String,
    pub paid_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        let cases = [
            (0, 20),
            (49, 20),
            (50, 25),
            (99, 25),
            (100, 30),
            (199, 30),
            (200, 35),
            (399, 35),
            (400, 40),
            (1000, 40),
        ];
        for (purchases, expected) in cases {
            assert_eq!(
                commission_percentage(purchases),
                expected,
                "total_purchases = {purchases}"
            );
        }
    }

    #[test]
    fn tier_for_negative_total_is_base() {
        assert_eq!(commission_percentage(-3), 20);
    }

    #[test]
    fn commission_of_twenty_units_at_base_tier() {
        assert_eq!(commission_cents(2000, 20), Some(400));
    }

    #[test]
    fn commission_rounds_half_up_symmetrically() {
        // 999 * 25% = 249.75
        assert_eq!(commission_cents(999, 25), Some(250));
        assert_eq!(commission_cents(-999, 25), Some(-250));
        // 2 * 25% = 0.5
        assert_eq!(commission_cents(2, 25), Some(1));
        assert_eq!(commission_cents(1, 20), Some(0));
    }

    #[test]
    fn commission_overflow_is_none() {
        assert_eq!(commission_cents(i64::MAX / 100, 40), None);
        assert_eq!(commission_cents(i64::MIN, 20), None);
    }

    #[test]
    fn unpaid_never_negative() {
        let mut e = Earnings::empty(Uuid::new_v4());
        e.amount_cents = -150;
        assert_eq!(e.unpaid_cents(), 0);
        e.amount_cents = 150;
        assert_eq!(e.unpaid_cents(), 150);
    }
}
