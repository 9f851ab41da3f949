use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Reporting window of a statistics bucket
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "statistics_period", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatisticsPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl StatisticsPeriod {
    pub fn all() -> [StatisticsPeriod; 3] {
        [
            StatisticsPeriod::Weekly,
            StatisticsPeriod::Monthly,
            StatisticsPeriod::Yearly,
        ]
    }

    /// First day of the bucket containing `date`: Monday, 1st of month, 1st of January.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            StatisticsPeriod::Weekly => date
                .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
                .unwrap_or(date),
            StatisticsPeriod::Monthly => date.with_day(1).unwrap_or(date),
            StatisticsPeriod::Yearly => date.with_ordinal(1).unwrap_or(date),
        }
    }
}

/// The three buckets that contain `today`.
pub fn current_buckets(today: NaiveDate) -> [(StatisticsPeriod, NaiveDate); 3] {
    StatisticsPeriod::all().map(|period| (period, period.start_of(today)))
}

/// One period bucket of referral activity for a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub host_id: Uuid,
    pub period: StatisticsPeriod,
    pub period_start: NaiveDate,
    pub referral_link_clicks: i64,
    pub referral_link_signups: i64,
    pub purchases_made: i64,
    pub earned_cents: i64,
}

impl Statistics {
    /// Zero-valued placeholder for a host with no activity in `period`.
    pub fn empty(host_id: Uuid, period: StatisticsPeriod, period_start: NaiveDate) -> Self {
        Self {
            host_id,
            period,
            period_start,
            referral_link_clicks: 0,
            referral_link_signups: 0,
            purchases_made: 0,
            earned_cents: 0,
        }
    }

    pub fn apply(&mut self, delta: &LedgerDelta) {
        self.referral_link_clicks += delta.clicks;
        self.referral_link_signups += delta.signups;
        self.purchases_made += delta.purchases;
        self.earned_cents += delta.earned_cents;
    }
}

/// Increments applied to every bucket (and, for money, to Earnings) in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerDelta {
    pub clicks: i64,
    pub signups: i64,
    pub purchases: i64,
    pub earned_cents: i64,
}

impl LedgerDelta {
    pub fn click() -> Self {
        Self {
            clicks: 1,
            ..Default::default()
        }
    }

    pub fn signup() -> Self {
        Self {
            signups: 1,
            ..Default::default()
        }
    }

    pub fn purchase(earned_cents: i64) -> Self {
        Self {
            purchases: 1,
            earned_cents,
            ..Default::default()
        }
    }

    pub fn negated(&self) -> Self {
        Self {
            clicks: -self.clicks,
            signups: -self.signups,
            purchases: -self.purchases,
            earned_cents: -self.earned_cents,
        }
    }

    pub fn touches_earnings(&self) -> bool {
        self.purchases != 0 || self.earned_cents != 0
    }
}
