use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Status of a payment account.
///
/// `Active` is the only state that grants plan features. `Disabled` is a hold
/// (awaiting first authorization, or after a failed renewal) and `Cancelled`
/// ends the subscription instance.
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
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[derive(Default)]
pub enum AccountStatus {
    #[default]
    Disabled,
    Active,
    Cancelled,
}

impl AccountStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }

    /// Cancelled is terminal for a subscription instance. A new subscription
    /// replaces the instance through an upsert, not a status transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccountStatus::Cancelled)
    }

    /// Valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [AccountStatus] {
        match self {
            AccountStatus::Disabled => &[AccountStatus::Active, AccountStatus::Cancelled],
            AccountStatus::Active => &[AccountStatus::Disabled, AccountStatus::Cancelled],
            AccountStatus::Cancelled => &[],
        }
    }

    /// Check if transition to the given state is valid
    pub fn can_transition_to(&self, new_state: AccountStatus) -> bool {
        self.valid_transitions().contains(&new_state)
    }
}
