pub mod account_status;
pub mod payment_account;
pub mod payment_provider;
pub mod plan;
pub mod provider_event;
pub mod referral;
pub mod statistics;
