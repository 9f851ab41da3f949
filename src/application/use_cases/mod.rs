pub mod billing;
pub mod checkout;
pub mod payment_account;
pub mod provider_registry;
pub mod reconciler;
pub mod referral;
