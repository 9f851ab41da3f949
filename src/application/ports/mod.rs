pub mod account_directory;
pub mod notifier;
pub mod payment_provider;
pub mod plan_catalog;
pub mod webhook_verifier;
