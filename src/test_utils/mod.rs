//! Test utilities for use case and HTTP tests.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory repository implementations for mocking persistence
//! - Stub payment providers, webhook verifiers and a recording notifier
//! - `TestAppStateBuilder` for driving the router through axum-test

mod account_mocks;
mod app_state_builder;
mod factories;
mod provider_mocks;
mod referral_mocks;

pub use account_mocks::*;
pub use app_state_builder::*;
pub use factories::*;
pub use provider_mocks::*;
pub use referral_mocks::*;
