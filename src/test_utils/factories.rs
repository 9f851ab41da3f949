//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    domain::entities::{
        account_status::AccountStatus,
        payment_account::{PaymentAccount, ProviderRef},
        plan::Plan,
    },
    ports::account_directory::AccountContact,
};

/// Create an active Radom-backed payment account on the "pro" plan.
pub fn create_test_account(
    user_id: Uuid,
    overrides: impl FnOnce(&mut PaymentAccount),
) -> PaymentAccount {
    let mut account = PaymentAccount {
        id: Uuid::new_v4(),
        user_id,
        reference: ProviderRef::Radom {
            subscription_id: Some(format!("sub_{}", Uuid::new_v4().simple())),
            checkout_session_id: None,
        },
        amount_cents: 2000,
        plan_id: Some("pro".to_string()),
        product_id: Some("rad-prod-pro".to_string()),
        referral_id: None,
        status: AccountStatus::Active,
        mandate_count: 0,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut account);
    account
}

/// Create the "pro" catalog plan, known to Radom, PayPal and Stripe.
pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        plan_id: "pro".to_string(),
        name: "Pro".to_string(),
        tag: Some("popular".to_string()),
        description: Some("Everything included".to_string()),
        features: vec!["deepfake".to_string()],
        price_cents: 2000,
        currency: "GBP".to_string(),
        radom_product_id: Some("rad-prod-pro".to_string()),
        paypal_plan_id: Some("P-PRO".to_string()),
        stripe_price_id: Some("price_pro".to_string()),
    };
    overrides(&mut plan);
    plan
}

pub fn create_test_contact(user_id: Uuid) -> AccountContact {
    AccountContact {
        user_id,
        email: format!("user-{}@example.com", user_id.simple()),
        username: Some("tester".to_string()),
    }
}

/// Returns a fixed test datetime for reproducible tests.
pub fn test_datetime() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2026, 1, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}
