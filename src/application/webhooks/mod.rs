//! Translation of provider webhook payloads into [`ProviderEvent`]s.
//!
//! Each provider module understands only its own vocabulary. Unknown event
//! types normalize to an empty list; a body that is not the provider's
//! envelope at all is an `InvalidInput` error.

pub mod gocardless;
pub mod paypal;
pub mod radom;
pub mod stripe;

use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, provider_event::ProviderEvent},
};

pub fn normalize(provider: PaymentProvider, body: &str) -> AppResult<Vec<ProviderEvent>> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| AppError::InvalidInput(format!("Malformed webhook body: {e}")))?;

    match provider {
        PaymentProvider::Radom => radom::normalize(&payload, body),
        PaymentProvider::PayPal => paypal::normalize(&payload),
        PaymentProvider::GoCardless => gocardless::normalize(&payload),
        PaymentProvider::Stripe => stripe::normalize(&payload),
    }
}

/// SHA-256 hex of the raw body, the event id for providers that send none.
pub fn body_fingerprint(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

fn str_at<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn string_at(payload: &Value, pointer: &str) -> Option<String> {
    str_at(payload, pointer).map(str::to_string)
}

fn uuid_at(payload: &Value, pointer: &str) -> Option<Uuid> {
    str_at(payload, pointer).and_then(|s| Uuid::parse_str(s).ok())
}

/// First non-empty string among `pointers`.
fn first_string(payload: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| string_at(payload, p))
}

/// Decimal amount in major units (JSON number or string) as integer cents,
/// rounded half up on the third decimal.
fn major_units_to_cents(value: &Value) -> Option<i64> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut fraction_digits = fraction.bytes().map(|b| i64::from(b - b'0'));
    let tenths = fraction_digits.next().unwrap_or(0);
    let hundredths = fraction_digits.next().unwrap_or(0);
    let round_up = fraction_digits.next().unwrap_or(0) >= 5;

    let cents = whole
        .checked_mul(100)?
        .checked_add(tenths * 10 + hundredths + i64::from(round_up))?;
    Some(if negative { -cents } else { cents })
}

fn cents_at(payload: &Value, pointer: &str) -> Option<i64> {
    payload.pointer(pointer).and_then(major_units_to_cents)
}
