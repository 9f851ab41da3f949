use serde_json::Value;
use uuid::Uuid;

use super::{body_fingerprint, cents_at, first_string, str_at, string_at};
use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_account::ProviderRef,
        provider_event::{EventKind, ProviderEvent},
    },
};

fn event_kind(event_type: &str) -> Option<EventKind> {
    match event_type {
        "newSubscription" => Some(EventKind::SubscriptionActivated),
        "paymentTransactionConfirmed" => Some(EventKind::PaymentConfirmed),
        "subscriptionPaymentOverdue" => Some(EventKind::PaymentFailed),
        "subscriptionExpired" => Some(EventKind::SubscriptionExpired),
        "subscriptionCancelled" => Some(EventKind::SubscriptionCancelled),
        _ => None,
    }
}

/// Radom sends one event per delivery, without an event id.
pub fn normalize(payload: &Value, body: &str) -> AppResult<Vec<ProviderEvent>> {
    let event_type = str_at(payload, "/eventType")
        .ok_or_else(|| AppError::InvalidInput("Radom webhook without eventType".into()))?;
    let Some(kind) = event_kind(event_type) else {
        tracing::debug!(event_type, "Ignoring Radom event type");
        return Ok(vec![]);
    };

    // Event data lives under a key named after the event type.
    let data = format!("/eventData/{event_type}");
    let subscription_pointer = format!("{data}/subscriptionId");
    let reference = ProviderRef::Radom {
        subscription_id: first_string(
            payload,
            &[
                subscription_pointer.as_str(),
                "/radomData/subscription/subscriptionId",
            ],
        ),
        checkout_session_id: string_at(payload, "/radomData/checkoutSession/checkoutSessionId"),
    };

    let mut event = ProviderEvent::new(body_fingerprint(body), kind, reference);
    event.amount_cents = cents_at(payload, &format!("{data}/amount"));
    event.product_id = string_at(payload, &format!("{data}/tags/productId"));
    event.user_id = metadata_user_id(payload);
    Ok(vec![event])
}

/// `user_id` entry of the checkout session's key/value metadata.
fn metadata_user_id(payload: &Value) -> Option<Uuid> {
    payload
        .pointer("/radomData/checkoutSession/metadata")
        .and_then(Value::as_array)?
        .iter()
        .find(|item| item.get("key").and_then(Value::as_str) == Some("user_id"))
        .and_then(|item| item.get("value").and_then(Value::as_str))
        .and_then(|value| Uuid::parse_str(value).ok())
}
