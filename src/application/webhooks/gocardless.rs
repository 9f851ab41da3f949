use serde_json::Value;

use super::{first_string, str_at, string_at};
use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_account::ProviderRef,
        provider_event::{EventKind, ProviderEvent},
    },
};

fn event_kind(resource_type: &str, action: &str) -> Option<EventKind> {
    match (resource_type, action) {
        ("mandates", "created") | ("billing_requests", "fulfilled") => {
            Some(EventKind::MandateCreated)
        }
        ("payments", "confirmed" | "paid_out") => Some(EventKind::PaymentConfirmed),
        ("payments", "failed") | ("mandates", "cancelled" | "failed" | "expired") => {
            Some(EventKind::PaymentFailed)
        }
        ("payments", "charged_back") => Some(EventKind::PaymentRefunded),
        ("subscriptions", "cancelled") => Some(EventKind::SubscriptionCancelled),
        ("subscriptions", "finished") => Some(EventKind::SubscriptionExpired),
        _ => None,
    }
}

/// GoCardless batches several events into one delivery.
pub fn normalize(payload: &Value) -> AppResult<Vec<ProviderEvent>> {
    let events = payload
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::InvalidInput("GoCardless webhook without events".into()))?;

    Ok(events.iter().filter_map(normalize_event).collect())
}

fn normalize_event(event: &Value) -> Option<ProviderEvent> {
    let event_id = str_at(event, "/id")?;
    let resource_type = str_at(event, "/resource_type").unwrap_or_default();
    let action = str_at(event, "/action").unwrap_or_default();
    let Some(kind) = event_kind(resource_type, action) else {
        tracing::debug!(event_id, resource_type, action, "Ignoring GoCardless event");
        return None;
    };

    let reference = ProviderRef::GoCardless {
        subscription_id: string_at(event, "/links/subscription"),
        billing_request_id: string_at(event, "/links/billing_request"),
        mandate_id: first_string(
            event,
            &["/links/mandate", "/links/mandate_request_mandate"],
        ),
    };
    Some(ProviderEvent::new(event_id, kind, reference))
}
