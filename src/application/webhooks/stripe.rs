use serde_json::Value;

use super::{first_string, str_at, string_at, uuid_at};
use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_account::ProviderRef,
        provider_event::{EventKind, ProviderEvent},
    },
};

fn event_kind(event_type: &str) -> Option<EventKind> {
    match event_type {
        "checkout.session.completed" => Some(EventKind::SubscriptionActivated),
        "invoice.paid" => Some(EventKind::PaymentConfirmed),
        "invoice.payment_failed" => Some(EventKind::PaymentFailed),
        "customer.subscription.deleted" => Some(EventKind::SubscriptionCancelled),
        _ => None,
    }
}

pub fn normalize(payload: &Value) -> AppResult<Vec<ProviderEvent>> {
    let event_type = str_at(payload, "/type")
        .ok_or_else(|| AppError::InvalidInput("Stripe webhook without type".into()))?;
    let event_id = str_at(payload, "/id")
        .ok_or_else(|| AppError::InvalidInput("Stripe webhook without id".into()))?;
    let Some(kind) = event_kind(event_type) else {
        tracing::debug!(event_type, "Ignoring Stripe event type");
        return Ok(vec![]);
    };

    let object = payload.pointer("/data/object").unwrap_or(&Value::Null);
    let mut event = match kind {
        EventKind::SubscriptionActivated => {
            let mut event = ProviderEvent::new(
                event_id,
                kind,
                ProviderRef::Stripe {
                    subscription_id: string_at(object, "/subscription"),
                    checkout_session_id: string_at(object, "/id"),
                },
            );
            event.user_id = uuid_at(object, "/client_reference_id");
            event.amount_cents = object.get("amount_total").and_then(Value::as_i64);
            event
        }
        EventKind::SubscriptionCancelled => {
            let mut event = ProviderEvent::new(
                event_id,
                kind,
                ProviderRef::Stripe {
                    subscription_id: string_at(object, "/id"),
                    checkout_session_id: None,
                },
            );
            event.product_id = string_at(object, "/items/data/0/price/id");
            event
        }
        _ => {
            let mut event = ProviderEvent::new(
                event_id,
                kind,
                ProviderRef::Stripe {
                    subscription_id: first_string(
                        object,
                        &["/subscription", "/parent/subscription_details/subscription"],
                    ),
                    checkout_session_id: None,
                },
            );
            event.amount_cents = object.get("amount_paid").and_then(Value::as_i64);
            event
        }
    };
    if event.product_id.is_none() {
        event.product_id = string_at(object, "/lines/data/0/price/id");
    }
    Ok(vec![event])
}
