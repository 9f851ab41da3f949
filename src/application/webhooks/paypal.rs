use serde_json::Value;

use super::{cents_at, first_string, str_at, string_at};
use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_account::ProviderRef,
        provider_event::{EventKind, ProviderEvent},
    },
};

fn event_kind(event_type: &str) -> Option<EventKind> {
    match event_type {
        "BILLING.SUBSCRIPTION.ACTIVATED" => Some(EventKind::SubscriptionActivated),
        "PAYMENT.SALE.COMPLETED" => Some(EventKind::PaymentConfirmed),
        "BILLING.SUBSCRIPTION.PAYMENT.FAILED" | "BILLING.SUBSCRIPTION.SUSPENDED" => {
            Some(EventKind::PaymentFailed)
        }
        "BILLING.SUBSCRIPTION.EXPIRED" => Some(EventKind::SubscriptionExpired),
        "BILLING.SUBSCRIPTION.CANCELLED" => Some(EventKind::SubscriptionCancelled),
        "PAYMENT.SALE.REFUNDED" | "PAYMENT.SALE.REVERSED" | "PAYMENT.SALE.DENIED" => {
            Some(EventKind::PaymentRefunded)
        }
        _ => None,
    }
}

pub fn normalize(payload: &Value) -> AppResult<Vec<ProviderEvent>> {
    let event_type = str_at(payload, "/event_type")
        .ok_or_else(|| AppError::InvalidInput("PayPal webhook without event_type".into()))?;
    let event_id = str_at(payload, "/id")
        .ok_or_else(|| AppError::InvalidInput("PayPal webhook without id".into()))?;
    let Some(kind) = event_kind(event_type) else {
        tracing::debug!(event_type, "Ignoring PayPal event type");
        return Ok(vec![]);
    };

    // Subscription resources carry their own id and `custom_id`; sale
    // resources point at the subscription through `billing_agreement_id`.
    let reference = if event_type.starts_with("BILLING.SUBSCRIPTION.") {
        ProviderRef::PayPal {
            subscription_id: string_at(payload, "/resource/id"),
            checkout_id: string_at(payload, "/resource/custom_id"),
        }
    } else {
        ProviderRef::PayPal {
            subscription_id: string_at(payload, "/resource/billing_agreement_id"),
            checkout_id: first_string(payload, &["/resource/custom", "/resource/custom_id"]),
        }
    };

    let mut event = ProviderEvent::new(event_id, kind, reference);
    event.product_id = string_at(payload, "/resource/plan_id");
    event.amount_cents = match kind {
        EventKind::SubscriptionActivated => {
            cents_at(payload, "/resource/billing_info/last_payment/amount/value")
        }
        EventKind::PaymentConfirmed => cents_at(payload, "/resource/amount/total"),
        _ => None,
    };
    Ok(vec![event])
}
