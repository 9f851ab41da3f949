//! Inbound provider webhooks.
//!
//! Deliveries are verified before anything is read. After verification the
//! endpoint always acknowledges with 200 so providers do not retry events
//! that failed for reasons a retry cannot fix.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::payment_provider::PaymentProvider,
    ports::webhook_verifier::WebhookHeaders,
};

fn webhook_headers(headers: &HeaderMap) -> WebhookHeaders {
    let mut out = WebhookHeaders::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            out.insert(name.as_str(), value);
        }
    }
    out
}

/// POST /api/billing/webhook/{provider}
async fn handle_webhook(
    State(app_state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let provider: PaymentProvider = provider.parse().map_err(|_| AppError::NotFound)?;
    let report = app_state
        .reconciler
        .handle(provider, &webhook_headers(&headers), &body)
        .await?;
    Ok(Json(report))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/{provider}", post(handle_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::json;
    use uuid::Uuid;

    use crate::domain::entities::{
        account_status::AccountStatus,
        payment_account::{PaymentAccount, ProviderRef},
    };
    use crate::ports::notifier::NotificationTemplate;
    use crate::test_utils::{TestAppStateBuilder, create_test_account, create_test_contact};

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    fn stripe_account(user_id: Uuid) -> PaymentAccount {
        create_test_account(user_id, |a| {
            a.reference = ProviderRef::Stripe {
                subscription_id: Some("sub_123".into()),
                checkout_session_id: Some("cs_123".into()),
            };
            a.product_id = Some("price_pro".into());
        })
    }

    fn subscription_deleted() -> serde_json::Value {
        json!({
            "id": "evt_1",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_123" } }
        })
    }

    #[test]
    fn headers_are_copied_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("Stripe-Signature", HeaderValue::from_static("t=1,v1=abc"));
        let converted = webhook_headers(&headers);
        assert_eq!(converted.get("stripe-signature"), Some("t=1,v1=abc"));
    }

    #[tokio::test]
    async fn unknown_provider_returns_404() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.post("/webhook/venmo").json(&json!({})).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_404() {
        let app_state = TestAppStateBuilder::new()
            .with_provider(PaymentProvider::Stripe)
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.post("/webhook/paypal").json(&json!({})).await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_signature_returns_401_without_mutation() {
        let user_id = Uuid::new_v4();
        let (app_state, mocks) = TestAppStateBuilder::new()
            .with_account(stripe_account(user_id))
            .with_rejecting_provider(PaymentProvider::Stripe)
            .build_with_mocks();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/webhook/stripe")
            .json(&subscription_deleted())
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            mocks.accounts.find_by_user(user_id).unwrap().status,
            AccountStatus::Active
        );
        assert!(mocks.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_applied_once() {
        let user_id = Uuid::new_v4();
        let (app_state, mocks) = TestAppStateBuilder::new()
            .with_account(stripe_account(user_id))
            .with_contact(create_test_contact(user_id))
            .with_provider(PaymentProvider::Stripe)
            .build_with_mocks();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let first = server
            .post("/webhook/stripe")
            .json(&subscription_deleted())
            .await;
        first.assert_status(StatusCode::OK);
        let report: serde_json::Value = first.json();
        assert_eq!(report["applied"], 1);
        assert_eq!(
            mocks.accounts.find_by_user(user_id).unwrap().status,
            AccountStatus::Cancelled
        );

        let replay = server
            .post("/webhook/stripe")
            .json(&subscription_deleted())
            .await;
        replay.assert_status(StatusCode::OK);
        let report: serde_json::Value = replay.json();
        assert_eq!(report["duplicates"], 1);

        assert_eq!(
            mocks.notifier.sent_templates(),
            vec![NotificationTemplate::Goodbye]
        );
    }

    #[tokio::test]
    async fn unreadable_payload_is_acknowledged() {
        let app_state = TestAppStateBuilder::new()
            .with_provider(PaymentProvider::Stripe)
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.post("/webhook/stripe").text("not json").await;

        response.assert_status(StatusCode::OK);
        let report: serde_json::Value = response.json();
        assert_eq!(report["received"], 0);
    }

    #[tokio::test]
    async fn unmatched_event_is_dropped_with_200() {
        let app_state = TestAppStateBuilder::new()
            .with_provider(PaymentProvider::Stripe)
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/webhook/stripe")
            .json(&subscription_deleted())
            .await;

        response.assert_status(StatusCode::OK);
        let report: serde_json::Value = response.json();
        assert_eq!(report["dropped"], 1);
    }
}
