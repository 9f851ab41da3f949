use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::{AppError, AppResult},
    use_cases::referral::PayoutRequest,
    validators::is_valid_referral_id,
};

#[derive(Deserialize)]
struct ReferralPayload {
    referral_id: String,
}

impl ReferralPayload {
    fn referral_id(&self) -> AppResult<&str> {
        checked_referral_id(&self.referral_id)
    }
}

#[derive(Serialize)]
struct SignupResponse {
    counted: bool,
}

#[derive(Serialize)]
struct UnpaidEarningsResponse {
    amount_cents: i64,
}

fn checked_referral_id(referral_id: &str) -> AppResult<&str> {
    let referral_id = referral_id.trim();
    if !is_valid_referral_id(referral_id) {
        return Err(AppError::InvalidInput("Malformed referral id".into()));
    }
    Ok(referral_id)
}

/// POST /api/referral/generate-link
async fn generate_link(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    let referral = app_state.referral_use_cases.generate_link(host_id).await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

/// DELETE /api/referral/link/{referral_id}
async fn remove_link(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(referral_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    app_state
        .referral_use_cases
        .remove_link(host_id, checked_referral_id(&referral_id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/referral/link
async fn newest_link(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    let referral = app_state
        .referral_use_cases
        .get_newest_link(host_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(referral))
}

/// POST /api/referral/link-clicked
/// Public: visitors following a link are not signed in yet.
async fn link_clicked(
    State(app_state): State<AppState>,
    Json(payload): Json<ReferralPayload>,
) -> AppResult<impl IntoResponse> {
    app_state
        .referral_use_cases
        .link_clicked(payload.referral_id()?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/referral/signup
async fn log_signup(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<ReferralPayload>,
) -> AppResult<impl IntoResponse> {
    let guest_id = current_user(&jar, &headers, &app_state)?;
    let counted = app_state
        .referral_use_cases
        .log_signup(payload.referral_id()?, guest_id)
        .await?;
    Ok(Json(SignupResponse { counted }))
}

/// GET /api/referral/unpaid-earnings
async fn unpaid_earnings(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    let amount_cents = app_state
        .referral_use_cases
        .get_unpaid_earnings(host_id)
        .await?;
    Ok(Json(UnpaidEarningsResponse { amount_cents }))
}

/// GET /api/referral/statistics
async fn statistics(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    let stats = app_state.referral_use_cases.get_statistics(host_id).await?;
    Ok(Json(stats))
}

/// POST /api/referral/request-payout
async fn request_payout(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<PayoutRequest>,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    let submission = app_state
        .referral_use_cases
        .request_payout(host_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/referral/payouts/history
async fn payout_history(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let host_id = current_user(&jar, &headers, &app_state)?;
    let history = app_state
        .referral_use_cases
        .get_payout_history(host_id)
        .await?;
    Ok(Json(history))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-link", post(generate_link))
        .route("/link", get(newest_link))
        .route("/link/{referral_id}", delete(remove_link))
        .route("/link-clicked", post(link_clicked))
        .route("/signup", post(log_signup))
        .route("/unpaid-earnings", get(unpaid_earnings))
        .route("/statistics", get(statistics))
        .route("/request-payout", post(request_payout))
        .route("/payouts/history", get(payout_history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use serde_json::json;
    use uuid::Uuid;

    use crate::adapters::http::auth::ACCESS_TOKEN_COOKIE;
    use crate::domain::entities::referral::{Earnings, Referral};
    use crate::test_utils::{TestAppStateBuilder, test_access_token, test_datetime};

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    fn auth_cookie(user_id: Uuid) -> Cookie<'static> {
        Cookie::new(ACCESS_TOKEN_COOKIE, test_access_token(user_id))
    }

    fn referral(referral_id: &str, host_id: Uuid) -> Referral {
        Referral {
            referral_id: referral_id.to_string(),
            host_id,
            guest_ids: vec![],
            created_at: Some(test_datetime()),
        }
    }

    fn earnings(user_id: Uuid, amount_cents: i64) -> Earnings {
        Earnings {
            user_id,
            amount_cents,
            total_purchases: 1,
        }
    }

    #[tokio::test]
    async fn generate_link_requires_auth() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.post("/generate-link").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn generated_link_becomes_newest() {
        let host_id = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let created = server
            .post("/generate-link")
            .add_cookie(auth_cookie(host_id))
            .await;
        created.assert_status(StatusCode::CREATED);
        let created: serde_json::Value = created.json();

        let newest = server.get("/link").add_cookie(auth_cookie(host_id)).await;
        newest.assert_status(StatusCode::OK);
        let newest: serde_json::Value = newest.json();
        assert_eq!(newest["referral_id"], created["referral_id"]);
    }

    #[tokio::test]
    async fn remove_link_of_other_host_returns_404() {
        let host_id = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new()
            .with_referral(referral("link-a", host_id))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .delete("/link/link-a")
            .add_cookie(auth_cookie(Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let response = server
            .delete("/link/link-a")
            .add_cookie(auth_cookie(host_id))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn link_clicked_is_public() {
        let app_state = TestAppStateBuilder::new()
            .with_referral(referral("link-a", Uuid::new_v4()))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/link-clicked")
            .json(&json!({ "referral_id": "link-a" }))
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn link_clicked_rejects_malformed_id() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/link-clicked")
            .json(&json!({ "referral_id": "../etc" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clicks_show_up_in_statistics() {
        let host_id = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new()
            .with_referral(referral("link-a", host_id))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        for _ in 0..2 {
            server
                .post("/link-clicked")
                .json(&json!({ "referral_id": "link-a" }))
                .await
                .assert_status(StatusCode::NO_CONTENT);
        }

        let response = server
            .get("/statistics")
            .add_cookie(auth_cookie(host_id))
            .await;
        response.assert_status(StatusCode::OK);
        let stats: Vec<serde_json::Value> = response.json();
        assert_eq!(stats.len(), 3);
        assert!(stats.iter().all(|s| s["referral_link_clicks"] == 2));
    }

    #[tokio::test]
    async fn signup_counts_guest_once() {
        let host_id = Uuid::new_v4();
        let guest_id = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new()
            .with_referral(referral("link-a", host_id))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let first = server
            .post("/signup")
            .add_cookie(auth_cookie(guest_id))
            .json(&json!({ "referral_id": "link-a" }))
            .await;
        first.assert_json(&json!({ "counted": true }));

        let second = server
            .post("/signup")
            .add_cookie(auth_cookie(guest_id))
            .json(&json!({ "referral_id": "link-a" }))
            .await;
        second.assert_json(&json!({ "counted": false }));
    }

    #[tokio::test]
    async fn host_cannot_sign_up_through_own_link() {
        let host_id = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new()
            .with_referral(referral("link-a", host_id))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/signup")
            .add_cookie(auth_cookie(host_id))
            .json(&json!({ "referral_id": "link-a" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unpaid_earnings_defaults_to_zero() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/unpaid-earnings")
            .add_cookie(auth_cookie(Uuid::new_v4()))
            .await;

        response.assert_json(&json!({ "amount_cents": 0 }));
    }

    #[tokio::test]
    async fn payout_of_full_balance_is_rejected_by_default() {
        let host_id = Uuid::new_v4();
        let (app_state, mocks) = TestAppStateBuilder::new().build_with_mocks();
        mocks.ledger.seed_earnings(earnings(host_id, 400));
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/request-payout")
            .add_cookie(auth_cookie(host_id))
            .json(&json!({
                "paypal_email": "host@example.com",
                "amount_cents": 400,
                "scheduled_time": "2026-02-01T10:00:00"
            }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(mocks.payouts.submissions().is_empty());
    }

    #[tokio::test]
    async fn payout_below_balance_is_submitted() {
        let host_id = Uuid::new_v4();
        let (app_state, mocks) = TestAppStateBuilder::new().build_with_mocks();
        mocks.ledger.seed_earnings(earnings(host_id, 400));
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/request-payout")
            .add_cookie(auth_cookie(host_id))
            .json(&json!({
                "paypal_email": "host@example.com",
                "amount_cents": 300,
                "scheduled_time": "2026-02-01T10:00:00"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let submissions = mocks.payouts.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].amount_cents, 300);
    }

    #[tokio::test]
    async fn full_balance_payout_allowed_when_configured() {
        let host_id = Uuid::new_v4();
        let (app_state, mocks) = TestAppStateBuilder::new()
            .with_full_balance_payouts()
            .build_with_mocks();
        mocks.ledger.seed_earnings(earnings(host_id, 400));
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/request-payout")
            .add_cookie(auth_cookie(host_id))
            .json(&json!({
                "paypal_email": "host@example.com",
                "amount_cents": 400,
                "scheduled_time": "2026-02-01T10:00:00"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn payout_history_is_empty_for_new_host() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/payouts/history")
            .add_cookie(auth_cookie(Uuid::new_v4()))
            .await;

        response.assert_status(StatusCode::OK);
        response.assert_json(&json!([]));
    }
}
