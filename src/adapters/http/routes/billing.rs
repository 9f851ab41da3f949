use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, auth::current_user},
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, plan::ProductLookup},
    use_cases::billing::CreateCheckoutInput,
};

#[derive(Deserialize)]
struct HasPermissionsPayload {
    feature: String,
}

#[derive(Serialize)]
struct HasPermissionsResponse {
    allowed: bool,
}

#[derive(Serialize)]
struct CancelPlanResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ProductQuery {
    provider: PaymentProvider,
    product_id: String,
}

/// POST /api/billing/checkout
async fn create_checkout(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<CreateCheckoutInput>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &headers, &app_state)?;
    let session = app_state
        .billing_use_cases
        .create_checkout(user_id, payload)
        .await?;
    Ok(Json(session))
}

/// POST /api/billing/cancel-plan
///
/// Only reports whether the provider accepted the request; the account
/// changes once the provider's cancellation webhook arrives.
async fn cancel_plan(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &headers, &app_state)?;
    let success = app_state.billing_use_cases.cancel_plan(user_id).await;
    Ok(Json(CancelPlanResponse { success }))
}

/// GET /api/billing/available-plans
async fn available_plans(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &headers, &app_state)?;
    let plans = app_state.billing_use_cases.available_plans(user_id).await?;
    Ok(Json(plans))
}

/// GET /api/billing/account
async fn get_account(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &headers, &app_state)?;
    let account = app_state
        .billing_use_cases
        .get_account(user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(account))
}

/// POST /api/billing/has-permissions
async fn has_permissions(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<HasPermissionsPayload>,
) -> AppResult<impl IntoResponse> {
    let user_id = current_user(&jar, &headers, &app_state)?;
    let allowed = app_state
        .billing_use_cases
        .has_permissions(user_id, payload.feature.trim())
        .await?;
    Ok(Json(HasPermissionsResponse { allowed }))
}

/// GET /api/billing/product?provider=..&product_id=..
async fn get_product(
    State(app_state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<ProductQuery>,
) -> AppResult<impl IntoResponse> {
    current_user(&jar, &headers, &app_state)?;
    let plan = app_state
        .billing_use_cases
        .get_product(&ProductLookup::new(query.provider, query.product_id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(plan))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/cancel-plan", post(cancel_plan))
        .route("/available-plans", get(available_plans))
        .route("/account", get(get_account))
        .route("/has-permissions", post(has_permissions))
        .route("/product", get(get_product))
}
