pub mod billing;
pub mod referral;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing::router().merge(webhooks::router()))
        .nest("/referral", referral::router())
}
