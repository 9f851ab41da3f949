use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// User id from the `access_token` cookie, or from a Bearer token when no cookie is sent.
pub fn current_user(jar: &CookieJar, headers: &HeaderMap, app_state: &AppState) -> AppResult<Uuid> {
    let token = match jar.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) => cookie.value().to_owned(),
        None => bearer_token(headers).ok_or(AppError::InvalidCredentials)?,
    };

    jwt::verify(&token, &app_state.config.jwt_secret)?.user_id()
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
