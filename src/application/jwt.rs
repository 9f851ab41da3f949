use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// Access token claims shared with the account service that issues them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidCredentials)
    }
}

pub fn issue(user_id: Uuid, secret: &SecretString, ttl: Duration) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl.whole_seconds(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify(token: &str, secret: &SecretString) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AppError::InvalidCredentials
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.to_string().into())
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, &secret("test-secret"), Duration::hours(1)).unwrap();
        let claims = verify(&token, &secret("test-secret")).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = issue(Uuid::new_v4(), &secret("a"), Duration::hours(1)).unwrap();
        assert!(matches!(
            verify(&token, &secret("b")),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let token = issue(Uuid::new_v4(), &secret("a"), Duration::hours(-2)).unwrap();
        assert!(verify(&token, &secret("a")).is_err());
    }
}
