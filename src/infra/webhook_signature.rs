//! Symmetric-key webhook verification for Radom, GoCardless and Stripe.
//!
//! PayPal signs with certificates and is verified through its API, see
//! `paypal_client::PayPalWebhookVerifier`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::{
    app_error::{AppError, AppResult},
    ports::webhook_verifier::{WebhookHeaders, WebhookVerifier},
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a Stripe signature timestamp.
const STRIPE_TOLERANCE_SECS: i64 = 300;

fn hmac_hex(secret: &str, content: &str) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(content.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Radom
// ============================================================================

/// Radom echoes a shared verification key in a header.
pub struct RadomWebhookVerifier {
    key: SecretString,
}

impl RadomWebhookVerifier {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }
}

#[async_trait]
impl WebhookVerifier for RadomWebhookVerifier {
    async fn verify(&self, headers: &WebhookHeaders, _body: &str) -> AppResult<()> {
        let provided = headers
            .get("radom-verification-key")
            .ok_or(AppError::InvalidSignature)?;
        if constant_time_compare(provided, self.key.expose_secret()) {
            Ok(())
        } else {
            Err(AppError::InvalidSignature)
        }
    }
}

// ============================================================================
// GoCardless
// ============================================================================

/// `Webhook-Signature` is the hex HMAC-SHA256 of the raw body.
pub struct GoCardlessWebhookVerifier {
    secret: SecretString,
}

impl GoCardlessWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl WebhookVerifier for GoCardlessWebhookVerifier {
    async fn verify(&self, headers: &WebhookHeaders, body: &str) -> AppResult<()> {
        let provided = headers
            .get("webhook-signature")
            .ok_or(AppError::InvalidSignature)?;
        let expected = hmac_hex(self.secret.expose_secret(), body)?;
        if constant_time_compare(provided, &expected) {
            Ok(())
        } else {
            Err(AppError::InvalidSignature)
        }
    }
}

// ============================================================================
// Stripe
// ============================================================================

pub struct StripeWebhookVerifier {
    secret: SecretString,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl WebhookVerifier for StripeWebhookVerifier {
    async fn verify(&self, headers: &WebhookHeaders, body: &str) -> AppResult<()> {
        let header = headers
            .get("stripe-signature")
            .ok_or(AppError::InvalidSignature)?;
        verify_stripe_signature(
            body,
            header,
            self.secret.expose_secret(),
            chrono::Utc::now().timestamp(),
        )
    }
}

/// Check a `t=<timestamp>,v1=<hex>` header against the payload.
pub fn verify_stripe_signature(
    payload: &str,
    signature_header: &str,
    webhook_secret: &str,
    now: i64,
) -> AppResult<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
    if signatures.is_empty() {
        return Err(AppError::InvalidSignature);
    }

    let expected = hmac_hex(webhook_secret, &format!("{timestamp}.{payload}"))?;
    if !signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        return Err(AppError::InvalidSignature);
    }

    let ts: i64 = timestamp.parse().map_err(|_| AppError::InvalidSignature)?;
    if (now - ts).abs() > STRIPE_TOLERANCE_SECS {
        tracing::warn!(timestamp = ts, "Stripe signature timestamp outside tolerance");
        return Err(AppError::InvalidSignature);
    }
    Ok(())
}

/// Produce a Stripe-style signature header. Used to sign test deliveries.
pub fn sign_webhook_payload(secret: &str, timestamp: i64, body: &str) -> AppResult<String> {
    let signature = hmac_hex(secret, &format!("{timestamp}.{body}"))?;
    Ok(format!("t={timestamp},v1={signature}"))
}

/// Hex HMAC-SHA256 of a body, as GoCardless sends it.
pub fn sign_body(secret: &str, body: &str) -> AppResult<String> {
    hmac_hex(secret, body)
}
