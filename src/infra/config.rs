use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use strum::{AsRefStr, Display, EnumString};
use time::Duration;
use url::Url;

/// Deployment mode. Non-production modes enable test networks at Radom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Mode {
    Development,
    Staging,
    Production,
}

impl Mode {
    pub fn is_production(&self) -> bool {
        matches!(self, Mode::Production)
    }
}

pub struct RadomConfig {
    pub access_token: SecretString,
    /// Shared key Radom sends in `radom-verification-key`
    pub webhook_key: SecretString,
}

pub struct PayPalConfig {
    /// API base, e.g. https://api-m.paypal.com/v1
    pub domain: Url,
    pub client_id: String,
    pub client_secret: SecretString,
    pub webhook_id: String,
}

pub struct GoCardlessConfig {
    /// API base, e.g. https://api.gocardless.com
    pub domain: Url,
    pub access_token: SecretString,
    pub webhook_secret: SecretString,
}

pub struct StripeConfig {
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
}

/// Loops transactional email credentials and template ids.
pub struct LoopsConfig {
    pub access_token: SecretString,
    pub welcome_template_id: String,
    pub payment_issue_template_id: String,
    pub goodbye_template_id: String,
}

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub access_token_ttl: Duration,
    /// Base URL of the web app; checkouts return to `<webapp_domain>/dashboard`.
    pub webapp_domain: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub redis_url: String,
    pub database_url: String,
    pub checkout_metadata_ttl_secs: u64,
    pub checkout_currency: String,
    /// Allow a payout request equal to the whole balance.
    pub payout_allow_full_balance: bool,
    pub mode: Mode,
    // A provider section is present only when all of its credentials are set.
    pub radom: Option<RadomConfig>,
    pub paypal: Option<PayPalConfig>,
    pub gocardless: Option<GoCardlessConfig>,
    pub stripe: Option<StripeConfig>,
    pub loops: Option<LoopsConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 86_400);

        let webapp_domain: Url = get_env::<String>("WEBAPP_DOMAIN")
            .parse()
            .context("WEBAPP_DOMAIN must be a valid URL")?;
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .context("CORS_ORIGIN must be a valid header value")?;

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", String::from("127.0.0.1:3001"))
            .parse()
            .context("BIND_ADDR must be a socket address")?;
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let database_url: String = get_env("DATABASE_URL");
        // 30 days, one billing interval
        let checkout_metadata_ttl_secs: u64 =
            get_env_default("CHECKOUT_METADATA_TTL_SECS", 2_592_000);
        let checkout_currency: String = get_env_default("CHECKOUT_CURRENCY", "GBP".to_string());
        let payout_allow_full_balance: bool = get_env_default("PAYOUT_ALLOW_FULL_BALANCE", false);
        let mode: Mode = get_env_default("MODE", "production".to_string())
            .parse()
            .context("MODE must be development, staging or production")?;

        let radom = match (optional("RADOM_ACCESS_TOKEN"), optional("RADOM_WEBHOOK_KEY")) {
            (Some(access_token), Some(webhook_key)) => Some(RadomConfig {
                access_token: SecretString::new(access_token.into()),
                webhook_key: SecretString::new(webhook_key.into()),
            }),
            _ => None,
        };

        let paypal = match (
            optional("PAYPAL_DOMAIN"),
            optional("PAYPAL_CLIENT_ID"),
            optional("PAYPAL_CLIENT_SECRET"),
            optional("PAYPAL_WEBHOOK_ID"),
        ) {
            (Some(domain), Some(client_id), Some(client_secret), Some(webhook_id)) => {
                Some(PayPalConfig {
                    domain: domain.parse().context("PAYPAL_DOMAIN must be a valid URL")?,
                    client_id,
                    client_secret: SecretString::new(client_secret.into()),
                    webhook_id,
                })
            }
            _ => None,
        };

        let gocardless = match (
            optional("GOCARDLESS_DOMAIN"),
            optional("GOCARDLESS_ACCESS_TOKEN"),
            optional("GOCARDLESS_WEBHOOK_SECRET"),
        ) {
            (Some(domain), Some(access_token), Some(webhook_secret)) => Some(GoCardlessConfig {
                domain: domain
                    .parse()
                    .context("GOCARDLESS_DOMAIN must be a valid URL")?,
                access_token: SecretString::new(access_token.into()),
                webhook_secret: SecretString::new(webhook_secret.into()),
            }),
            _ => None,
        };

        let stripe = match (optional("STRIPE_SECRET_KEY"), optional("STRIPE_WEBHOOK_SECRET")) {
            (Some(secret_key), Some(webhook_secret)) => Some(StripeConfig {
                secret_key: SecretString::new(secret_key.into()),
                webhook_secret: SecretString::new(webhook_secret.into()),
            }),
            _ => None,
        };

        let loops = match (
            optional("LOOPS_ACCESS_TOKEN"),
            optional("LOOPS_WELCOME_TEMPLATE_ID"),
            optional("LOOPS_PAYMENT_ISSUE_TEMPLATE_ID"),
            optional("LOOPS_GOODBYE_TEMPLATE_ID"),
        ) {
            (Some(access_token), Some(welcome), Some(payment_issue), Some(goodbye)) => {
                Some(LoopsConfig {
                    access_token: SecretString::new(access_token.into()),
                    welcome_template_id: welcome,
                    payment_issue_template_id: payment_issue,
                    goodbye_template_id: goodbye,
                })
            }
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            webapp_domain,
            cors_origin,
            bind_addr,
            redis_url,
            database_url,
            checkout_metadata_ttl_secs,
            checkout_currency,
            payout_allow_full_balance,
            mode,
            radom,
            paypal,
            gocardless,
            stripe,
            loops,
        })
    }
}

/// Unset and empty variables are both treated as absent.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
