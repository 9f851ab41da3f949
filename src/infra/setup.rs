use crate::{
    adapters::{
        email::loops::{LogOnlyNotifier, LoopsNotifier},
        http::app_state::AppState,
    },
    infra::{
        checkout_sessions::RedisCheckoutSessionStore,
        config::AppConfig,
        gocardless_client::GoCardlessClient,
        paypal_client::{PayPalClient, PayPalWebhookVerifier},
        postgres_persistence,
        radom_client::RadomClient,
        stripe_client::StripeClient,
        webhook_signature::{GoCardlessWebhookVerifier, RadomWebhookVerifier, StripeWebhookVerifier},
    },
    ports::notifier::Notifier,
    use_cases::{
        billing::{BillingUseCases, CheckoutSettings},
        checkout::CheckoutSessionStore,
        payment_account::{PaymentAccountRepo, PaymentAccountUseCases},
        provider_registry::ProviderRegistry,
        reconciler::WebhookReconciler,
        referral::{PayoutPolicy, ReferralUseCases},
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    let sessions: Arc<dyn CheckoutSessionStore> =
        Arc::new(RedisCheckoutSessionStore::new(&config.redis_url).await?);

    let registry = build_registry(&config)?;
    if registry.configured().is_empty() {
        tracing::warn!("No payment provider configured, checkouts and webhooks are disabled");
    }

    let notifier: Arc<dyn Notifier> = match &config.loops {
        Some(loops) => Arc::new(LoopsNotifier::new(loops)?),
        None => {
            tracing::warn!("LOOPS_* not set, notifications are only logged");
            Arc::new(LogOnlyNotifier)
        }
    };

    let account_use_cases =
        PaymentAccountUseCases::new(postgres_arc.clone() as Arc<dyn PaymentAccountRepo>);
    let referral_use_cases = ReferralUseCases::new(
        postgres_arc.clone(),
        postgres_arc.clone(),
        postgres_arc.clone(),
        PayoutPolicy {
            allow_full_balance: config.payout_allow_full_balance,
        },
    );

    let billing_use_cases = BillingUseCases::new(
        account_use_cases.clone(),
        postgres_arc.clone(),
        postgres_arc.clone(),
        postgres_arc.clone(),
        sessions.clone(),
        registry.clone(),
        CheckoutSettings {
            webapp_domain: config.webapp_domain.to_string(),
            metadata_ttl_secs: config.checkout_metadata_ttl_secs,
        },
    );

    let reconciler = WebhookReconciler::new(
        account_use_cases,
        referral_use_cases.clone(),
        sessions,
        postgres_arc.clone(),
        postgres_arc.clone(),
        notifier,
        postgres_arc,
        registry,
    );

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
        referral_use_cases: Arc::new(referral_use_cases),
        reconciler: Arc::new(reconciler),
    })
}

/// Register every provider whose credentials are configured.
fn build_registry(config: &AppConfig) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    if let Some(radom) = &config.radom {
        let client = RadomClient::new(
            radom.access_token.clone(),
            config.checkout_currency.clone(),
            config.mode,
        )?;
        registry = registry.with_provider(
            Arc::new(client),
            Arc::new(RadomWebhookVerifier::new(radom.webhook_key.clone())),
        );
    }

    if let Some(paypal) = &config.paypal {
        let client = PayPalClient::new(
            paypal.domain.clone(),
            paypal.client_id.clone(),
            paypal.client_secret.clone(),
        )?;
        let verifier = PayPalWebhookVerifier::new(client.clone(), paypal.webhook_id.clone());
        registry = registry.with_provider(Arc::new(client), Arc::new(verifier));
    }

    if let Some(gocardless) = &config.gocardless {
        let client =
            GoCardlessClient::new(gocardless.domain.clone(), gocardless.access_token.clone())?;
        registry = registry.with_provider(
            Arc::new(client),
            Arc::new(GoCardlessWebhookVerifier::new(
                gocardless.webhook_secret.clone(),
            )),
        );
    }

    if let Some(stripe) = &config.stripe {
        let client = StripeClient::new(stripe.secret_key.clone())?;
        registry = registry.with_provider(
            Arc::new(client),
            Arc::new(StripeWebhookVerifier::new(stripe.webhook_secret.clone())),
        );
    }

    tracing::info!(providers = ?registry.configured(), "Payment providers configured");
    Ok(registry)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billing_reconciler=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don't show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs); skipped when app.log cannot be created
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(Arc::new(file))
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
