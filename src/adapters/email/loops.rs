use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::{
    app_error::{AppError, AppResult},
    infra::{config::LoopsConfig, http_client::build_client},
    ports::notifier::{NotificationTemplate, Notifier},
};

const LOOPS_TRANSACTIONAL_URL: &str = "https://app.loops.so/api/v1/transactional";

/// Transactional email through Loops, one template id per notification.
#[derive(Clone)]
pub struct LoopsNotifier {
    client: Client,
    access_token: SecretString,
    welcome_template_id: String,
    payment_issue_template_id: String,
    goodbye_template_id: String,
}

impl LoopsNotifier {
    pub fn new(config: &LoopsConfig) -> AppResult<Self> {
        Ok(Self {
            client: build_client()?,
            access_token: config.access_token.clone(),
            welcome_template_id: config.welcome_template_id.clone(),
            payment_issue_template_id: config.payment_issue_template_id.clone(),
            goodbye_template_id: config.goodbye_template_id.clone(),
        })
    }

    fn template_id(&self, template: NotificationTemplate) -> &str {
        match template {
            NotificationTemplate::Welcome => &self.welcome_template_id,
            NotificationTemplate::PaymentIssue => &self.payment_issue_template_id,
            NotificationTemplate::Goodbye => &self.goodbye_template_id,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionalReq<'a> {
    transactional_id: &'a str,
    email: &'a str,
    data_variables: serde_json::Value,
}

#[async_trait]
impl Notifier for LoopsNotifier {
    async fn send(
        &self,
        email: &str,
        template: NotificationTemplate,
        variables: serde_json::Value,
    ) -> AppResult<()> {
        let body = TransactionalReq {
            transactional_id: self.template_id(template),
            email,
            data_variables: variables,
        };
        self.client
            .post(LOOPS_TRANSACTIONAL_URL)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::debug!(template = %template, "Notification sent");
        Ok(())
    }
}

/// Stand-in when Loops is not configured: notifications are only logged.
#[derive(Clone, Copy, Default)]
pub struct LogOnlyNotifier;

#[async_trait]
impl Notifier for LogOnlyNotifier {
    async fn send(
        &self,
        _email: &str,
        template: NotificationTemplate,
        _variables: serde_json::Value,
    ) -> AppResult<()> {
        tracing::info!(template = %template, "Notifications disabled, skipping email");
        Ok(())
    }
}
