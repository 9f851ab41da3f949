use async_trait::async_trait;
use strum::{AsRefStr, Display};

use crate::app_error::AppResult;

/// Transactional email sent on account lifecycle changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationTemplate {
    Welcome,
    PaymentIssue,
    Goodbye,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        email: &str,
        template: NotificationTemplate,
        variables: serde_json::Value,
    ) -> AppResult<()>;
}
