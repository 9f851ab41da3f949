use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Contact details of a user, owned by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountContact {
    pub user_id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

/// Read-only view of the account service, used to address notifications.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn get_by_id(&self, user_id: Uuid) -> AppResult<Option<AccountContact>>;
}
