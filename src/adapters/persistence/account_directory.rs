use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    ports::account_directory::{AccountContact, AccountDirectory},
};

#[async_trait]
impl AccountDirectory for PostgresPersistence {
    async fn get_by_id(&self, user_id: Uuid) -> AppResult<Option<AccountContact>> {
        let row = sqlx::query("SELECT id, email, username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;

        Ok(row.map(|row| AccountContact {
            user_id: row.get("id"),
            email: row.get("email"),
            username: row.get("username"),
        }))
    }
}
