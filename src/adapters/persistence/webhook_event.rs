use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::{payment_provider::PaymentProvider, provider_event::EventKind},
    use_cases::reconciler::ProcessedEventRepo,
};

#[async_trait]
impl ProcessedEventRepo for PostgresPersistence {
    async fn is_processed(&self, provider: PaymentProvider, event_id: &str) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM processed_webhook_events WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider)
        .bind(event_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.is_some())
    }

    async fn mark_processed(
        &self,
        provider: PaymentProvider,
        event_id: &str,
        kind: EventKind,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO processed_webhook_events (provider, event_id, kind)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider, event_id) DO NOTHING
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .bind(kind.as_ref())
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(())
    }
}
