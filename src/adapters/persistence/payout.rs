use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::referral::{PayoutHistory, PayoutSubmission},
    use_cases::referral::{NewPayoutSubmission, PayoutRepo},
};

#[async_trait]
impl PayoutRepo for PostgresPersistence {
    async fn create_submission(&self, input: &NewPayoutSubmission) -> AppResult<PayoutSubmission> {
        let row = sqlx::query(
            r#"
            INSERT INTO payout_submissions (host_id, paypal_email, amount_cents, scheduled_time)
            VALUES ($1, $2, $3, $4)
            RETURNING id, host_id, paypal_email, amount_cents, scheduled_time, created_at
            "#,
        )
        .bind(input.host_id)
        .bind(&input.paypal_email)
        .bind(input.amount_cents)
        .bind(input.scheduled_time)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(PayoutSubmission {
            id: row.get("id"),
            host_id: row.get("host_id"),
            paypal_email: row.get("paypal_email"),
            amount_cents: row.get("amount_cents"),
            scheduled_time: row.get("scheduled_time"),
            created_at: row.get("created_at"),
        })
    }

    async fn list_history(&self, host_id: Uuid) -> AppResult<Vec<PayoutHistory>> {
        let rows = sqlx::query(
            r#"
            SELECT id, host_id, amount_cents, paypal_email, paid_at
            FROM payout_history
            WHERE host_id = $1
            ORDER BY paid_at DESC
            "#,
        )
        .bind(host_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| PayoutHistory {
                id: row.get("id"),
                host_id: row.get("host_id"),
                amount_cents: row.get("amount_cents"),
                paypal_email: row.get("paypal_email"),
                paid_at: row.get("paid_at"),
            })
            .collect())
    }
}
