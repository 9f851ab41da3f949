use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::referral::Referral,
    use_cases::referral::ReferralRepo,
};

// Guests are aggregated in insertion order.
const SELECT_REFERRAL: &str = r#"
    SELECT r.referral_id, r.host_id, r.created_at,
           COALESCE(
               ARRAY_AGG(g.guest_id ORDER BY g.created_at) FILTER (WHERE g.guest_id IS NOT NULL),
               '{}'
           ) AS guest_ids
    FROM referrals r
    LEFT JOIN referral_guests g ON g.referral_id = r.referral_id
"#;

fn row_to_referral(row: sqlx::postgres::PgRow) -> Referral {
    Referral {
        referral_id: row.get("referral_id"),
        host_id: row.get("host_id"),
        guest_ids: row.get("guest_ids"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ReferralRepo for PostgresPersistence {
    async fn create(&self, referral_id: &str, host_id: Uuid) -> AppResult<Referral> {
        let row = sqlx::query(
            r#"
            INSERT INTO referrals (referral_id, host_id)
            VALUES ($1, $2)
            RETURNING referral_id, host_id, created_at
            "#,
        )
        .bind(referral_id)
        .bind(host_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(Referral {
            referral_id: row.get("referral_id"),
            host_id: row.get("host_id"),
            guest_ids: vec![],
            created_at: row.get("created_at"),
        })
    }

    async fn get(&self, referral_id: &str) -> AppResult<Option<Referral>> {
        let row = sqlx::query(&format!(
            "{} WHERE r.referral_id = $1 GROUP BY r.referral_id",
            SELECT_REFERRAL
        ))
        .bind(referral_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_referral))
    }

    async fn newest_for_host(&self, host_id: Uuid) -> AppResult<Option<Referral>> {
        let row = sqlx::query(&format!(
            "{} WHERE r.host_id = $1 GROUP BY r.referral_id ORDER BY r.created_at DESC LIMIT 1",
            SELECT_REFERRAL
        ))
        .bind(host_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_referral))
    }

    async fn delete(&self, host_id: Uuid, referral_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM referrals WHERE referral_id = $1 AND host_id = $2")
            .bind(referral_id)
            .bind(host_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_guest(&self, referral_id: &str, guest_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO referral_guests (referral_id, guest_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(referral_id)
        .bind(guest_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }
}
