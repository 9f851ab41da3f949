use async_trait::async_trait;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::{
        referral::{CommissionEntry, CommissionKey, CommissionStatus, Earnings},
        statistics::{LedgerDelta, Statistics},
    },
    use_cases::referral::{Buckets, ReferralLedgerRepo},
};

/// Add `delta` to every bucket and, for purchases, to Earnings, creating rows as needed.
async fn apply_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    host_id: Uuid,
    buckets: &Buckets,
    delta: &LedgerDelta,
) -> AppResult<()> {
    for (period, period_start) in buckets {
        sqlx::query(
            r#"
            INSERT INTO referral_statistics
                (host_id, period, period_start, referral_link_clicks,
                 referral_link_signups, purchases_made, earned_cents)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (host_id, period, period_start) DO UPDATE SET
                referral_link_clicks = referral_statistics.referral_link_clicks + EXCLUDED.referral_link_clicks,
                referral_link_signups = referral_statistics.referral_link_signups + EXCLUDED.referral_link_signups,
                purchases_made = referral_statistics.purchases_made + EXCLUDED.purchases_made,
                earned_cents = referral_statistics.earned_cents + EXCLUDED.earned_cents
            "#,
        )
        .bind(host_id)
        .bind(*period)
        .bind(*period_start)
        .bind(delta.clicks)
        .bind(delta.signups)
        .bind(delta.purchases)
        .bind(delta.earned_cents)
        .execute(&mut **tx)
        .await
        .map_err(AppError::from)?;
    }

    if delta.touches_earnings() {
        sqlx::query(
            r#"
            INSERT INTO earnings (user_id, amount_cents, total_purchases)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                amount_cents = earnings.amount_cents + EXCLUDED.amount_cents,
                total_purchases = earnings.total_purchases + EXCLUDED.total_purchases
            "#,
        )
        .bind(host_id)
        .bind(delta.earned_cents)
        .bind(delta.purchases)
        .execute(&mut **tx)
        .await
        .map_err(AppError::from)?;
    }

    Ok(())
}

fn row_to_commission(row: sqlx::postgres::PgRow) -> CommissionEntry {
    CommissionEntry {
        key: CommissionKey::new(row.get("provider"), row.get::<String, _>("source_id")),
        host_id: row.get("host_id"),
        referral_id: row.get("referral_id"),
        purchase_cents: row.get("purchase_cents"),
        commission_cents: row.get("commission_cents"),
        status: row.get("status"),
    }
}

#[async_trait]
impl ReferralLedgerRepo for PostgresPersistence {
    async fn get_earnings(&self, host_id: Uuid) -> AppResult<Option<Earnings>> {
        let row = sqlx::query(
            "SELECT user_id, amount_cents, total_purchases FROM earnings WHERE user_id = $1",
        )
        .bind(host_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(|row| Earnings {
            user_id: row.get("user_id"),
            amount_cents: row.get("amount_cents"),
            total_purchases: row.get("total_purchases"),
        }))
    }

    async fn apply_delta(
        &self,
        host_id: Uuid,
        buckets: &Buckets,
        delta: &LedgerDelta,
    ) -> AppResult<()> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;
        apply_in_tx(&mut tx, host_id, buckets, delta).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    async fn credit_commission(
        &self,
        entry: &CommissionEntry,
        buckets: &Buckets,
        delta: &LedgerDelta,
    ) -> AppResult<bool> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO referral_commissions
                (provider, source_id, host_id, referral_id, purchase_cents, commission_cents, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider, source_id) DO NOTHING
            "#,
        )
        .bind(entry.key.provider)
        .bind(&entry.key.source_id)
        .bind(entry.host_id)
        .bind(&entry.referral_id)
        .bind(entry.purchase_cents)
        .bind(entry.commission_cents)
        .bind(entry.status)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?
        .rows_affected()
            > 0;

        if !inserted {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(false);
        }

        apply_in_tx(&mut tx, entry.host_id, buckets, delta).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(true)
    }

    async fn reverse_commission(
        &self,
        key: &CommissionKey,
        buckets: &Buckets,
    ) -> AppResult<Option<CommissionEntry>> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        let row = sqlx::query(
            r#"
            UPDATE referral_commissions
            SET status = $3, reversed_at = (now() AT TIME ZONE 'utc')
            WHERE provider = $1 AND source_id = $2 AND status = $4
            RETURNING provider, source_id, host_id, referral_id, purchase_cents,
                      commission_cents, status
            "#,
        )
        .bind(key.provider)
        .bind(&key.source_id)
        .bind(CommissionStatus::Reversed)
        .bind(CommissionStatus::Credited)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(None);
        };
        let entry = row_to_commission(row);

        let delta = LedgerDelta::purchase(entry.commission_cents).negated();
        apply_in_tx(&mut tx, entry.host_id, buckets, &delta).await?;
        tx.commit().await.map_err(AppError::from)?;
        Ok(Some(entry))
    }

    async fn latest_statistics(&self, host_id: Uuid) -> AppResult<Vec<Statistics>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (period)
                host_id, period, period_start, referral_link_clicks,
                referral_link_signups, purchases_made, earned_cents
            FROM referral_statistics
            WHERE host_id = $1
            ORDER BY period, period_start DESC
            "#,
        )
        .bind(host_id)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| Statistics {
                host_id: row.get("host_id"),
                period: row.get("period"),
                period_start: row.get("period_start"),
                referral_link_clicks: row.get("referral_link_clicks"),
                referral_link_signups: row.get("referral_link_signups"),
                purchases_made: row.get("purchases_made"),
                earned_cents: row.get("earned_cents"),
            })
            .collect())
    }
}
