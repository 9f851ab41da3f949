use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::{
        account_status::AccountStatus,
        payment_account::{
            MatchKey, NewPaymentAccount, PaymentAccount, PaymentAccountUpdate, ProviderRef,
        },
        payment_provider::PaymentProvider,
    },
    use_cases::payment_account::PaymentAccountRepo,
};

const SELECT_COLS: &str = "id, user_id, provider, subscription_id, checkout_id, mandate_id, \
     amount_cents, plan_id, product_id, referral_id, status, mandate_count, created_at, updated_at";

fn row_to_account(row: sqlx::postgres::PgRow) -> PaymentAccount {
    let provider: PaymentProvider = row.get("provider");
    PaymentAccount {
        id: row.get("id"),
        user_id: row.get("user_id"),
        reference: ProviderRef::from_parts(
            provider,
            row.get("subscription_id"),
            row.get("checkout_id"),
            row.get("mandate_id"),
        ),
        amount_cents: row.get("amount_cents"),
        plan_id: row.get("plan_id"),
        product_id: row.get("product_id"),
        referral_id: row.get("referral_id"),
        status: row.get("status"),
        mandate_count: row.get("mandate_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// WHERE clause for a match key; provider-scoped keys bind the provider first.
fn match_filter(key: &MatchKey) -> &'static str {
    match key {
        MatchKey::Subscription(..) => "provider = $1 AND subscription_id = $2",
        MatchKey::Checkout(..) => "provider = $1 AND checkout_id = $2",
        MatchKey::Mandate(..) => "provider = $1 AND mandate_id = $2",
        MatchKey::User(_) => "user_id = $1",
    }
}

#[async_trait]
impl PaymentAccountRepo for PostgresPersistence {
    async fn find(&self, key: &MatchKey) -> AppResult<Option<PaymentAccount>> {
        let sql = format!(
            "SELECT {} FROM payment_accounts WHERE {} LIMIT 1",
            SELECT_COLS,
            match_filter(key)
        );

        let query = sqlx::query(&sql);
        let query = match key {
            MatchKey::Subscription(provider, id)
            | MatchKey::Checkout(provider, id)
            | MatchKey::Mandate(provider, id) => query.bind(*provider).bind(id),
            MatchKey::User(user_id) => query.bind(*user_id),
        };

        let row = query
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_account))
    }

    async fn insert(&self, input: &NewPaymentAccount) -> AppResult<PaymentAccount> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_accounts
                (user_id, provider, subscription_id, checkout_id, mandate_id,
                 amount_cents, plan_id, product_id, referral_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.user_id)
        .bind(input.reference.provider())
        .bind(input.reference.subscription_id())
        .bind(input.reference.checkout_id())
        .bind(input.reference.mandate_id())
        .bind(input.amount_cents)
        .bind(&input.plan_id)
        .bind(&input.product_id)
        .bind(&input.referral_id)
        .bind(input.status)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row_to_account(row))
    }

    async fn update(&self, id: Uuid, update: &PaymentAccountUpdate) -> AppResult<PaymentAccount> {
        let reference = update.reference.as_ref();
        let provider: Option<PaymentProvider> = reference.map(ProviderRef::provider);
        let status: Option<AccountStatus> = update.status;

        let sql = if update.replace_instance {
            format!(
                r#"
                UPDATE payment_accounts SET
                    provider = COALESCE($2, provider),
                    subscription_id = $3,
                    checkout_id = $4,
                    mandate_id = $5,
                    amount_cents = COALESCE($6, amount_cents),
                    plan_id = $7,
                    product_id = $8,
                    referral_id = $9,
                    status = COALESCE($10, status),
                    mandate_count = 0,
                    updated_at = (now() AT TIME ZONE 'utc')
                WHERE id = $1
                RETURNING {}
                "#,
                SELECT_COLS
            )
        } else {
            // A reference, when given, is written as a whole
            format!(
                r#"
                UPDATE payment_accounts SET
                    provider = COALESCE($2, provider),
                    subscription_id = CASE WHEN $2 IS NULL THEN subscription_id ELSE $3 END,
                    checkout_id = CASE WHEN $2 IS NULL THEN checkout_id ELSE $4 END,
                    mandate_id = CASE WHEN $2 IS NULL THEN mandate_id ELSE $5 END,
                    amount_cents = COALESCE($6, amount_cents),
                    plan_id = COALESCE($7, plan_id),
                    product_id = COALESCE($8, product_id),
                    referral_id = COALESCE($9, referral_id),
                    status = COALESCE($10, status),
                    updated_at = (now() AT TIME ZONE 'utc')
                WHERE id = $1
                RETURNING {}
                "#,
                SELECT_COLS
            )
        };

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(provider)
            .bind(reference.and_then(ProviderRef::subscription_id))
            .bind(reference.and_then(ProviderRef::checkout_id))
            .bind(reference.and_then(ProviderRef::mandate_id))
            .bind(update.amount_cents)
            .bind(&update.plan_id)
            .bind(&update.product_id)
            .bind(&update.referral_id)
            .bind(status)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::NotFound)?;

        Ok(row_to_account(row))
    }

    async fn increment_mandate_count(&self, id: Uuid) -> AppResult<i32> {
        let row = sqlx::query(
            r#"
            UPDATE payment_accounts
            SET mandate_count = mandate_count + 1, updated_at = (now() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING mandate_count
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

        Ok(row.get("mandate_count"))
    }
}
