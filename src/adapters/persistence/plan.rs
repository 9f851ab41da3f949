use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_provider::PaymentProvider,
        plan::{Plan, ProductLookup},
    },
    ports::plan_catalog::PlanCatalog,
};

const SELECT_COLS: &str = "plan_id, name, tag, description, features, price_cents, currency, \
     radom_product_id, paypal_plan_id, stripe_price_id";

fn row_to_plan(row: sqlx::postgres::PgRow) -> Plan {
    Plan {
        plan_id: row.get("plan_id"),
        name: row.get("name"),
        tag: row.get("tag"),
        description: row.get("description"),
        features: row.get("features"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        radom_product_id: row.get("radom_product_id"),
        paypal_plan_id: row.get("paypal_plan_id"),
        stripe_price_id: row.get("stripe_price_id"),
    }
}

/// Column holding the id a provider reports for a plan.
fn product_column(provider: PaymentProvider) -> &'static str {
    match provider {
        PaymentProvider::Radom => "radom_product_id",
        PaymentProvider::PayPal => "paypal_plan_id",
        PaymentProvider::Stripe => "stripe_price_id",
        PaymentProvider::GoCardless => "plan_id",
    }
}

#[async_trait]
impl PlanCatalog for PostgresPersistence {
    async fn get_product(&self, lookup: &ProductLookup) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM plans WHERE {} = $1",
            SELECT_COLS,
            product_column(lookup.provider)
        ))
        .bind(&lookup.product_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_plan))
    }

    async fn get_plan(&self, plan_id: &str) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM plans WHERE plan_id = $1",
            SELECT_COLS
        ))
        .bind(plan_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_plan))
    }

    async fn list_plans(&self) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM plans ORDER BY sort_order, price_cents",
            SELECT_COLS
        ))
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        Ok(rows.into_iter().map(row_to_plan).collect())
    }
}
