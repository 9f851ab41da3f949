use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod checkout_sessions;
pub mod config;
pub mod db;
pub mod gocardless_client;
pub mod http_client;
pub mod paypal_client;
pub mod radom_client;
pub mod setup;
pub mod stripe_client;
pub mod webhook_signature;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
