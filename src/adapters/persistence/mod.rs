use sqlx::PgPool;

use crate::app_error::AppError;

pub mod account_directory;
pub mod ledger;
pub mod payment_account;
pub mod payout;
pub mod plan;
pub mod referral;
pub mod webhook_event;

/// Postgres implementation of every repository port.
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::Conflict("A record with this value already exists".into())
                } else if db_err.is_foreign_key_violation() {
                    AppError::InvalidInput("Referenced record not found".into())
                } else {
                    // Log the actual error, but don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
