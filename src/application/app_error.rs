use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Requested payout exceeds the available balance")]
    PayoutNotAvailable,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Payment provider not configured")]
    ProviderNotConfigured,

    #[error("Operation not supported by this payment provider")]
    ProviderNotSupported,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Provider(_) => true,
            AppError::InvalidCredentials
            | AppError::InvalidSignature
            | AppError::InvalidInput(_)
            | AppError::ValidationError(_)
            | AppError::PayoutNotAvailable
            | AppError::Conflict(_)
            | AppError::NotFound
            | AppError::ProviderNotConfigured
            | AppError::ProviderNotSupported => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    InvalidSignature,
    InvalidInput,
    ValidationError,
    PayoutNotAvailable,
    Conflict,
    NotFound,
    ProviderNotConfigured,
    ProviderNotSupported,
    ProviderError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::PayoutNotAvailable => "PAYOUT_NOT_AVAILABLE",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            ErrorCode::ProviderNotSupported => "PROVIDER_NOT_SUPPORTED",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
