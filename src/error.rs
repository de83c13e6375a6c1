use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ApiResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Signature mismatch for invoice {0}")]
    SignatureMismatch(i64),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("Amount mismatch for invoice {inv_id}: link was for {expected}, gateway reported {got}")]
    AmountMismatch {
        inv_id: i64,
        expected: String,
        got: String,
    },

    #[error("Invoice {0} was already marked failed")]
    PaymentAlreadyFailed(i64),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Errors the payment gateway should retry by redelivering the
    /// notification, as opposed to rejections that will never succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::MigrateError(_) | AppError::InternalError(_)
        )
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::SignatureMismatch(inv_id) => {
                log::warn!("Signature mismatch for invoice {inv_id}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "SIGNATURE_MISMATCH",
                    self.to_string(),
                )
            }
            AppError::UnknownTransaction(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "UNKNOWN_TRANSACTION",
                self.to_string(),
            ),
            AppError::AmountMismatch { .. } => {
                log::warn!("{self}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "AMOUNT_MISMATCH",
                    self.to_string(),
                )
            }
            AppError::PaymentAlreadyFailed(_) => (
                actix_web::http::StatusCode::CONFLICT,
                "PAYMENT_FAILED",
                self.to_string(),
            ),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            AppError::MigrateError(err) => {
                log::error!("Migration error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "MIGRATION_ERROR",
                    "Migration error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(ApiResponse::<()>::error(
            error_code.to_string(),
            message,
        ))
    }
}
