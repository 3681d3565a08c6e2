use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AUTH_REALM;

pub const GENERIC_FAILURE: &str = "An error occurred. Please try again.";
pub const SLOT_TAKEN: &str = "This time slot is no longer available. Please select another.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("{0}")]
    InvalidSelection(String),

    #[error("{}", SLOT_TAKEN)]
    SlotUnavailable,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("db error: {0}")]
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    pub fn not_found<T: Into<String>>(what: T) -> Self {
        AppError::NotFound(what.into())
    }

    /// Message safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db)
                if db.is_unique_violation() && db.message().contains("bookings.booking_time") =>
            {
                AppError::SlotUnavailable
            }
            _ => AppError::Database(e),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
            AppError::SlotUnavailable => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(err) = self {
            log::error!("Database failure: {err}");
        }

        let mut body = json!({
            "success": false,
            "error": self.public_message(),
        });
        if let AppError::Validation(messages) = self {
            body["errors"] = json!(messages);
        }

        let mut response = HttpResponse::build(self.status_code());
        if let AppError::Unauthorized = self {
            response.insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{AUTH_REALM}\"")));
        }
        response.json(body)
    }
}
