use axum::{http::StatusCode, response::IntoResponse};
use validator::ValidationErrors;

use crate::{auth::error::AuthError, db::error::DatabaseError, media::UploadError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Database error")]
    Database(DatabaseError),

    #[error("Auth error")]
    Auth(AuthError),

    #[error("Validation error")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not allowed to {0}")]
    Forbidden(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upload error")]
    Upload(UploadError),

    #[error("Other error: {0}")]
    Other(anyhow::Error),
}

impl From<DatabaseError> for Error {
    fn from(value: DatabaseError) -> Self {
        Self::Database(value)
    }
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<UploadError> for Error {
    fn from(value: UploadError) -> Self {
        Self::Upload(value)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match self {
            Error::Database(database_error) => {
                tracing::error!(err.msg = %database_error, err.details = ?database_error, "Database Error");

                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Error::Auth(auth_error) => match auth_error {
                AuthError::JwtError(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "JWT Error");

                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
                AuthError::PasswordError(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "Password Hash Error");

                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
                AuthError::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
                AuthError::IncorrectCredential => StatusCode::UNAUTHORIZED.into_response(),
                AuthError::RegistrationClosed => StatusCode::FORBIDDEN.into_response(),
            },
            Error::Validation(validation_error) => {
                tracing::info!(err.msg = %validation_error, "Validation Error");

                (StatusCode::BAD_REQUEST, validation_error.to_string()).into_response()
            }
            error @ Error::NotFound(_) => (StatusCode::NOT_FOUND, error.to_string()).into_response(),
            error @ Error::Forbidden(_) => (StatusCode::FORBIDDEN, error.to_string()).into_response(),
            error @ Error::Conflict(_) => (StatusCode::CONFLICT, error.to_string()).into_response(),
            Error::Upload(upload_error) => match upload_error {
                UploadError::InvalidFolder(_)
                | UploadError::InvalidPublicId(_)
                | UploadError::EmptyPayload
                | UploadError::Image(_) => {
                    (StatusCode::BAD_REQUEST, upload_error.to_string()).into_response()
                }
                UploadError::Io(error) => {
                    tracing::error!(err.msg = %error, err.details = ?error, "Upload Error");

                    StatusCode::BAD_GATEWAY.into_response()
                }
            },
            Error::Other(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Other Error");

                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
