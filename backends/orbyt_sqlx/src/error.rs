use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use orbyt_dto::ErrorBody;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum DBError {
    #[error("Username or email already in use")]
    AlreadyRegistered,

    #[error("{0} not found")]
    NotFound(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Any error: {0:?}")]
    Anyhow(#[from] anyhow::Error),

    #[error("DB Error: {0:?}")]
    DBError(#[from] DBError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("SQL failed: {0:?}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JWT error: {0:?}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Identity provider request failed: {0:?}")]
    Identity(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),

    #[error(transparent)]
    QueryRejection(#[from] QueryRejection),

    #[error(transparent)]
    PathRejection(#[from] PathRejection),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        AppError::DBError(DBError::NotFound(what))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            AppError::JwtError(err) => {
                let message = match err.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    _ => "Invalid token",
                };
                (StatusCode::UNAUTHORIZED, message.to_string())
            }
            AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, validation_message(errors)),
            AppError::JsonRejection(rejection) => (rejection.status(), rejection.body_text()),
            AppError::QueryRejection(rejection) => (rejection.status(), rejection.body_text()),
            AppError::PathRejection(rejection) => (rejection.status(), rejection.body_text()),
            AppError::DBError(db_error) => {
                let status = match db_error {
                    DBError::NotFound(_) => StatusCode::NOT_FOUND,
                    DBError::AlreadyRegistered => StatusCode::CONFLICT,
                };
                (status, db_error.to_string())
            }
            AppError::NotConfigured(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            AppError::Anyhow(_) | AppError::Sqlx(_) | AppError::Identity(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            log::error!("Error: {:?}", self);
        } else {
            log::debug!("Rejected request ({}): {}", status, message);
        }

        (status, Json(ErrorBody { message })).into_response()
    }
}

/// First failing field's message, falling back to the validator code.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by_key(|(field, _)| **field);

    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .unwrap_or_else(|| "Invalid request".to_string())
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
