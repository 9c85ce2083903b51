use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

/// Errors surfaced by domain operations. `Validation` carries a user-facing
/// message and aborts the current save or request.
#[derive(Debug, thiserror::Error)]
pub enum HrError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mail error: {0}")]
    Mail(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HrResult<T> = Result<T, HrError>;

impl HrError {
    pub fn validation(msg: impl Into<String>) -> Self {
        HrError::Validation(msg.into())
    }
}

impl ResponseError for HrError {
    fn status_code(&self) -> StatusCode {
        match self {
            HrError::Validation(_) => StatusCode::BAD_REQUEST,
            HrError::NotFound(_) => StatusCode::NOT_FOUND,
            HrError::Forbidden(_) => StatusCode::FORBIDDEN,
            HrError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HrError::Database(_) | HrError::Mail(_) | HrError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            HrError::Validation(m)
            | HrError::NotFound(m)
            | HrError::Forbidden(m)
            | HrError::Unauthorized(m) => m.clone(),
            other => {
                tracing::error!(error = %other, "Request failed");
                "Internal Server Error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = HrError::validation("Please select a date");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Please select a date");
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let err = HrError::Mail("relay refused".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            HrError::NotFound("Workday not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
