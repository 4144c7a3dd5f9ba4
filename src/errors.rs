use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::contracts::ErrorBody;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(DomainError),

    #[error("{0}")]
    Conflict(DomainError),

    #[error("{0}")]
    BadRequest(DomainError),

    #[error("Upstream failure: {0}")]
    Upstream(DomainError),

    #[error("Internal error: {0}")]
    Internal(DomainError),
}

impl AppError {
    fn domain(&self) -> &DomainError {
        match self {
            AppError::NotFound(e)
            | AppError::Conflict(e)
            | AppError::BadRequest(e)
            | AppError::Upstream(e)
            | AppError::Internal(e) => e,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::Internal(e) => ErrorBody::new(e.kind(), "Internal server error"),
            other => ErrorBody::from(other.domain()),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::CartNotFound(_)
            | DomainError::ItemNotFound { .. }
            | DomainError::DiscountNotFound(_)
            | DomainError::ProductNotFound(_) => AppError::NotFound(e),
            DomainError::CartAlreadyExists(_) => AppError::Conflict(e),
            DomainError::InvalidInput(_) => AppError::BadRequest(e),
            DomainError::Transport(_) | DomainError::Rejected { .. } => AppError::Upstream(e),
            DomainError::Persistence(_) | DomainError::Internal(_) => AppError::Internal(e),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(e) = self {
            log::error!("Request failed: {}", e);
        }
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let err: AppError = DomainError::CartNotFound("swn".to_string()).into();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn existing_cart_returns_409() {
        let err: AppError = DomainError::CartAlreadyExists("swn".to_string()).into();
        assert_eq!(err.error_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_input_returns_400() {
        let err: AppError = DomainError::InvalidInput("bad value".to_string()).into();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_return_502() {
        let transport: AppError = DomainError::Transport("refused".to_string()).into();
        let rejected: AppError = DomainError::Rejected {
            kind: "QuotaExceeded".to_string(),
            message: "slow down".to_string(),
        }
        .into();
        assert_eq!(transport.error_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(rejected.error_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn persistence_error_returns_500() {
        let err: AppError = DomainError::Persistence("connection lost".to_string()).into();
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_display() {
        let err: AppError = DomainError::ProductNotFound(3).into();
        assert_eq!(err.to_string(), "Product with id=3 is not found");
    }

    #[test]
    fn internal_error_display() {
        let err: AppError = DomainError::Persistence("connection lost".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Internal error: Persistence failure: connection lost"
        );
    }

    #[actix_web::test]
    async fn body_carries_kind_and_subject() {
        let err: AppError = DomainError::DiscountNotFound("CODE_9".to_string()).into();
        let bytes = to_bytes(err.error_response().into_body())
            .await
            .expect("body failed");
        let body: ErrorBody = serde_json::from_slice(&bytes).expect("invalid json");
        assert_eq!(body.kind, "DiscountNotFound");
        assert_eq!(body.code.as_deref(), Some("CODE_9"));
    }

    #[actix_web::test]
    async fn internal_body_hides_message() {
        let err: AppError = DomainError::Persistence("password=secret".to_string()).into();
        let bytes = to_bytes(err.error_response().into_body())
            .await
            .expect("body failed");
        let body: ErrorBody = serde_json::from_slice(&bytes).expect("invalid json");
        assert_eq!(body.kind, "Persistence");
        assert_eq!(body.error, "Internal server error");
    }
}
