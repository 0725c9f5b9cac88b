use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use comanda_engine::{AuthApiError, OrderFlowError, QuotaError, QuotaStatus, TenantResolverError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{}", .0.exceeded_message())]
    QuotaExceeded(QuotaStatus),
    #[error("The messaging provider rejected the request. {message}")]
    UpstreamFailure { status: Option<u16>, message: String },
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::CredentialNotAccepted(_) => StatusCode::FORBIDDEN,
                AuthError::TenantUnavailable(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamFailure { status, .. } => {
                status.and_then(|s| StatusCode::from_u16(s).ok()).unwrap_or(StatusCode::BAD_GATEWAY)
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::QuotaExceeded(quota) => json!({
                "sent": false,
                "error": quota.exceeded_message(),
                "plan": quota.plan_name,
                "current": quota.current,
                "limit": quota.limit,
                "percentage": quota.percentage,
            }),
            Self::UpstreamFailure { message, .. } => json!({ "sent": false, "error": message }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No valid credentials were provided.")]
    Unauthenticated,
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("Session token is invalid. {0}")]
    ValidationError(String),
    #[error("Session token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("This endpoint does not accept {0} credentials.")]
    CredentialNotAccepted(String),
    #[error("Tenant {0} is not available.")]
    TenantUnavailable(String),
}

impl From<AuthApiError> for ServerError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::InvalidCredentials => Self::AuthenticationError(AuthError::InvalidCredentials),
            AuthApiError::TenantUnavailable(t) => Self::AuthenticationError(AuthError::TenantUnavailable(t)),
            AuthApiError::PasswordHashError(e) => Self::BackendError(format!("Password check failed. {e}")),
            AuthApiError::StorageError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<TenantResolverError> for ServerError {
    fn from(e: TenantResolverError) -> Self {
        match e {
            TenantResolverError::Unauthenticated => Self::AuthenticationError(AuthError::Unauthenticated),
            TenantResolverError::StorageError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::Forbidden(_) => Self::InsufficientPermissions(e.to_string()),
            OrderFlowError::InvalidStatus(_) | OrderFlowError::InvalidOrder(_) => Self::InvalidRequestBody(e.to_string()),
            OrderFlowError::InvalidTransition { .. } | OrderFlowError::ConcurrentModification(_) => {
                Self::InvalidTransition(e.to_string())
            },
            OrderFlowError::StorageError(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<QuotaError> for ServerError {
    fn from(e: QuotaError) -> Self {
        match e {
            QuotaError::TenantNotFound(_) => Self::NoRecordFound(e.to_string()),
            QuotaError::StorageError(e) => Self::BackendError(e.to_string()),
        }
    }
}
