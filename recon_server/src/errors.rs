use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use recon_engine::{helpers::SignatureError, LedgerError, ReconciliationError, TransactionApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error. {0}")]
    CouldNotDeserializePayload(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The payment provider could not be reached. {0}")]
    ProviderError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No authenticated user was supplied with the request.")]
    MissingIdentity,
    #[error("Webhook signature is invalid. {0}")]
    InvalidSignature(String),
}

impl From<SignatureError> for ServerError {
    fn from(e: SignatureError) -> Self {
        // A missing secret gets the same 401 on the wire, but operators need to hear about it
        if e.is_configuration_error() {
            error!("🔐️ Webhook signature checks are misconfigured. {e}");
        }
        Self::AuthenticationError(AuthError::InvalidSignature(e.to_string()))
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            ReconciliationError::TransactionNotFound(id) => {
                Self::NoRecordFound(format!("The transaction for order {id} does not exist"))
            },
            ReconciliationError::InvalidTransaction(s) => Self::ValidationError(s),
            ReconciliationError::Provider(s) => Self::ProviderError(s),
            ReconciliationError::Ledger(e) => e.into(),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            LedgerError::ValidationError(_) => Self::ValidationError(e.to_string()),
            LedgerError::InsufficientBalance { .. } => Self::ValidationError(e.to_string()),
            LedgerError::InvalidTransition { .. } => Self::Conflict(e.to_string()),
            LedgerError::WithdrawalNotFound(_) | LedgerError::TransactionNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
        }
    }
}

impl From<TransactionApiError> for ServerError {
    fn from(e: TransactionApiError) -> Self {
        match e {
            TransactionApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            TransactionApiError::QueryError(s) => Self::ValidationError(s),
        }
    }
}
