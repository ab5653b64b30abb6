use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The provider rejected the request: {0}")]
    Rejected(String),
    #[error("The provider returned an empty response")]
    EmptyResponse,
    #[error("'{0}' is not a valid order id")]
    InvalidOrderId(String),
}

impl ProviderApiError {
    /// Transport failures and server-side errors are worth retrying. Anything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
