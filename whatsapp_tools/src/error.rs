use thiserror::Error;

#[derive(Debug, Error)]
pub enum WhatsAppApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("WhatsApp credentials are not configured: {0}")]
    MissingCredentials(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl WhatsAppApiError {
    /// The HTTP status returned by the Graph API, if the request got that far.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::QueryError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
