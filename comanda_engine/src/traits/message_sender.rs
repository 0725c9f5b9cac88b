use thiserror::Error;

/// An outbound text channel to customers (in production, the WhatsApp Cloud API).
#[allow(async_fn_in_trait)]
pub trait MessageSender {
    /// Sends `body` to the phone number `to` (international format, digits only). Returns the provider's message id.
    async fn send_text(&self, to: &str, body: &str) -> Result<String, MessageSendError>;
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MessageSendError {
    /// The HTTP status returned by the provider, if it answered at all
    pub status: Option<u16>,
    pub message: String,
}

impl MessageSendError {
    pub fn new<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self { status, message: message.into() }
    }
}
