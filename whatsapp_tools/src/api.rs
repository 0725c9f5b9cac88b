use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};

use crate::{
    config::WhatsAppConfig,
    data_objects::{SendMessageResponse, TextMessage},
    WhatsAppApiError,
};

#[derive(Clone)]
pub struct WhatsAppApi {
    config: WhatsAppConfig,
    client: Arc<Client>,
}

impl WhatsAppApi {
    pub fn new(config: WhatsAppConfig) -> Result<Self, WhatsAppApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.access_token.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| WhatsAppApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WhatsAppApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &WhatsAppConfig {
        &self.config
    }

    pub fn messages_url(&self) -> String {
        let base = self.config.graph_url.trim_end_matches('/');
        format!("{base}/{}/{}/messages", self.config.api_version, self.config.phone_number_id)
    }

    /// Sends a plain text message to `to`, which must already be in international format (digits only).
    pub async fn send_text_message(&self, to: &str, body: &str) -> Result<SendMessageResponse, WhatsAppApiError> {
        if !self.config.is_configured() {
            return Err(WhatsAppApiError::MissingCredentials(
                "phone number id and access token are both required".to_string(),
            ));
        }
        let url = self.messages_url();
        let message = TextMessage::new(to, body);
        trace!("📨️ Sending WhatsApp text message to {to} via {url}");
        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| WhatsAppApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("📨️ Message accepted. {}", response.status());
            response.json::<SendMessageResponse>().await.map_err(|e| WhatsAppApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| WhatsAppApiError::RestResponseError(e.to_string()))?;
            debug!("📨️ WhatsApp API rejected the message. {status}: {message}");
            Err(WhatsAppApiError::QueryError { status, message })
        }
    }
}
