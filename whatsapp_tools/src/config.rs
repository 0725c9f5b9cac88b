use comanda_common::Secret;
use log::*;

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v21.0";

#[derive(Debug, Clone, Default)]
pub struct WhatsAppConfig {
    /// Base url of the Graph API. Overridable so that tests can point the client at a local server.
    pub graph_url: String,
    pub api_version: String,
    /// The business phone number id that messages are sent from
    pub phone_number_id: String,
    pub access_token: Secret<String>,
}

impl WhatsAppConfig {
    pub fn new_from_env_or_default() -> Self {
        let graph_url = std::env::var("WHATSAPP_GRAPH_URL").unwrap_or_else(|_| DEFAULT_GRAPH_URL.to_string());
        let api_version = std::env::var("WHATSAPP_API_VERSION").unwrap_or_else(|_| {
            info!("🪛️ WHATSAPP_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let phone_number_id = std::env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_else(|_| {
            warn!("🪛️ WHATSAPP_PHONE_NUMBER_ID not set. Delivery notifications will fail until it is configured.");
            String::default()
        });
        let access_token = Secret::from_env("WHATSAPP_ACCESS_TOKEN").unwrap_or_else(|| {
            warn!("🪛️ WHATSAPP_ACCESS_TOKEN not set. Delivery notifications will fail until it is configured.");
            Secret::default()
        });
        Self { graph_url, api_version, phone_number_id, access_token }
    }

    pub fn is_configured(&self) -> bool {
        !self.phone_number_id.is_empty() && !self.access_token.is_empty()
    }
}
