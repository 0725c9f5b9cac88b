//! Minimal client for the WhatsApp Cloud API (Meta Graph messaging endpoint).
//!
//! Only what the order notification flow needs is exposed: sending a plain text message from the configured
//! business phone number.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::WhatsAppApi;
pub use config::WhatsAppConfig;
pub use data_objects::{MessageContact, MessageId, SendMessageResponse, TextBody, TextMessage};
pub use error::WhatsAppApiError;
