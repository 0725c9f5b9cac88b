use serde::{Deserialize, Serialize};

/// Request body for `POST /{version}/{phone_number_id}/messages` with a text payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextMessage {
    pub messaging_product: String,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: TextBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextBody {
    pub body: String,
}

impl TextMessage {
    pub fn new<S: Into<String>, B: Into<String>>(to: S, body: B) -> Self {
        Self {
            messaging_product: "whatsapp".to_string(),
            to: to.into(),
            message_type: "text".to_string(),
            text: TextBody { body: body.into() },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageContact {
    pub input: String,
    pub wa_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageId {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messaging_product: String,
    #[serde(default)]
    pub contacts: Vec<MessageContact>,
    #[serde(default)]
    pub messages: Vec<MessageId>,
}

impl SendMessageResponse {
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}
