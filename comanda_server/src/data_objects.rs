use std::fmt::Display;

use chrono::{DateTime, Utc};
use comanda_engine::{
    db_types::{Fulfillment, LineItem, NewOrder, Order, TenantId, User},
    NotificationOutcome,
    OutForDelivery,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// The slug of the store to log into. Needed when the same username exists in several stores.
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// A new order, as submitted by a store. The tenant comes from the caller's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<LineItem>,
    #[serde(default = "default_fulfillment")]
    pub fulfillment: Fulfillment,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

fn default_fulfillment() -> Fulfillment {
    Fulfillment::Pickup
}

impl NewOrderRequest {
    pub fn into_new_order(self, tenant_id: TenantId) -> NewOrder {
        NewOrder {
            tenant_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items: self.items,
            fulfillment: self.fulfillment,
            address: self.address,
            scheduled_for: self.scheduled_for,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsUpdateRequest {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutForDeliveryResponse {
    pub order: Order,
    pub customer_phone: String,
    pub display_id: i64,
}

impl From<OutForDelivery> for OutForDeliveryResponse {
    fn from(value: OutForDelivery) -> Self {
        Self { order: value.order, customer_phone: value.customer_phone, display_id: value.display_id }
    }
}

/// The `{sent, error?}` view of a notification attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyResponse {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&NotificationOutcome> for NotifyResponse {
    fn from(outcome: &NotificationOutcome) -> Self {
        let message_id = match outcome {
            NotificationOutcome::Sent { message_id } => Some(message_id.clone()),
            _ => None,
        };
        Self { sent: outcome.sent(), message_id, error: outcome.error() }
    }
}
