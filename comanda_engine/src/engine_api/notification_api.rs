use chrono_tz::Tz;
use log::*;
use serde::Serialize;

use crate::{
    db_types::{Order, OrderStatusType},
    engine_api::quota_api::{MessageQuotaApi, QuotaStatus, Reservation},
    helpers::{compose_delivery_message, normalize_phone},
    traits::{MessageSender, MessageUsageManagement, TenantManagement},
};

/// The result of trying to tell a customer that their order is on its way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent { message_id: String },
    /// The order is not out for delivery, so nothing was sent
    NotOutForDelivery { status: OrderStatusType },
    /// The order has no usable phone number
    MissingPhone,
    /// The tenant's monthly allowance is used up
    QuotaExceeded(QuotaStatus),
    /// The messaging provider refused the message, or could not be reached
    UpstreamRejected { status: Option<u16>, message: String },
}

impl NotificationOutcome {
    pub fn sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent { .. })
    }

    /// A description of why nothing was sent.
    pub fn error(&self) -> Option<String> {
        match self {
            NotificationOutcome::Sent { .. } => None,
            NotificationOutcome::NotOutForDelivery { status } => {
                Some(format!("The order must be out for delivery before the customer is notified. It is {status}"))
            },
            NotificationOutcome::MissingPhone => Some("The order has no customer phone number".to_string()),
            NotificationOutcome::QuotaExceeded(status) => Some(status.exceeded_message()),
            NotificationOutcome::UpstreamRejected { message, .. } => Some(message.clone()),
        }
    }
}

/// The notification dispatcher. Sends the "out for delivery" message to a customer through a [`MessageSender`],
/// gated by the tenant's message quota.
///
/// Sends are not deduplicated: dispatching the same order twice sends (and counts) two messages.
pub struct NotificationApi<B, M> {
    quota: MessageQuotaApi<B>,
    sender: M,
    country_code: String,
}

impl<B, M> NotificationApi<B, M> {
    pub fn new(db: B, sender: M, tz: Tz, country_code: &str) -> Self {
        Self { quota: MessageQuotaApi::new(db, tz), sender, country_code: country_code.to_string() }
    }
}

impl<B, M> NotificationApi<B, M>
where
    B: TenantManagement + MessageUsageManagement,
    M: MessageSender,
{
    /// Notifies the customer of `order`, which must already be out for delivery.
    ///
    /// A message is counted against the quota before it is sent and given back if the send fails, so usage only ever
    /// reflects delivered messages and concurrent sends cannot overshoot the allowance. If the quota store cannot be
    /// reached the message is sent anyway.
    pub async fn send_delivery_notification(&self, order: &Order) -> NotificationOutcome {
        if order.status != OrderStatusType::OutForDelivery {
            debug!("📨️ Order {} is {}. Not sending a delivery notification", order.id, order.status);
            return NotificationOutcome::NotOutForDelivery { status: order.status };
        }
        let Some(phone) = normalize_phone(&order.customer_phone, &self.country_code) else {
            warn!("📨️ Order {} has no usable customer phone number", order.id);
            return NotificationOutcome::MissingPhone;
        };
        let reserved_period = match self.quota.try_reserve(&order.tenant_id, 1).await {
            Ok(Reservation::Granted { period, .. }) => Some(period),
            Ok(Reservation::Refused(status)) => {
                info!("📨️ Delivery notification for order {} refused. {}", order.id, status.exceeded_message());
                return NotificationOutcome::QuotaExceeded(status);
            },
            Err(e) => {
                warn!("📨️ Could not check the message quota of tenant {}. Sending anyway. {e}", order.tenant_id);
                None
            },
        };
        let body = compose_delivery_message(order);
        match self.sender.send_text(&phone, &body).await {
            Ok(message_id) => {
                if reserved_period.is_none() {
                    if let Err(e) = self.quota.increment_usage(&order.tenant_id, 1).await {
                        warn!("📨️ Could not record message usage for tenant {}. {e}", order.tenant_id);
                    }
                }
                info!("📨️ Delivery notification for order #{} ({}) sent: {message_id}", order.display_id, order.id);
                NotificationOutcome::Sent { message_id }
            },
            Err(e) => {
                warn!("📨️ Delivery notification for order {} failed. {e}", order.id);
                if let Some(period) = reserved_period {
                    if let Err(e) = self.quota.release(&order.tenant_id, &period, 1).await {
                        error!("📨️ Could not release the quota reservation of tenant {}. {e}", order.tenant_id);
                    }
                }
                NotificationOutcome::UpstreamRejected { status: e.status, message: e.message }
            },
        }
    }
}
