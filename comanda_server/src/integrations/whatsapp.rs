use std::{future::Future, pin::Pin, sync::Arc};

use comanda_engine::{
    events::{EventHandlers, EventHooks, OrderOutForDeliveryEvent},
    traits::{MessageSendError, MessageSender},
    NotificationApi,
    NotificationOutcome,
    SqliteDatabase,
};
use log::*;
use whatsapp_tools::{WhatsAppApi, WhatsAppApiError, WhatsAppConfig};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

/// The production [`MessageSender`]: the single, platform-wide WhatsApp business number.
#[derive(Clone)]
pub struct WhatsAppSender {
    api: WhatsAppApi,
}

impl WhatsAppSender {
    pub fn new(config: WhatsAppConfig) -> Result<Self, WhatsAppApiError> {
        let api = WhatsAppApi::new(config)?;
        Ok(Self { api })
    }
}

impl MessageSender for WhatsAppSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<String, MessageSendError> {
        let response = self
            .api
            .send_text_message(to, body)
            .await
            .map_err(|e| MessageSendError::new(e.upstream_status(), e.to_string()))?;
        match response.message_id() {
            Some(id) => Ok(id.to_string()),
            None => {
                warn!("📨️ WhatsApp accepted a message to {to} but returned no message id");
                Ok(String::default())
            },
        }
    }
}

pub type WhatsAppNotifier = NotificationApi<SqliteDatabase, WhatsAppSender>;

/// Wires the notification dispatcher to the out-for-delivery event.
///
/// Status changes only queue the event, so the request that moved the order never waits on the messaging provider.
/// The outcome of each send is logged; failed sends are not retried.
pub fn create_notification_handlers(notifier: Arc<WhatsAppNotifier>) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_out_for_delivery(move |ev: OrderOutForDeliveryEvent| {
        let notifier = Arc::clone(&notifier);
        Box::pin(async move {
            let order = ev.order;
            debug!("📨️ Order #{} ({}) left {} for delivery", order.display_id, order.id, ev.previous_status);
            match notifier.send_delivery_notification(&order).await {
                NotificationOutcome::Sent { message_id } => {
                    info!("📨️ Customer of order {} notified. Message id: {message_id}", order.id)
                },
                outcome => warn!(
                    "📨️ Customer of order {} was not notified. {}",
                    order.id,
                    outcome.error().unwrap_or_default()
                ),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}
