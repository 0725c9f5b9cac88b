use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderOutForDeliveryEvent};

/// The publishing side of the configured hooks. Cheap to clone; handed to the APIs that emit events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub out_for_delivery_producer: Vec<EventProducer<OrderOutForDeliveryEvent>>,
}

impl EventProducers {
    pub async fn publish_out_for_delivery(&self, event: OrderOutForDeliveryEvent) {
        for producer in &self.out_for_delivery_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_out_for_delivery: Option<EventHandler<OrderOutForDeliveryEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_out_for_delivery = hooks.on_out_for_delivery.map(|f| EventHandler::new(buffer_size, f));
        Self { on_out_for_delivery }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_out_for_delivery {
            result.out_for_delivery_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_out_for_delivery {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_out_for_delivery: Option<Handler<OrderOutForDeliveryEvent>>,
}

impl EventHooks {
    pub fn on_out_for_delivery<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderOutForDeliveryEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_out_for_delivery = Some(Arc::new(f));
        self
    }
}
