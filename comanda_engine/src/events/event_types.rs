use serde::Serialize;

use crate::db_types::{Order, OrderStatusType};

/// Emitted when an order's status changes into `out_for_delivery`. Orders that were already out for delivery do not
/// emit the event again.
#[derive(Debug, Clone, Serialize)]
pub struct OrderOutForDeliveryEvent {
    pub order: Order,
    pub previous_status: OrderStatusType,
}

impl OrderOutForDeliveryEvent {
    pub fn new(order: Order, previous_status: OrderStatusType) -> Self {
        Self { order, previous_status }
    }
}
