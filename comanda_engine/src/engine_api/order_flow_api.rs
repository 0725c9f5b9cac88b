use std::fmt::Debug;

use chrono::Utc;
use chrono_tz::Tz;
use log::*;
use serde::Serialize;

use crate::{
    db_types::{Fulfillment, LineItem, NewOrder, Order, OrderId, OrderStatusType},
    engine_api::{auth_objects::TenantScope, errors::OrderFlowError},
    events::{EventProducers, OrderOutForDeliveryEvent},
    helpers::business_day,
    traits::OrderManagement,
};

/// What the dispatching client needs after marking an order as out for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OutForDelivery {
    pub order: Order,
    pub customer_phone: String,
    pub display_id: i64,
}

/// `OrderFlowApi` drives an order through its lifecycle: `pending` → `printed` → `out_for_delivery` → `finished`.
///
/// Status only ever moves forward (a `pending` order may skip straight to `out_for_delivery`). The one exception is
/// [`Self::reprint`], which sends an order back to `pending`. Every operation that addresses an existing order checks
/// that it belongs to the caller's [`TenantScope`].
///
/// When an order's status changes into `out_for_delivery`, an [`OrderOutForDeliveryEvent`] is published. The
/// delivery notification is sent from that event, so status changes never wait on the messaging provider.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    tz: Tz,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.tz)
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers, tz: Tz) -> Self {
        Self { db, producers, tz }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Records a new order. It gets the next display id of its tenant's business day and starts out `pending`.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        validate_new_order(&order)?;
        let now = Utc::now();
        let day = business_day(now, self.tz);
        let order = self.db.insert_order(order, &day, now).await?;
        info!("🔄️📦️ New order #{} ({}) for tenant {} on {day}", order.display_id, order.id, order.tenant_id);
        Ok(order)
    }

    pub async fn fetch_order(&self, id: &OrderId, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        self.fetch_owned_order(id, scope).await
    }

    /// Replaces the items of an order. The total is recomputed along with them.
    pub async fn update_items(
        &self,
        id: &OrderId,
        items: Vec<LineItem>,
        scope: &TenantScope,
    ) -> Result<Order, OrderFlowError> {
        validate_items(&items)?;
        self.fetch_owned_order(id, scope).await?;
        let order = self.db.update_order_items(id, items).await?.ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))?;
        debug!("🔄️📦️ Items of order {id} updated. New total is {}", order.total_price);
        Ok(order)
    }

    /// Asks the store's printer for a (new) ticket. The status does not change.
    pub async fn request_print(&self, id: &OrderId, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        self.set_print_requested(id, true, scope).await
    }

    pub async fn clear_print_request(&self, id: &OrderId, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        self.set_print_requested(id, false, scope).await
    }

    /// Confirms that the ticket was printed. Clears any print request, and moves a `pending` order to `printed`.
    /// Orders that are already further along keep their status.
    pub async fn mark_printed(&self, id: &OrderId, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        let order = self.fetch_owned_order(id, scope).await?;
        let updated = if order.status.can_advance_to(OrderStatusType::Printed) {
            self.db.mark_order_printed(id, order.status).await?
        } else {
            self.db.set_print_requested(id, false).await?
        };
        let updated = updated.ok_or_else(|| OrderFlowError::ConcurrentModification(id.clone()))?;
        debug!("🔄️🖨️ Order {id} printed. Status is {}", updated.status);
        Ok(updated)
    }

    /// Moves an order to the given status. `status` must be one of the lifecycle status names, and may not be behind
    /// the order's current status.
    pub async fn update_status(&self, id: &OrderId, status: &str, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        let target = status.parse::<OrderStatusType>().map_err(|_| OrderFlowError::InvalidStatus(status.to_string()))?;
        self.advance(id, target, scope).await
    }

    pub async fn mark_out_for_delivery(&self, id: &OrderId, scope: &TenantScope) -> Result<OutForDelivery, OrderFlowError> {
        let order = self.advance(id, OrderStatusType::OutForDelivery, scope).await?;
        let customer_phone = order.customer_phone.clone();
        let display_id = order.display_id;
        Ok(OutForDelivery { order, customer_phone, display_id })
    }

    /// Sends an order back to `pending` so that the printer picks it up again.
    pub async fn reprint(&self, id: &OrderId, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        self.fetch_owned_order(id, scope).await?;
        let order = self.db.reset_order_status(id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))?;
        info!("🔄️🖨️ Order {id} sent back to pending for reprinting");
        Ok(order)
    }

    async fn advance(&self, id: &OrderId, target: OrderStatusType, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        let order = self.fetch_owned_order(id, scope).await?;
        let from = order.status;
        if from == target {
            trace!("🔄️📦️ Order {id} is already {target}");
            return Ok(order);
        }
        if !from.can_advance_to(target) {
            debug!("🔄️📦️ Refusing to move order {id} back from {from} to {target}");
            return Err(OrderFlowError::InvalidTransition { id: id.clone(), from, to: target });
        }
        let updated = self
            .db
            .update_order_status(id, from, target)
            .await?
            .ok_or_else(|| OrderFlowError::ConcurrentModification(id.clone()))?;
        info!("🔄️📦️ Order {id} moved from {from} to {target}");
        if target == OrderStatusType::OutForDelivery {
            self.call_out_for_delivery_hook(&updated, from).await;
        }
        Ok(updated)
    }

    async fn call_out_for_delivery_hook(&self, order: &Order, previous_status: OrderStatusType) {
        if self.producers.out_for_delivery_producer.is_empty() {
            return;
        }
        debug!("🔄️📦️ Notifying out-for-delivery hook subscribers");
        let event = OrderOutForDeliveryEvent::new(order.clone(), previous_status);
        self.producers.publish_out_for_delivery(event).await;
    }

    async fn set_print_requested(
        &self,
        id: &OrderId,
        requested: bool,
        scope: &TenantScope,
    ) -> Result<Order, OrderFlowError> {
        self.fetch_owned_order(id, scope).await?;
        let order =
            self.db.set_print_requested(id, requested).await?.ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))?;
        trace!("🔄️🖨️ Print request for order {id} set to {requested}");
        Ok(order)
    }

    async fn fetch_owned_order(&self, id: &OrderId, scope: &TenantScope) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))?;
        if !scope.permits(&order.tenant_id) {
            warn!("🔄️📦️ Access to order {id} of tenant {} denied for {scope:?}", order.tenant_id);
            return Err(OrderFlowError::Forbidden(id.clone()));
        }
        Ok(order)
    }
}

fn validate_new_order(order: &NewOrder) -> Result<(), OrderFlowError> {
    if order.customer_name.trim().is_empty() {
        return Err(OrderFlowError::InvalidOrder("The customer name is required".into()));
    }
    if !order.customer_phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(OrderFlowError::InvalidOrder("The customer phone number is required".into()));
    }
    if order.fulfillment == Fulfillment::Delivery && order.address.as_deref().map_or(true, |a| a.trim().is_empty()) {
        return Err(OrderFlowError::InvalidOrder("Delivery orders need an address".into()));
    }
    validate_items(&order.items)
}

fn validate_items(items: &[LineItem]) -> Result<(), OrderFlowError> {
    if items.is_empty() {
        return Err(OrderFlowError::InvalidOrder("An order needs at least one item".into()));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(OrderFlowError::InvalidOrder("Item names cannot be empty".into()));
        }
        if item.quantity < 1 {
            return Err(OrderFlowError::InvalidOrder(format!("{} has a quantity of {}", item.name, item.quantity)));
        }
        if item.unit_price.is_negative() {
            return Err(OrderFlowError::InvalidOrder(format!("{} has a negative price", item.name)));
        }
    }
    Ok(())
}
