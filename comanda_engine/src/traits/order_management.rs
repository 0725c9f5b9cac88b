use chrono::{DateTime, Utc};

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderId, OrderStatusType, TenantId},
    helpers::FeedWindow,
    traits::StorageError,
};

/// The `OrderManagement` trait defines the order store.
///
/// Status writes are compare-and-set: they take the status the caller last saw and return `Ok(None)` if the order
/// does not exist or its status has changed in the meantime. Every write bumps `updated_at`.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Inserts a new `pending` order. The display id is the next number in the tenant's sequence for `business_day`,
    /// assigned atomically with the insert. `total_price` is computed from the items.
    async fn insert_order(
        &self,
        order: NewOrder,
        business_day: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Order, StorageError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorageError>;

    async fn update_order_status(
        &self,
        id: &OrderId,
        expected: OrderStatusType,
        status: OrderStatusType,
    ) -> Result<Option<Order>, StorageError>;

    /// Moves the order to `printed` and clears its print request in one write.
    async fn mark_order_printed(&self, id: &OrderId, expected: OrderStatusType) -> Result<Option<Order>, StorageError>;

    /// Puts the order back to `pending`, whatever its current status.
    async fn reset_order_status(&self, id: &OrderId) -> Result<Option<Order>, StorageError>;

    /// Sets (`true`) or clears (`false`) the print-requested timestamp. The status is left alone.
    async fn set_print_requested(&self, id: &OrderId, requested: bool) -> Result<Option<Order>, StorageError>;

    /// Replaces the order's items and recomputes its total in the same write.
    async fn update_order_items(&self, id: &OrderId, items: Vec<LineItem>) -> Result<Option<Order>, StorageError>;

    /// The tenant's orders inside the feed window, scheduled orders first (soonest first), then newest first.
    async fn fetch_feed_orders(
        &self,
        tenant_id: &TenantId,
        window: FeedWindow,
        limit: i64,
    ) -> Result<Vec<Order>, StorageError>;
}
