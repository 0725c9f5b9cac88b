use chrono::{DateTime, Utc};
use comanda_engine::{
    db_types::{LineItem, NewOrder, Order, OrderId, OrderStatusType, TenantId},
    helpers::FeedWindow,
    traits::{MessageSendError, MessageSender, OrderManagement, StorageError},
};
use mockall::mock;

mock! {
    pub OrderStore {}
    impl OrderManagement for OrderStore {
        async fn insert_order(&self, order: NewOrder, business_day: &str, created_at: DateTime<Utc>) -> Result<Order, StorageError>;
        async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorageError>;
        async fn update_order_status(&self, id: &OrderId, expected: OrderStatusType, status: OrderStatusType) -> Result<Option<Order>, StorageError>;
        async fn mark_order_printed(&self, id: &OrderId, expected: OrderStatusType) -> Result<Option<Order>, StorageError>;
        async fn reset_order_status(&self, id: &OrderId) -> Result<Option<Order>, StorageError>;
        async fn set_print_requested(&self, id: &OrderId, requested: bool) -> Result<Option<Order>, StorageError>;
        async fn update_order_items(&self, id: &OrderId, items: Vec<LineItem>) -> Result<Option<Order>, StorageError>;
        async fn fetch_feed_orders(&self, tenant_id: &TenantId, window: FeedWindow, limit: i64) -> Result<Vec<Order>, StorageError>;
    }
}

mock! {
    pub Sender {}
    impl MessageSender for Sender {
        async fn send_text(&self, to: &str, body: &str) -> Result<String, MessageSendError>;
    }
}
