use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{items_total, LineItem, NewOrder, Order, OrderId, OrderStatusType, TenantId},
    helpers::FeedWindow,
    traits::StorageError,
};

/// Inserts a new order. The display id is computed in the same statement as the insert, so two orders created at the
/// same time for the same tenant and business day cannot get the same number.
pub async fn insert_order(
    order: NewOrder,
    business_day: &str,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, StorageError> {
    let total_price = order.total_price();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                tenant_id,
                display_id,
                business_day,
                customer_name,
                customer_phone,
                items,
                total_price,
                status,
                fulfillment,
                address,
                scheduled_for,
                created_at,
                updated_at
            )
            SELECT $1, $2, COALESCE(MAX(display_id), 0) + 1, $3, $4, $5, $6, $7, 'pending', $8, $9, $10, $11, $11
            FROM orders WHERE tenant_id = $2 AND business_day = $3
            RETURNING *;
        "#,
    )
    .bind(OrderId::random())
    .bind(order.tenant_id)
    .bind(business_day)
    .bind(order.customer_name)
    .bind(order.customer_phone)
    .bind(Json(order.items))
    .bind(total_price)
    .bind(order.fulfillment)
    .bind(order.address)
    .bind(order.scheduled_for)
    .bind(created_at)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| StorageError::InsertError("The order insert returned no row".to_string()))?;
    debug!("🗃️ Order #{} ({}) inserted for tenant {}", order.display_id, order.id, order.tenant_id);
    Ok(order)
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StorageError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn update_order_status(
    id: &OrderId,
    expected: OrderStatusType,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .bind(expected)
    .fetch_all(conn)
    .await?
    .pop();
    trace!("🗃️ Status update {expected} -> {status} on order {id}. Applied: {}", order.is_some());
    Ok(order)
}

pub async fn mark_order_printed(
    id: &OrderId,
    expected: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, print_requested_at = NULL, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Printed)
    .bind(Utc::now())
    .bind(id)
    .bind(expected)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(order)
}

pub async fn reset_order_status(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StorageError> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(OrderStatusType::Pending)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(conn)
        .await?
        .pop();
    Ok(order)
}

pub async fn set_print_requested(
    id: &OrderId,
    requested: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let now = Utc::now();
    let requested_at = requested.then_some(now);
    let order = sqlx::query_as("UPDATE orders SET print_requested_at = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(requested_at)
        .bind(now)
        .bind(id)
        .fetch_all(conn)
        .await?
        .pop();
    Ok(order)
}

pub async fn update_order_items(
    id: &OrderId,
    items: Vec<LineItem>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorageError> {
    let total_price = items_total(&items);
    let order = sqlx::query_as(
        "UPDATE orders SET items = $1, total_price = $2, updated_at = $3 WHERE id = $4 RETURNING *",
    )
    .bind(Json(items))
    .bind(total_price)
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(order)
}

/// Orders in the feed window for a tenant, at most `limit` of them. Scheduled orders come first, soonest first, so
/// the next order due is at the top. Unscheduled orders follow, newest first.
pub async fn fetch_feed_orders(
    tenant_id: &TenantId,
    window: FeedWindow,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StorageError> {
    let orders = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE tenant_id = $1 AND (
                (scheduled_for IS NULL AND created_at >= $2) OR
                (scheduled_for >= $3 AND scheduled_for < $4)
            )
            ORDER BY scheduled_for IS NULL, scheduled_for ASC, created_at DESC
            LIMIT $5;
        "#,
    )
    .bind(tenant_id)
    .bind(window.created_after)
    .bind(window.scheduled_from)
    .bind(window.scheduled_until)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
