//! `SqliteDatabase` is the SQLite implementation of the comanda engine backend traits.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db::{db_url, message_usage, new_pool, orders, tenants, users};
use crate::{
    db_types::{LineItem, NewOrder, NewTenant, NewUser, Order, OrderId, OrderStatusType, Tenant, TenantId, User, UserId},
    helpers::FeedWindow,
    traits::{MessageUsageManagement, OrderManagement, StorageError, TenantManagement, UserManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `COMANDA_DATABASE_URL` environment variable for the url.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl TenantManagement for SqliteDatabase {
    async fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        tenants::fetch_tenant(id, &mut conn).await
    }

    async fn fetch_tenant_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        tenants::fetch_tenant_by_api_key(api_key, &mut conn).await
    }

    async fn fetch_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        tenants::fetch_tenant_by_slug(slug, &mut conn).await
    }

    async fn fetch_first_active_tenant(&self) -> Result<Option<Tenant>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        tenants::fetch_first_active_tenant(&mut conn).await
    }

    async fn fetch_tenants(&self) -> Result<Vec<Tenant>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        tenants::fetch_tenants(&mut conn).await
    }

    async fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = tenants::insert_tenant(tenant, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn set_tenant_active(&self, id: &TenantId, active: bool) -> Result<Option<Tenant>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = tenants::set_tenant_active(id, active, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl UserManagement for SqliteDatabase {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(id, &mut conn).await
    }

    async fn fetch_users_by_username(&self, username: &str) -> Result<Vec<User>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_users_by_username(username, &mut conn).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = users::insert_user(user, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(
        &self,
        order: NewOrder,
        business_day: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::insert_order(order, business_day, created_at, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        expected: OrderStatusType,
        status: OrderStatusType,
    ) -> Result<Option<Order>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::update_order_status(id, expected, status, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn mark_order_printed(&self, id: &OrderId, expected: OrderStatusType) -> Result<Option<Order>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::mark_order_printed(id, expected, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn reset_order_status(&self, id: &OrderId) -> Result<Option<Order>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::reset_order_status(id, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn set_print_requested(&self, id: &OrderId, requested: bool) -> Result<Option<Order>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::set_print_requested(id, requested, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn update_order_items(&self, id: &OrderId, items: Vec<LineItem>) -> Result<Option<Order>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::update_order_items(id, items, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_feed_orders(
        &self,
        tenant_id: &TenantId,
        window: FeedWindow,
        limit: i64,
    ) -> Result<Vec<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_feed_orders(tenant_id, window, limit, &mut conn).await
    }
}

impl MessageUsageManagement for SqliteDatabase {
    async fn fetch_message_count(&self, tenant_id: &TenantId, period: &str) -> Result<i64, StorageError> {
        let mut conn = self.pool.acquire().await?;
        message_usage::fetch_message_count(tenant_id, period, &mut conn).await
    }

    async fn increment_message_count(
        &self,
        tenant_id: &TenantId,
        period: &str,
        count: i64,
    ) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = message_usage::increment_message_count(tenant_id, period, count, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn try_reserve_messages(
        &self,
        tenant_id: &TenantId,
        period: &str,
        count: i64,
        limit: i64,
    ) -> Result<Option<i64>, StorageError> {
        // Row creation and the conditional update commit together
        let mut tx = self.pool.begin().await?;
        let result = message_usage::try_reserve_messages(tenant_id, period, count, limit, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn release_messages(&self, tenant_id: &TenantId, period: &str, count: i64) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await?;
        let result = message_usage::release_messages(tenant_id, period, count, &mut *tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}
