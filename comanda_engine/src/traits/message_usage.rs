use crate::{db_types::TenantId, traits::StorageError};

/// Per-tenant, per-period outbound message counters. A period is a `YYYY-MM` string.
#[allow(async_fn_in_trait)]
pub trait MessageUsageManagement {
    /// The current count, or zero if nothing has been recorded for the period.
    async fn fetch_message_count(&self, tenant_id: &TenantId, period: &str) -> Result<i64, StorageError>;

    /// Unconditionally adds `count` to the counter and returns the new value.
    async fn increment_message_count(&self, tenant_id: &TenantId, period: &str, count: i64)
        -> Result<i64, StorageError>;

    /// Adds `count` to the counter only if the result stays within `limit`, as a single atomic write.
    /// Returns the new value, or `None` if admitting `count` more messages would exceed the limit.
    async fn try_reserve_messages(
        &self,
        tenant_id: &TenantId,
        period: &str,
        count: i64,
        limit: i64,
    ) -> Result<Option<i64>, StorageError>;

    /// Gives back `count` previously reserved messages. The counter never drops below zero.
    async fn release_messages(&self, tenant_id: &TenantId, period: &str, count: i64) -> Result<i64, StorageError>;
}
