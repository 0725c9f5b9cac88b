//! Monthly message counters.
//!
//! Admission against the quota is a single conditional `UPDATE`, so concurrent senders can never push a counter past
//! its limit.
use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{db_types::TenantId, traits::StorageError};

pub async fn fetch_message_count(
    tenant_id: &TenantId,
    period: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, StorageError> {
    let count: Option<i64> = sqlx::query_scalar("SELECT count FROM message_usage WHERE tenant_id = $1 AND period = $2")
        .bind(tenant_id)
        .bind(period)
        .fetch_optional(conn)
        .await?;
    Ok(count.unwrap_or(0))
}

pub async fn increment_message_count(
    tenant_id: &TenantId,
    period: &str,
    count: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, StorageError> {
    let total: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO message_usage (tenant_id, period, count, updated_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, period) DO UPDATE SET count = count + excluded.count, updated_at = excluded.updated_at
            RETURNING count;
        "#,
    )
    .bind(tenant_id)
    .bind(period)
    .bind(count)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| StorageError::InsertError("The usage upsert returned no row".to_string()))?;
    debug!("📊️ Message usage for {tenant_id} in {period} is now {total}");
    Ok(total)
}

async fn ensure_usage_row(tenant_id: &TenantId, period: &str, conn: &mut SqliteConnection) -> Result<(), StorageError> {
    sqlx::query(
        r#"
            INSERT INTO message_usage (tenant_id, period, count, updated_at) VALUES ($1, $2, 0, $3)
            ON CONFLICT (tenant_id, period) DO NOTHING;
        "#,
    )
    .bind(tenant_id)
    .bind(period)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn try_reserve_messages(
    tenant_id: &TenantId,
    period: &str,
    count: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, StorageError> {
    ensure_usage_row(tenant_id, period, conn).await?;
    let total: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE message_usage SET count = count + $3, updated_at = $4
            WHERE tenant_id = $1 AND period = $2 AND count + $3 <= $5
            RETURNING count;
        "#,
    )
    .bind(tenant_id)
    .bind(period)
    .bind(count)
    .bind(Utc::now())
    .bind(limit)
    .fetch_all(conn)
    .await?
    .pop();
    match total {
        Some(t) => trace!("📊️ Reserved {count} message(s) for {tenant_id} in {period}. Usage is now {t}/{limit}"),
        None => debug!("📊️ Reservation of {count} message(s) for {tenant_id} in {period} refused. Limit is {limit}"),
    }
    Ok(total)
}

pub async fn release_messages(
    tenant_id: &TenantId,
    period: &str,
    count: i64,
    conn: &mut SqliteConnection,
) -> Result<i64, StorageError> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE message_usage SET count = MAX(count - $3, 0), updated_at = $4
            WHERE tenant_id = $1 AND period = $2
            RETURNING count;
        "#,
    )
    .bind(tenant_id)
    .bind(period)
    .bind(count)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .pop();
    let total = total.unwrap_or(0);
    debug!("📊️ Released {count} message(s) for {tenant_id} in {period}. Usage is now {total}");
    Ok(total)
}
