use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTenant, SubscriptionStatus, Tenant, TenantId},
    traits::StorageError,
};

pub async fn insert_tenant(tenant: NewTenant, conn: &mut SqliteConnection) -> Result<Tenant, StorageError> {
    let tenant: Tenant = sqlx::query_as(
        r#"
            INSERT INTO tenants (id, slug, name, api_key, active, plan, subscription_status, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(TenantId::random())
    .bind(tenant.slug)
    .bind(tenant.name)
    .bind(tenant.api_key)
    .bind(tenant.plan)
    .bind(SubscriptionStatus::Active)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| StorageError::InsertError("The tenant insert returned no row".to_string()))?;
    debug!("🗃️ Tenant [{}] created with id {}", tenant.slug, tenant.id);
    Ok(tenant)
}

pub async fn fetch_tenant(id: &TenantId, conn: &mut SqliteConnection) -> Result<Option<Tenant>, StorageError> {
    let tenant = sqlx::query_as("SELECT * FROM tenants WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tenant)
}

pub async fn fetch_tenant_by_api_key(
    api_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Tenant>, StorageError> {
    let tenant = sqlx::query_as("SELECT * FROM tenants WHERE api_key = $1").bind(api_key).fetch_optional(conn).await?;
    Ok(tenant)
}

pub async fn fetch_tenant_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Option<Tenant>, StorageError> {
    let tenant = sqlx::query_as("SELECT * FROM tenants WHERE slug = $1").bind(slug).fetch_optional(conn).await?;
    Ok(tenant)
}

pub async fn fetch_first_active_tenant(conn: &mut SqliteConnection) -> Result<Option<Tenant>, StorageError> {
    let tenant = sqlx::query_as("SELECT * FROM tenants WHERE active = TRUE ORDER BY created_at ASC LIMIT 1")
        .fetch_optional(conn)
        .await?;
    Ok(tenant)
}

pub async fn fetch_tenants(conn: &mut SqliteConnection) -> Result<Vec<Tenant>, StorageError> {
    let tenants = sqlx::query_as("SELECT * FROM tenants ORDER BY created_at ASC").fetch_all(conn).await?;
    Ok(tenants)
}

pub async fn set_tenant_active(
    id: &TenantId,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Tenant>, StorageError> {
    let tenant = sqlx::query_as("UPDATE tenants SET active = $1 WHERE id = $2 RETURNING *")
        .bind(active)
        .bind(id)
        .fetch_all(conn)
        .await?
        .pop();
    debug!("🗃️ Tenant {id} active flag set to {active}");
    Ok(tenant)
}
