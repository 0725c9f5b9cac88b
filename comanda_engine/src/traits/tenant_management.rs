use crate::{
    db_types::{NewTenant, NewUser, Tenant, TenantId, User, UserId},
    traits::StorageError,
};

/// Tenant lookups. Lookups return deactivated tenants too; callers that authenticate must check [`Tenant::active`].
#[allow(async_fn_in_trait)]
pub trait TenantManagement {
    async fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, StorageError>;
    /// Exact match on the tenant's API key.
    async fn fetch_tenant_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>, StorageError>;
    async fn fetch_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StorageError>;
    /// The oldest active tenant, by creation time.
    async fn fetch_first_active_tenant(&self) -> Result<Option<Tenant>, StorageError>;
    async fn fetch_tenants(&self) -> Result<Vec<Tenant>, StorageError>;
    async fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, StorageError>;
    async fn set_tenant_active(&self, id: &TenantId, active: bool) -> Result<Option<Tenant>, StorageError>;
}

#[allow(async_fn_in_trait)]
pub trait UserManagement {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;
    /// All users with the given username, across tenants, oldest first.
    async fn fetch_users_by_username(&self, username: &str) -> Result<Vec<User>, StorageError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, StorageError>;
}
