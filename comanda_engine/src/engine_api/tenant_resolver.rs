//! Works out which tenant a request acts for.
//!
//! The mechanisms are tried in a fixed order, and the first one that yields a tenant wins:
//!
//! 1. the session identity (the user's tenant),
//! 2. an API key (exact match),
//! 3. HTTP Basic credentials (the user's tenant),
//! 4. a signed `X-Tenant-Id` header. The value is a tenant id, or else a slug or API key.
//!
//! A mechanism that fails, whether from bad credentials or a storage error, is logged and skipped. A super-admin
//! (a user without a tenant) matched by steps 1 or 3 does not stop the search; if nothing later yields a tenant the
//! result is a tenantless super-admin principal, or with [`ResolvePolicy::InboxFallback`], the oldest active tenant.
//!
//! Deactivated tenants never resolve.
use log::*;

use comanda_common::Secret;

use crate::{
    db_types::{Tenant, UserId},
    engine_api::{
        auth_api::verify_user_password,
        auth_objects::{AuthMethod, BasicCredentials, Credentials, Principal, ResolvePolicy, SignedTenantHeader},
        errors::TenantResolverError,
    },
    helpers::verify_hmac,
    traits::{StorageError, TenantManagement, UserManagement},
};

pub struct TenantResolver<B> {
    db: B,
    internal_secret: Option<Secret<String>>,
}

impl<B> TenantResolver<B> {
    /// `internal_secret` is the key internal callers sign `X-Tenant-Id` values with. Without it, the header is
    /// ignored.
    pub fn new(db: B, internal_secret: Option<Secret<String>>) -> Self {
        Self { db, internal_secret }
    }
}

impl<B> TenantResolver<B>
where B: TenantManagement + UserManagement
{
    pub async fn resolve(&self, creds: &Credentials, policy: ResolvePolicy) -> Result<Principal, TenantResolverError> {
        let mut super_admin: Option<Principal> = None;

        if let Some(user_id) = &creds.session_user {
            match self.from_user_id(user_id).await {
                Ok(Some(p)) if p.tenant.is_some() => return Ok(p),
                Ok(Some(p)) => super_admin = Some(p),
                Ok(None) => debug!("🔐️ Session user {user_id} does not resolve to an active account"),
                Err(e) => warn!("🔐️ Session lookup for user {user_id} failed. {e}"),
            }
        }

        if let Some(api_key) = &creds.api_key {
            match self.from_api_key(api_key).await {
                Ok(Some(tenant)) => return Ok(Principal::for_tenant(tenant.id, AuthMethod::ApiKey)),
                Ok(None) => debug!("🔐️ API key does not match an active tenant"),
                Err(e) => warn!("🔐️ API key lookup failed. {e}"),
            }
        }

        if let Some(basic) = &creds.basic {
            match self.from_basic(basic).await {
                Some(p) if p.tenant.is_some() => return Ok(p),
                Some(p) => {
                    super_admin.get_or_insert(p);
                },
                None => {},
            }
        }

        if let Some(header) = &creds.tenant_header {
            match self.from_signed_header(header).await {
                Ok(Some(tenant)) => {
                    let principal = Principal::for_tenant(tenant.id, AuthMethod::SignedTenantHeader);
                    let principal = match super_admin.and_then(|p| p.user) {
                        Some(user) => principal.with_user(user),
                        None => principal,
                    };
                    return Ok(principal);
                },
                Ok(None) => debug!("🔐️ X-Tenant-Id header was not accepted"),
                Err(e) => warn!("🔐️ X-Tenant-Id lookup failed. {e}"),
            }
        }

        match (super_admin, policy) {
            (Some(admin), ResolvePolicy::InboxFallback) => self.with_fallback_tenant(admin).await,
            (Some(admin), ResolvePolicy::Strict) => Ok(admin),
            (None, _) => Err(TenantResolverError::Unauthenticated),
        }
    }

    /// For a tenantless principal, picks the oldest active tenant. Principals that already have a tenant are returned
    /// unchanged, as is a super-admin when there are no active tenants at all.
    pub async fn with_fallback_tenant(&self, principal: Principal) -> Result<Principal, TenantResolverError> {
        if principal.tenant.is_some() {
            return Ok(principal);
        }
        match self.db.fetch_first_active_tenant().await? {
            Some(tenant) => {
                debug!("🔐️ Super-admin defaults to tenant {} ({})", tenant.id, tenant.slug);
                Ok(Principal { tenant: Some(tenant.id), ..principal })
            },
            None => {
                info!("🔐️ There are no active tenants to fall back on");
                Ok(principal)
            },
        }
    }

    async fn from_user_id(&self, user_id: &UserId) -> Result<Option<Principal>, StorageError> {
        let Some(user) = self.db.fetch_user(user_id).await? else {
            return Ok(None);
        };
        match user.tenant_id {
            Some(tenant_id) => {
                let active = self.db.fetch_tenant(&tenant_id).await?.is_some_and(|t| t.active);
                Ok(active.then(|| Principal::for_tenant(tenant_id, AuthMethod::Session).with_user(user.id)))
            },
            None => Ok(Some(Principal { tenant: None, user: Some(user.id), method: AuthMethod::Session })),
        }
    }

    async fn from_api_key(&self, api_key: &str) -> Result<Option<Tenant>, StorageError> {
        let tenant = self.db.fetch_tenant_by_api_key(api_key).await?;
        Ok(tenant.filter(|t| t.active))
    }

    async fn from_basic(&self, basic: &BasicCredentials) -> Option<Principal> {
        match verify_user_password(&self.db, &basic.username, basic.password.reveal(), None).await {
            Ok(user) => {
                let principal = Principal { tenant: user.tenant_id, user: Some(user.id), method: AuthMethod::Basic };
                Some(principal)
            },
            Err(e) => {
                debug!("🔐️ Basic credentials for {} rejected. {e}", basic.username);
                None
            },
        }
    }

    async fn from_signed_header(&self, header: &SignedTenantHeader) -> Result<Option<Tenant>, StorageError> {
        let Some(secret) = &self.internal_secret else {
            debug!("🔐️ Ignoring X-Tenant-Id header. No internal secret is configured");
            return Ok(None);
        };
        let value = header.value.trim();
        if !verify_hmac(secret.reveal(), value.as_bytes(), &header.signature) {
            warn!("🔐️ X-Tenant-Id header '{value}' has an invalid signature");
            return Ok(None);
        }
        let tenant = if uuid::Uuid::parse_str(value).is_ok() {
            self.db.fetch_tenant(&value.into()).await?
        } else {
            match self.db.fetch_tenant_by_slug(value).await? {
                Some(t) => Some(t),
                None => self.db.fetch_tenant_by_api_key(value).await?,
            }
        };
        Ok(tenant.filter(|t| t.active))
    }
}
