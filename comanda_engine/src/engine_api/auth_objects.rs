use std::fmt::Display;

use comanda_common::Secret;
use serde::{Deserialize, Serialize};

use crate::db_types::{TenantId, UserId};

/// The credential mechanism that authenticated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// A signed session token, issued at login
    Session,
    /// A tenant API key, from the `X-API-Key` header or `api_key` query parameter
    ApiKey,
    /// HTTP Basic username and password
    Basic,
    /// An `X-Tenant-Id` header carrying a valid HMAC signature from an internal caller
    SignedTenantHeader,
}

pub const ANY_CREDENTIAL: &[AuthMethod] =
    &[AuthMethod::Session, AuthMethod::ApiKey, AuthMethod::Basic, AuthMethod::SignedTenantHeader];

impl Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Session => write!(f, "session"),
            AuthMethod::ApiKey => write!(f, "api key"),
            AuthMethod::Basic => write!(f, "basic auth"),
            AuthMethod::SignedTenantHeader => write!(f, "signed tenant header"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: Secret<String>,
}

impl BasicCredentials {
    pub fn new<S: Into<String>>(username: S, password: S) -> Self {
        Self { username: username.into(), password: Secret::new(password.into()) }
    }
}

/// The value of an `X-Tenant-Id` header and the signature that came with it.
#[derive(Debug, Clone)]
pub struct SignedTenantHeader {
    pub value: String,
    pub signature: String,
}

/// Everything a request presented that could identify a tenant. Collected by the transport layer; nothing in here
/// has been checked yet, except the session identity, which comes from a token whose signature was verified.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub session_user: Option<UserId>,
    pub api_key: Option<String>,
    pub basic: Option<BasicCredentials>,
    pub tenant_header: Option<SignedTenantHeader>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.session_user.is_none() && self.api_key.is_none() && self.basic.is_none() && self.tenant_header.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// A super-admin resolves to no tenant at all
    Strict,
    /// A super-admin without a tenant watches the oldest active tenant. Used by inbox-style views such as the live
    /// order feed.
    InboxFallback,
}

/// The authenticated caller of a request.
///
/// `tenant` is `None` only for super-admins, i.e. users that do not belong to any tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub tenant: Option<TenantId>,
    pub user: Option<UserId>,
    pub method: AuthMethod,
}

impl Principal {
    pub fn for_tenant(tenant: TenantId, method: AuthMethod) -> Self {
        Self { tenant: Some(tenant), user: None, method }
    }

    pub fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn is_super_admin(&self) -> bool {
        self.tenant.is_none()
    }

    pub fn scope(&self) -> TenantScope {
        match &self.tenant {
            Some(t) => TenantScope::Tenant(t.clone()),
            None => TenantScope::AllTenants,
        }
    }
}

/// The set of tenants whose data a caller may touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(TenantId),
    AllTenants,
}

impl TenantScope {
    pub fn permits(&self, tenant: &TenantId) -> bool {
        match self {
            TenantScope::Tenant(t) => t == tenant,
            TenantScope::AllTenants => true,
        }
    }
}
