use log::*;

use crate::{
    db_types::{NewUser, User, UserId},
    engine_api::errors::AuthApiError,
    traits::{TenantManagement, UserManagement},
};

/// Operator logins.
pub struct AuthApi<B> {
    db: B,
}

impl<B> AuthApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuthApi<B>
where B: UserManagement + TenantManagement
{
    /// Checks a username and password. When `tenant_slug` is given, only that tenant's users are considered.
    pub async fn login(&self, username: &str, password: &str, tenant_slug: Option<&str>) -> Result<User, AuthApiError> {
        verify_user_password(&self.db, username, password, tenant_slug).await
    }

    pub async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, AuthApiError> {
        Ok(self.db.fetch_user(id).await?)
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User, AuthApiError> {
        Ok(self.db.insert_user(user).await?)
    }
}

/// Finds the user with the given username whose password matches. Users of deactivated tenants are skipped; if they
/// were the only match, the result is `TenantUnavailable`.
pub(crate) async fn verify_user_password<B>(
    db: &B,
    username: &str,
    password: &str,
    tenant_slug: Option<&str>,
) -> Result<User, AuthApiError>
where
    B: UserManagement + TenantManagement,
{
    let tenant_filter = match tenant_slug {
        Some(slug) => {
            let tenant = db
                .fetch_tenant_by_slug(slug)
                .await?
                .filter(|t| t.active)
                .ok_or_else(|| AuthApiError::TenantUnavailable(slug.to_string()))?;
            Some(tenant.id)
        },
        None => None,
    };
    let candidates = db.fetch_users_by_username(username).await?;
    let mut refused_tenant = None;
    for user in candidates {
        if let Some(tenant_id) = &tenant_filter {
            if user.tenant_id.as_ref() != Some(tenant_id) {
                continue;
            }
        }
        match password_matches(password, &user.password_hash).await {
            Ok(true) => {},
            Ok(false) => continue,
            Err(e) => {
                warn!("🔐️ Could not check the password of user {}. {e}", user.id);
                continue;
            },
        }
        if let Some(tenant_id) = &user.tenant_id {
            let active = db.fetch_tenant(tenant_id).await?.map(|t| t.active).unwrap_or(false);
            if !active {
                info!("🔐️ User {} belongs to deactivated tenant {tenant_id}", user.id);
                refused_tenant.get_or_insert_with(|| tenant_id.to_string());
                continue;
            }
        }
        debug!("🔐️ User {} ({username}) authenticated", user.id);
        return Ok(user);
    }
    if let Some(tenant) = refused_tenant {
        return Err(AuthApiError::TenantUnavailable(tenant));
    }
    debug!("🔐️ Password check failed for {username}");
    Err(AuthApiError::InvalidCredentials)
}

async fn password_matches(password: &str, hash: &str) -> Result<bool, AuthApiError> {
    let password = password.to_string();
    let hash = hash.to_string();
    // bcrypt is deliberately slow; keep it off the async workers
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthApiError::PasswordHashError(e.to_string()))?
        .map_err(|e| AuthApiError::PasswordHashError(e.to_string()))
}
