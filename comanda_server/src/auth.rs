//! Operator sessions and the request-side view of authentication.
//!
//! Sessions are HS256 JWTs, issued by `/auth/login` and presented either in the `comanda_session` cookie or as a
//! bearer token. The token only proves who the user is; which tenant the request acts for is decided afresh by the
//! tenant resolver on every request, so deactivating a tenant takes effect immediately.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header, FromRequest, HttpRequest};
use chrono::Duration;
use comanda_engine::{
    db_types::{TenantId, User, UserId},
    BasicCredentials,
    Principal,
};
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt,
    Claims,
    Header,
    TimeOptions,
    UntrustedToken,
};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const SESSION_COOKIE: &str = "comanda_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: UserId,
    /// `None` for super-admins
    pub tenant_id: Option<TenantId>,
    pub role: String,
}

impl From<&User> for SessionClaims {
    fn from(user: &User) -> Self {
        Self { user_id: user.id.clone(), tenant_id: user.tenant_id.clone(), role: user.role.clone() }
    }
}

/// Signs and checks session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    key: Hs256Key,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = Hs256Key::new(config.session_secret.reveal().as_bytes());
        Self { key, ttl: config.session_ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue_token(&self, claims: SessionClaims) -> Result<String, AuthError> {
        let header = Header::empty().with_token_type("JWT");
        let claims = Claims::new(claims).set_duration_and_issuance(&TimeOptions::default(), self.ttl);
        Hs256.token(&header, &claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }

    /// Checks the signature and expiry of a session token and returns its claims.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let untrusted = UntrustedToken::new(token).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token = Hs256
            .validator::<SessionClaims>(&self.key)
            .validate(&untrusted)
            .map_err(|e| AuthError::ValidationError(e.to_string()))?;
        token.claims().validate_expiration(&TimeOptions::default()).map_err(|e| AuthError::ValidationError(e.to_string()))?;
        Ok(token.claims().custom.clone())
    }
}

/// The session token of a request: the `comanda_session` cookie, or else an `Authorization: Bearer` header.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    authorization_value(req, "Bearer ").map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Decodes `Authorization: Basic <base64(username:password)>`. Malformed values are ignored.
pub fn basic_credentials(req: &HttpRequest) -> Option<BasicCredentials> {
    let encoded = authorization_value(req, "Basic ")?;
    let decoded = base64::decode(encoded.trim())
        .map_err(|e| debug!("🔐️ Ignoring Basic credentials that are not valid base64. {e}"))
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    if username.is_empty() {
        return None;
    }
    Some(BasicCredentials::new(username, password))
}

fn authorization_value<'a>(req: &'a HttpRequest, scheme: &str) -> Option<&'a str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let prefix = value.get(..scheme.len())?;
    prefix.eq_ignore_ascii_case(scheme).then(|| &value[scheme.len()..])
}

/// The authenticated caller of a request, as resolved by the credentials middleware.
///
/// Extracting a `Caller` from a request that carried no valid credentials fails with a 401.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl Caller {
    pub fn principal(&self) -> &Principal {
        &self.0
    }

    pub fn into_inner(self) -> Principal {
        self.0
    }
}

impl FromRequest for Caller {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = req
            .extensions()
            .get::<Principal>()
            .cloned()
            .map(Caller)
            .ok_or(ServerError::AuthenticationError(AuthError::Unauthenticated));
        ready(result)
    }
}
