//! Credentials middleware.
//!
//! Collects every credential a request carries (session token, API key, Basic credentials and a signed `X-Tenant-Id`
//! header), hands them to the [`TenantResolver`] and stores the resulting [`Principal`] in the request extensions.
//!
//! This middleware never rejects a request by itself. Requests whose credentials do not resolve simply carry no
//! principal, and it is up to the [`AclMiddlewareFactory`](super::AclMiddlewareFactory) on each route (or the
//! [`Caller`](crate::auth::Caller) extractor) to turn that into a 401.
use std::{
    collections::HashMap,
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
    HttpRequest,
};
use comanda_engine::{
    traits::{TenantManagement, UserManagement},
    Credentials,
    ResolvePolicy,
    SignedTenantHeader,
    TenantResolver,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::auth::{basic_credentials, session_token, SessionIssuer};

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const API_KEY_QUERY_PARAM: &str = "api_key";
pub const TENANT_ID_HEADER: &str = "X-Tenant-Id";
pub const TENANT_SIGNATURE_HEADER: &str = "X-Tenant-Signature";

pub struct CredentialsMiddlewareFactory<B> {
    resolver: web::Data<TenantResolver<B>>,
    sessions: SessionIssuer,
}

impl<B> CredentialsMiddlewareFactory<B> {
    pub fn new(resolver: web::Data<TenantResolver<B>>, sessions: SessionIssuer) -> Self {
        Self { resolver, sessions }
    }
}

impl<S, Bd, B> Transform<S, ServiceRequest> for CredentialsMiddlewareFactory<B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Bd>, Error = Error> + 'static,
    S::Future: 'static,
    Bd: 'static,
    B: TenantManagement + UserManagement + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<Bd>;
    type Transform = CredentialsMiddlewareService<S, B>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CredentialsMiddlewareService {
            resolver: self.resolver.clone(),
            sessions: self.sessions.clone(),
            service: Rc::new(service),
        }))
    }
}

pub struct CredentialsMiddlewareService<S, B> {
    resolver: web::Data<TenantResolver<B>>,
    sessions: SessionIssuer,
    service: Rc<S>,
}

impl<S, Bd, B> Service<ServiceRequest> for CredentialsMiddlewareService<S, B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<Bd>, Error = Error> + 'static,
    S::Future: 'static,
    Bd: 'static,
    B: TenantManagement + UserManagement + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<Bd>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let resolver = self.resolver.clone();
        let creds = collect_credentials(req.request(), &self.sessions);
        Box::pin(async move {
            if creds.is_empty() {
                trace!("🔐️ No credentials on request to {}", req.path());
                return service.call(req).await;
            }
            match resolver.resolve(&creds, ResolvePolicy::Strict).await {
                Ok(principal) => {
                    trace!("🔐️ Request to {} resolved to {principal:?}", req.path());
                    req.extensions_mut().insert(principal);
                },
                Err(e) => debug!("🔐️ Credentials on request to {} did not resolve. {e}", req.path()),
            }
            service.call(req).await
        })
    }
}

/// Gathers the credentials a request presents. Session tokens are checked here, since only a verified token can
/// name a user; everything else is checked by the resolver.
pub fn collect_credentials(req: &HttpRequest, sessions: &SessionIssuer) -> Credentials {
    let session_user = session_token(req).and_then(|token| match sessions.verify_token(&token) {
        Ok(claims) => Some(claims.user_id),
        Err(e) => {
            debug!("🔐️ Ignoring session token. {e}");
            None
        },
    });
    let api_key = header_value(req, API_KEY_HEADER).or_else(|| {
        web::Query::<HashMap<String, String>>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.get(API_KEY_QUERY_PARAM).cloned())
            .filter(|k| !k.is_empty())
    });
    let tenant_header = match (header_value(req, TENANT_ID_HEADER), header_value(req, TENANT_SIGNATURE_HEADER)) {
        (Some(value), Some(signature)) => Some(SignedTenantHeader { value, signature }),
        (Some(value), None) => {
            warn!("🔐️ Ignoring unsigned {TENANT_ID_HEADER} header '{value}'");
            None
        },
        _ => None,
    };
    Credentials { session_user, api_key, basic: basic_credentials(req), tenant_header }
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
