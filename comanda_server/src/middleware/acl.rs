//! Access control list middleware for the comanda server.
//! This middleware can be placed on any route or service inside the credentials middleware.
//!
//! It checks that the request was authenticated, and that the credential mechanism that authenticated it is one the
//! route accepts. Requests without a principal get a 401, and requests authenticated by any other mechanism get a
//! 403.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use comanda_engine::{AuthMethod, Principal};
use futures::future::LocalBoxFuture;
use log::*;

use crate::errors::{AuthError, ServerError};

pub struct AclMiddlewareFactory {
    accepted: Vec<AuthMethod>,
}

impl AclMiddlewareFactory {
    pub fn new(accepted: &[AuthMethod]) -> Self {
        AclMiddlewareFactory { accepted: accepted.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { accepted: self.accepted.clone(), service: Rc::new(service) }))
    }
}

pub struct AclMiddlewareService<S> {
    accepted: Vec<AuthMethod>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let method = req.extensions().get::<Principal>().map(|p| p.method);
        let accepted = method.is_some_and(|m| self.accepted.contains(&m));
        Box::pin(async move {
            match method {
                None => {
                    debug!("🔐️ Unauthenticated request to {}", req.path());
                    Err(ServerError::AuthenticationError(AuthError::Unauthenticated).into())
                },
                Some(m) if !accepted => {
                    info!("🔐️ {} does not accept {m} credentials", req.path());
                    Err(ServerError::AuthenticationError(AuthError::CredentialNotAccepted(m.to_string())).into())
                },
                Some(_) => service.call(req).await,
            }
        })
    }
}
