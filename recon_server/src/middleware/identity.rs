//! Identity middleware.
//!
//! Wrap the `/api` scope with this middleware. It reads the identity headers set by the upstream gateway (see
//! [`crate::auth`]) and rejects the request with 401 Unauthorized if no user id was supplied. Otherwise the
//! [`AuthenticatedUser`] is stored in the request extensions for the ACL middleware and handlers to use.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{auth::AuthenticatedUser, config::IdentityConfig};

pub struct IdentityMiddlewareFactory {
    config: IdentityConfig,
}

impl IdentityMiddlewareFactory {
    pub fn new(config: IdentityConfig) -> Self {
        IdentityMiddlewareFactory { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService { config: self.config.clone(), service: Rc::new(service) }))
    }
}

pub struct IdentityMiddlewareService<S> {
    config: IdentityConfig,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
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
        let user = AuthenticatedUser::from_headers(req.headers(), &self.config);
        Box::pin(async move {
            match user {
                Ok(user) => {
                    trace!("💻️ Request for {} from {}", req.path(), user.user_id);
                    req.extensions_mut().insert(user);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("💻️ Rejecting request for {}. {e}", req.path());
                    Err(ErrorUnauthorized(e.to_string()))
                },
            }
        })
    }
}
