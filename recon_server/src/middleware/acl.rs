//! Access control list middleware.
//! This middleware can be placed on any route or service inside the `/api` scope.
//!
//! It reads the [`AuthenticatedUser`] left in the request extensions by the identity middleware and checks the user's
//! roles against the required roles for the route. If the user has every required role, the request continues.
//! Otherwise, a 403 Forbidden response is returned.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;

use crate::auth::{AuthenticatedUser, Role};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
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
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let user = req.extensions().get::<AuthenticatedUser>().cloned().ok_or_else(|| {
                warn!("💻️ No authenticated user found in request extensions");
                ErrorUnauthorized("No authenticated user")
            })?;
            if required_roles.iter().all(|role| user.has_role(*role)) {
                service.call(req).await
            } else {
                debug!("💻️ {} does not have the roles needed for {}", user.user_id, req.path());
                Err(ErrorForbidden("Insufficient permissions"))
            }
        })
    }
}
