//! Bearer-token middleware for the back-office routes.
//!
//! Every request must carry `Authorization: Bearer <token>`, where the token matches `SFC_ADMIN_TOKEN`. If no token is
//! configured, every request is refused. Tokens are compared in constant time.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use checkout_common::Secret;
use checkout_engine::helpers::constant_time_eq;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::errors::ServerError;

pub struct AdminAuthMiddlewareFactory {
    token: Secret<String>,
}

impl AdminAuthMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminAuthMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddlewareService { token: self.token.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminAuthMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
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
        let authorised = is_authorised(&req, &self.token);
        Box::pin(async move {
            if authorised {
                trace!("🔐️ Back-office token accepted for {}", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Back-office request to {} refused", req.path());
                Err(ServerError::Unauthorized.into())
            }
        })
    }
}

fn is_authorised(req: &ServiceRequest, token: &Secret<String>) -> bool {
    if token.is_empty() {
        return false;
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .is_some_and(|presented| constant_time_eq(presented.trim(), token.reveal()))
}
