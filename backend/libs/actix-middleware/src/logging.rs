//! Request logging
//!
//! One structured event per finished request, carrying the caller resolved
//! by [`AuthGate`](crate::AuthGate). The level follows the response: server
//! errors at `error`, client errors at `warn`, the rest at `info`. Health-check
//! endpoints registered with [`RequestLogging::quiet`] drop to `debug` while
//! they succeed.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::sync::Arc;
use std::time::Instant;

use crate::jwt_auth::RequestIdentity;

/// How a request ended, as far as logging is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ClientError,
    ServerError,
}

impl Outcome {
    pub fn of(status: StatusCode) -> Self {
        if status.is_server_error() {
            Outcome::ServerError
        } else if status.is_client_error() {
            Outcome::ClientError
        } else {
            Outcome::Success
        }
    }
}

#[derive(Clone, Default)]
pub struct RequestLogging {
    quiet_paths: Arc<Vec<String>>,
}

impl RequestLogging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log successful requests to `path` at debug level.
    pub fn quiet(mut self, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.quiet_paths).push(path.into());
        self
    }

    pub fn is_quiet(&self, path: &str) -> bool {
        self.quiet_paths.iter().any(|quiet| quiet == path)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingService {
            service,
            config: self.clone(),
        }))
    }
}

pub struct RequestLoggingService<S> {
    service: S,
    config: RequestLogging,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();
        let quiet = self.config.is_quiet(&path);

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let status = res.status();
            let user_id = res
                .request()
                .extensions()
                .get::<RequestIdentity>()
                .and_then(|identity| identity.0.user_id());
            let duration_ms = start.elapsed().as_millis() as u64;

            match Outcome::of(status) {
                Outcome::ServerError => tracing::error!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    user_id = ?user_id,
                    duration_ms,
                    "request failed"
                ),
                Outcome::ClientError => tracing::warn!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    user_id = ?user_id,
                    duration_ms,
                    "request rejected"
                ),
                Outcome::Success if quiet => tracing::debug!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    duration_ms,
                    "request completed"
                ),
                Outcome::Success => tracing::info!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    authenticated = user_id.is_some(),
                    user_id = ?user_id,
                    duration_ms,
                    "request completed"
                ),
            }

            Ok(res)
        })
    }
}
