use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header::AUTHORIZATION, header::HeaderMap, StatusCode},
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use crypto_core::{Identity, TokenError, TokenService};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// What happens to a request without a valid session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Continue as `Identity::Anonymous`.
    Soft,
    /// Reject with 401 before the handler runs.
    Hard,
}

/// Why a request could not be authenticated.
#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] TokenError),
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": self.to_string(),
            "kind": "AuthenticationError",
        }))
    }
}

/// Identity attached to the request by [`AuthGate`].
///
/// Routes without a gate extract `Identity::Anonymous`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity(pub Identity);

impl RequestIdentity {
    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl FromRequest for RequestIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<RequestIdentity>()
            .cloned()
            .unwrap_or_default()))
    }
}

/// Resolve the bearer token in `headers` into an identity.
pub fn resolve_identity(
    tokens: &TokenService,
    headers: &HeaderMap,
) -> Result<Identity, AuthRejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?
        .to_str()
        .map_err(|_| AuthRejection::MalformedHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthRejection::MalformedHeader)?;

    let claims = tokens.verify(token).map_err(AuthRejection::InvalidToken)?;
    Identity::from_claims(&claims).map_err(AuthRejection::InvalidToken)
}

/// Session-token gate, configured per route.
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
    mode: AuthMode,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>, mode: AuthMode) -> Self {
        Self { tokens, mode }
    }

    pub fn soft(tokens: Arc<TokenService>) -> Self {
        Self::new(tokens, AuthMode::Soft)
    }

    pub fn hard(tokens: Arc<TokenService>) -> Self {
        Self::new(tokens, AuthMode::Hard)
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGateService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
            mode: self.mode,
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
    mode: AuthMode,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let tokens = self.tokens.clone();
        let mode = self.mode;

        Box::pin(async move {
            let identity = match resolve_identity(&tokens, req.headers()) {
                Ok(identity) => identity,
                Err(AuthRejection::MissingHeader) if mode == AuthMode::Soft => Identity::Anonymous,
                Err(rejection) => match mode {
                    AuthMode::Soft => {
                        tracing::debug!(path = %req.path(), reason = %rejection, "continuing anonymously");
                        Identity::Anonymous
                    }
                    AuthMode::Hard => {
                        tracing::warn!(path = %req.path(), reason = %rejection, "request rejected by auth gate");
                        let response = rejection.error_response();
                        return Ok(req.into_response(response).map_into_right_body());
                    }
                },
            };

            req.extensions_mut().insert(RequestIdentity(identity));

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
