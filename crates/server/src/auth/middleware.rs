use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request, header};
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use super::{AuthProvider, Owner};
use crate::error::ServerError;

/// Tower layer that adds authentication middleware.
#[derive(Clone)]
pub struct AuthLayer {
    provider: Option<Arc<AuthProvider>>,
}

impl AuthLayer {
    pub fn new(provider: Option<Arc<AuthProvider>>) -> Self {
        Self { provider }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            provider: self.provider.clone(),
        }
    }
}

/// Tower service that authenticates requests and attaches the [`Owner`].
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    provider: Option<Arc<AuthProvider>>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let provider = self.provider.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(provider) = provider else {
                req.extensions_mut().insert(Owner::anonymous());
                return inner.call(req).await;
            };

            let Some(header_str) = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
            else {
                return Ok(unauthorized(&provider, "missing authentication credentials"));
            };

            match provider.authenticate(header_str) {
                Ok(identifier) => {
                    let owner = Owner::from_identifier(&identifier);
                    tracing::debug!(owner_id = %owner.0, "authenticated request");
                    req.extensions_mut().insert(owner);
                    inner.call(req).await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "authentication failed");
                    Ok(unauthorized(&provider, &e))
                }
            }
        })
    }
}

fn unauthorized(provider: &AuthProvider, message: &str) -> Response {
    let mut response = ServerError::Unauthorized(message.to_owned()).into_response();
    let challenge = match provider {
        AuthProvider::Basic(_) => HeaderValue::from_static("Basic realm=\"fragments\""),
        AuthProvider::Bearer(_) => HeaderValue::from_static("Bearer"),
    };
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, challenge);
    response
}
