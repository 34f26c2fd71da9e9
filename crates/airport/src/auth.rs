// Copyright the Airport authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bearer-token extraction and the `Authenticator` capability a host
//! process plugs in.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::HeaderValue;
use tower::{Layer, Service};

use crate::error::AirportError;
use crate::request::RequestContext;

/// Identity produced by a successful `Authenticator::authenticate` call.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub subject: String,
}

impl AuthIdentity {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into() }
    }
}

/// Host-supplied bearer-token validator. `None` (no authenticator
/// configured) means "no auth" and is handled by the caller, not by this
/// trait.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthIdentity, AirportError>;
}

/// Extracts `authorization: Bearer <token>`, strips the `Bearer ` prefix,
/// and runs it through the configured authenticator.
///
/// An authenticator that is configured but handed an empty token MUST
/// reject it; we enforce that here rather than trusting callback authors.
#[derive(Clone)]
pub struct AuthLayer {
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl AuthLayer {
    #[must_use]
    pub fn new(authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        Self { authenticator }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware { inner, authenticator: self.authenticator.clone() }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    authenticator: Option<Arc<dyn Authenticator>>,
}

fn extract_bearer(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for AuthMiddleware<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ResBody: Default,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authenticator = self.authenticator.clone();
        let token = extract_bearer(req.headers()).map(str::to_owned);

        let context = req.extensions().get::<Arc<RequestContext>>().cloned();

        Box::pin(async move {
            if let Some(authenticator) = authenticator {
                let token = token.unwrap_or_default();
                match authenticator.authenticate(&token).await {
                    Ok(identity) => {
                        if let Some(context) = &context {
                            context.set_identity(identity);
                        }
                    }
                    Err(err) => return Ok(status_response(err.into())),
                }
            }
            inner.call(req).await
        })
    }
}

/// Builds the gRPC-status-as-trailers response every middleware layer MUST
/// use to reject a request: tonic's generated server `Service` never
/// surfaces an `Err` at the HTTP layer (every RPC outcome, success or
/// failure, is an `Ok` HTTP response carrying a `grpc-status` trailer), so
/// short-circuiting here means building that response ourselves rather than
/// returning `Err`.
fn status_response<ResBody: Default>(status: tonic::Status) -> http::Response<ResBody> {
    let mut response = http::Response::new(ResBody::default());
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    if let Ok(code) = http::HeaderValue::from_str(&(status.code() as i32).to_string()) {
        headers.insert("grpc-status", code);
    }
    if let Ok(message) = http::HeaderValue::from_str(status.message()) {
        headers.insert("grpc-message", message);
    }
    response
}
