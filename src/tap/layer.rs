//! The intercepting middleware.
//!
//! [`TapLayer`] wraps any `Service<Request<Body>>` and emits one
//! [`CapturedRecord`] per request without changing what either side sees:
//!
//! 1. Buffer the inbound body; an unreadable body ends the request with 500.
//! 2. Hand the inner service a fresh body over the same bytes.
//! 3. Wrap the response body in a [`CapturingBody`].
//! 4. When the response body is finished, dispatch the raw exchange.
//!
//! The exchange is reported at end of body rather than when the inner future
//! resolves, because the body streams to the client after that point. If the
//! host drops the request before a response exists (client gone, upstream
//! still thinking), a `PendingExchange` guard reports it with an empty
//! response body.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::{BoxError, Layer, Service};

use crate::capture::{generate_correlation_id, CapturingBody, Exchange};
use crate::config::TapConfig;
use crate::error::TapError;
use crate::observability::metrics;
use crate::report::Reporter;

/// Correlation ID of the current exchange.
///
/// Inserted into request extensions so in-process handlers can log it. It is
/// never written to headers, so the forwarded request is unchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Layer that applies [`TapService`] to an inner service.
#[derive(Debug, Clone)]
pub struct TapLayer {
    reporter: Reporter,
    include_correlation_id: bool,
}

impl TapLayer {
    /// Build the layer. Fails without a valid collector URL.
    pub fn new(config: &TapConfig) -> Result<Self, TapError> {
        Ok(Self::with_reporter(
            Reporter::from_config(config)?,
            config.include_correlation_id,
        ))
    }

    pub fn with_reporter(reporter: Reporter, include_correlation_id: bool) -> Self {
        Self {
            reporter,
            include_correlation_id,
        }
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }
}

impl<S> Layer<S> for TapLayer {
    type Service = TapService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TapService {
            inner,
            reporter: self.reporter.clone(),
            include_correlation_id: self.include_correlation_id,
        }
    }
}

/// Middleware that captures each exchange and reports it off the request path.
#[derive(Debug, Clone)]
pub struct TapService<S> {
    inner: S,
    reporter: Reporter,
    include_correlation_id: bool,
}

impl<S, B> Service<Request<Body>> for TapService<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The readied service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(intercept(
            inner,
            request,
            self.reporter.clone(),
            self.include_correlation_id,
        ))
    }
}

async fn intercept<S, B>(
    mut inner: S,
    request: Request<Body>,
    reporter: Reporter,
    include_correlation_id: bool,
) -> Result<Response<Body>, S::Error>
where
    S: Service<Request<Body>, Response = Response<B>>,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let (mut parts, body) = request.into_parts();

    let request_body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return Ok(read_failure());
        }
    };

    let correlation_id = include_correlation_id.then(generate_correlation_id);
    if let Some(id) = &correlation_id {
        parts.extensions.insert(CorrelationId(id.clone()));
    }
    let path = parts.uri.path().to_owned();

    tracing::debug!(
        correlation_id = correlation_id.as_deref().unwrap_or("-"),
        path = %path,
        request_bytes = request_body.len(),
        "Tapping request"
    );

    let request = Request::from_parts(parts, Body::from(request_body.clone()));
    let mut pending = PendingExchange::arm(InFlight {
        reporter,
        correlation_id,
        request_body,
        path,
        started,
    });
    let response = inner.call(request).await?;

    let exchange = pending.disarm();
    let (parts, body) = response.into_parts();
    let body = CapturingBody::new(body, move |response_body| {
        if let Some(exchange) = exchange {
            exchange.finish(response_body);
        }
    });

    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Everything known about an exchange before its response body exists.
struct InFlight {
    reporter: Reporter,
    correlation_id: Option<String>,
    request_body: Bytes,
    path: String,
    started: Instant,
}

impl InFlight {
    fn finish(self, response_body: Bytes) {
        let elapsed = self.started.elapsed();
        metrics::record_exchange(elapsed);
        self.reporter.dispatch(Exchange {
            correlation_id: self.correlation_id,
            request_body: self.request_body,
            response_body,
            elapsed,
            path: self.path,
        });
    }
}

/// Reports an exchange with an empty response body if dropped while armed.
///
/// Covers the window between forwarding the request and receiving response
/// headers, where the host may drop the whole future.
struct PendingExchange(Option<InFlight>);

impl PendingExchange {
    fn arm(exchange: InFlight) -> Self {
        Self(Some(exchange))
    }

    fn disarm(&mut self) -> Option<InFlight> {
        self.0.take()
    }
}

impl Drop for PendingExchange {
    fn drop(&mut self) {
        if let Some(exchange) = self.0.take() {
            tracing::debug!(
                correlation_id = exchange.correlation_id.as_deref().unwrap_or("-"),
                path = %exchange.path,
                "Request abandoned before response, reporting without body"
            );
            exchange.finish(Bytes::new());
        }
    }
}

fn read_failure() -> Response<Body> {
    (StatusCode::INTERNAL_SERVER_ERROR, "failed to read request body").into_response()
}
