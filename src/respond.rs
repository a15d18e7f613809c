//! Instrumented responders
//!
//! An [`InstrumentedHandler`] decorates a plain [`Respond`] implementation
//! with the load-signal side effects. On every call it:
//!
//! 1. counts the request under `(path, method)`
//! 2. applies the endpoint weight to the load gauge
//! 3. asks the inner responder for the body
//!
//! Steps 1 and 2 always run before the inner responder, whether or not the
//! response ever reaches the client. Delivery is tracked by [`DeliveryBody`]:
//! a body dropped before the transport took its bytes counts as one error.

use crate::metrics::Metrics;
use crate::weights::Weight;
use axum::{
    body::Body,
    http::{HeaderValue, Method, Response, header::CONTENT_TYPE},
};
use bytes::Bytes;
use http_body::{Frame, SizeHint};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Produces a response body
pub trait Respond: Send + Sync + 'static {
    fn respond(&self) -> Bytes;
}

/// Writes the configured display string followed by a newline
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    body: Bytes,
}

impl DisplayMessage {
    pub fn new(message: &str) -> Self {
        Self {
            body: Bytes::from(format!("{}\n", message)),
        }
    }
}

impl Respond for DisplayMessage {
    fn respond(&self) -> Bytes {
        self.body.clone()
    }
}

/// Writes the precomputed help text
#[derive(Debug, Clone)]
pub struct HelpPage {
    body: Bytes,
}

impl HelpPage {
    pub fn new(help: String) -> Self {
        Self {
            body: Bytes::from(help),
        }
    }
}

impl Respond for HelpPage {
    fn respond(&self) -> Bytes {
        self.body.clone()
    }
}

/// Wraps a responder with request counting and gauge updates
pub struct InstrumentedHandler<R> {
    path: Arc<str>,
    weight: Weight,
    metrics: Metrics,
    inner: R,
}

impl<R: Respond> InstrumentedHandler<R> {
    pub fn new(path: impl Into<Arc<str>>, weight: Weight, metrics: Metrics, inner: R) -> Self {
        Self {
            path: path.into(),
            weight,
            metrics,
            inner,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Instrument one request and build its response
    pub fn handle(&self, method: &Method) -> Response<Body> {
        self.metrics.increment_request(&self.path, method.as_str());
        self.metrics.apply_weight(self.weight);

        tracing::debug!(
            handler = %self.path,
            method = %method,
            weight = %self.weight,
            load = self.metrics.load(),
            "Instrumented request"
        );

        let chunk = self.inner.respond();

        // HEAD responses never carry a body, so there is nothing to deliver.
        let body = if *method == Method::HEAD {
            Body::empty()
        } else {
            Body::new(DeliveryBody::new(
                chunk,
                self.metrics.clone(),
                Arc::clone(&self.path),
            ))
        };

        let mut response = Response::new(body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        response
    }
}

/// Single-chunk response body that reports undelivered output
///
/// The body counts as delivered once the transport has polled its chunk
/// (or polled past the end). Dropping it earlier means the connection went
/// away before the write happened, which increments `errors_total` once.
pub struct DeliveryBody {
    chunk: Option<Bytes>,
    len: u64,
    delivered: bool,
    metrics: Metrics,
    path: Arc<str>,
}

impl DeliveryBody {
    pub fn new(chunk: Bytes, metrics: Metrics, path: Arc<str>) -> Self {
        Self {
            len: chunk.len() as u64,
            chunk: Some(chunk),
            delivered: false,
            metrics,
            path,
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered
    }
}

impl http_body::Body for DeliveryBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        this.delivered = true;
        Poll::Ready(this.chunk.take().map(|chunk| Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.chunk.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match self.chunk {
            Some(_) => SizeHint::with_exact(self.len),
            None => SizeHint::with_exact(0),
        }
    }
}

impl Drop for DeliveryBody {
    fn drop(&mut self) {
        if !self.delivered {
            self.metrics.increment_error();
            tracing::warn!(
                handler = %self.path,
                bytes = self.len,
                "Response dropped before delivery"
            );
        }
    }
}
