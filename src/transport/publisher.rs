//! Sends messages through a middleware stack ending at the transport.

use std::sync::Arc;
use std::time::Duration;

use super::message::Message;
use super::traits::Transport;
use crate::middleware::{Endpoint, MessageFuture, MiddlewareStack};
use crate::trace::TraceScope;
use crate::{Error, Result};

/// How an outbound message is handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Fire and forget.
    Publish,
    /// Wait up to `timeout` for a single reply.
    Request {
        /// Reply deadline.
        timeout: Duration,
    },
}

/// Terminal endpoint of the outbound chain.
struct TransportEndpoint {
    transport: Arc<dyn Transport>,
    mode: SendMode,
}

impl Endpoint for TransportEndpoint {
    fn call(&self, _scope: TraceScope, message: Message) -> MessageFuture<'_> {
        Box::pin(async move {
            match self.mode {
                SendMode::Publish => {
                    self.transport.publish(message).await?;
                    Ok(None)
                },
                SendMode::Request { timeout } => {
                    self.transport.request(message, timeout).await.map(Some)
                },
            }
        })
    }
}

/// Sends messages through a [`MiddlewareStack`] before they reach the
/// transport.
///
/// The caller's [`TraceScope`] is passed down the stack, so a
/// [`ProducerTracing`](crate::middleware::ProducerTracing) layer opens its span
/// as a child of the span the caller is working in.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::middleware::{MiddlewareStack, ProducerTracing};
/// use natstrace::trace::{LocalTracer, NoopReporter, TraceScope};
/// use natstrace::transport::{MemoryTransport, Message, Publisher};
/// use natstrace::TracingConfig;
///
/// # tokio_test::block_on(async {
/// let transport = Arc::new(MemoryTransport::new());
/// let tracer = Arc::new(LocalTracer::new(Arc::new(NoopReporter)));
/// let publisher = Publisher::new(
///     transport.clone(),
///     MiddlewareStack::new().with(ProducerTracing::new(tracer, TracingConfig::default())),
/// );
///
/// publisher.publish(TraceScope::new(), Message::new("orders.created", "42")).await.unwrap();
/// assert_eq!(transport.published_count(), 1);
/// # });
/// ```
#[derive(Clone)]
pub struct Publisher {
    transport: Arc<dyn Transport>,
    stack: MiddlewareStack,
}

impl Publisher {
    /// Creates a publisher running `stack` in front of `transport`.
    pub fn new(transport: Arc<dyn Transport>, stack: MiddlewareStack) -> Self {
        Self { transport, stack }
    }

    /// Returns the middleware stack.
    pub fn stack(&self) -> &MiddlewareStack {
        &self.stack
    }

    /// Sends `message` with the given mode and returns the reply, if any.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a middleware or the transport.
    pub async fn send(
        &self,
        scope: TraceScope,
        message: Message,
        mode: SendMode,
    ) -> Result<Option<Message>> {
        let endpoint = TransportEndpoint { transport: Arc::clone(&self.transport), mode };
        self.stack.process(scope, message, &endpoint).await
    }

    /// Publishes `message` without waiting for a reply.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a middleware or the transport.
    pub async fn publish(&self, scope: TraceScope, message: Message) -> Result<()> {
        self.send(scope, message, SendMode::Publish).await.map(|_| ())
    }

    /// Sends `message` as a request and waits up to `timeout` for the reply.
    ///
    /// # Errors
    ///
    /// - `NoResponders` if nothing is subscribed to the subject
    /// - `Timeout` if no reply arrives in time
    /// - `Internal` if a middleware completed the request without a reply
    pub async fn request(
        &self,
        scope: TraceScope,
        message: Message,
        timeout: Duration,
    ) -> Result<Message> {
        let subject = message.subject().to_string();
        self.send(scope, message, SendMode::Request { timeout })
            .await?
            .ok_or_else(|| {
                Error::internal("request completed without a reply").with_subject(subject)
            })
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").field("stack", &self.stack).finish_non_exhaustive()
    }
}
