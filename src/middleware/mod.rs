//! Middleware for intercepting message handling and sending.
//!
//! Middleware wraps a terminal [`Endpoint`] (an application handler on the
//! consumer side, the transport on the producer side), allowing cross-cutting
//! concerns such as tracing to run around every message.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Message Pipeline                                             │
//! │                                                              │
//! │  ┌─────────────────┐                                         │
//! │  │ Subscriber      │  inbound message from the broker        │
//! │  └────────┬────────┘                                         │
//! │           │                                                  │
//! │           ▼                                                  │
//! │  ┌─────────────────┐                                         │
//! │  │ ConsumerTracing │  extract context, open consumer span    │
//! │  └────────┬────────┘                                         │
//! │           │                                                  │
//! │           ▼                                                  │
//! │  ┌─────────────────┐                                         │
//! │  │ Middleware N    │  e.g., timing, auditing                 │
//! │  └────────┬────────┘                                         │
//! │           │                                                  │
//! │           ▼                                                  │
//! │  ┌─────────────────┐                                         │
//! │  │ Endpoint        │  application handler                    │
//! │  └─────────────────┘                                         │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use natstrace::middleware::{Middleware, MessageFuture, Next};
//! use natstrace::trace::TraceScope;
//! use natstrace::transport::Message;
//! use std::time::Instant;
//!
//! struct TimingMiddleware;
//!
//! impl Middleware for TimingMiddleware {
//!     fn handle<'a>(
//!         &'a self,
//!         scope: TraceScope,
//!         message: Message,
//!         next: Next<'a>,
//!     ) -> MessageFuture<'a> {
//!         Box::pin(async move {
//!             let start = Instant::now();
//!             let reply = next.call(scope, message).await?;
//!             println!("Message took {:?}", start.elapsed());
//!             Ok(reply)
//!         })
//!     }
//! }
//! ```

mod consumer;
mod producer;

use std::{fmt, future::Future, pin::Pin, sync::Arc};

pub use consumer::ConsumerTracing;
pub use producer::ProducerTracing;

use crate::config::ErrorChecker;
use crate::trace::{Span, TraceScope};
use crate::transport::Message;
use crate::Result;

/// Type alias for the future returned by middleware and endpoints.
///
/// Resolves to the optional reply produced for the message.
pub type MessageFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Message>>> + Send + 'a>>;

/// Middleware trait for intercepting messages.
///
/// ## Example
///
/// ```rust
/// use natstrace::middleware::{Middleware, MessageFuture, Next};
/// use natstrace::trace::TraceScope;
/// use natstrace::transport::Message;
///
/// struct LoggingMiddleware;
///
/// impl Middleware for LoggingMiddleware {
///     fn handle<'a>(
///         &'a self,
///         scope: TraceScope,
///         message: Message,
///         next: Next<'a>,
///     ) -> MessageFuture<'a> {
///         Box::pin(async move {
///             println!("Message: {}", message.subject());
///             let reply = next.call(scope, message).await?;
///             println!("Replied: {}", reply.is_some());
///             Ok(reply)
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Handle a message, optionally modifying it or the reply.
    ///
    /// Call `next.call(scope, message)` to continue the chain. You can:
    /// - Modify the message or scope before calling `next`
    /// - Modify the reply after `next` returns
    /// - Short-circuit and return early without calling `next`
    fn handle<'a>(
        &'a self,
        scope: TraceScope,
        message: Message,
        next: Next<'a>,
    ) -> MessageFuture<'a>;
}

/// The terminal handler of a middleware chain.
///
/// Implemented for async closures taking `(TraceScope, Message)`.
pub trait Endpoint: Send + Sync + 'static {
    /// Handles the message and returns an optional reply.
    fn call(&self, scope: TraceScope, message: Message) -> MessageFuture<'_>;
}

impl<F, Fut> Endpoint for F
where
    F: Fn(TraceScope, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Message>>> + Send + 'static,
{
    fn call(&self, scope: TraceScope, message: Message) -> MessageFuture<'_> {
        Box::pin(self(scope, message))
    }
}

/// The rest of the middleware chain, ending in an endpoint.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Creates a chain running `middlewares` in order, then `endpoint`.
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self { middlewares, endpoint }
    }

    /// Creates a chain that calls `endpoint` directly.
    pub fn endpoint(endpoint: &'a dyn Endpoint) -> Self {
        Self { middlewares: &[], endpoint }
    }

    /// Call the next middleware or the endpoint.
    pub fn call(self, scope: TraceScope, message: Message) -> MessageFuture<'a> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.handle(scope, message, Next::new(rest, self.endpoint)),
            None => self.endpoint.call(scope, message),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.middlewares.len()).finish_non_exhaustive()
    }
}

/// Tags `span` with the handling outcome.
///
/// A failed result is recorded first; the error checker then runs on the reply,
/// or on `fallback` when there is none, and overrides the tag if it fails.
fn record_outcome(
    span: &mut Span,
    result: &Result<Option<Message>>,
    fallback: Option<&Message>,
    checker: Option<&ErrorChecker>,
) {
    if let Err(err) = result {
        span.tag_error(err.to_string());
    }

    let Some(checker) = checker else {
        return;
    };
    let target = match result {
        Ok(Some(reply)) => Some(reply),
        _ => fallback,
    };
    if let Some(Err(err)) = target.map(|message| checker(message)) {
        span.tag_error(err.to_string());
    }
}

/// A stack of middleware that processes messages in order.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    /// Create a new empty middleware stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the stack.
    ///
    /// Middleware is called in the order added (first added = outermost).
    pub fn push(&mut self, middleware: impl Middleware) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Add a middleware to the stack (builder pattern).
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.push(middleware);
        self
    }

    /// Check if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Get the number of middlewares in the stack.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Process a message through the stack, ending in `endpoint`.
    pub fn process<'a>(
        &'a self,
        scope: TraceScope,
        message: Message,
        endpoint: &'a dyn Endpoint,
    ) -> MessageFuture<'a> {
        Next::new(&self.middlewares, endpoint).call(scope, message)
    }
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStack").field("len", &self.middlewares.len()).finish()
    }
}

/// A middleware stack bound to its endpoint.
///
/// A pipeline is itself an [`Endpoint`], so it can be served by a
/// [`Subscriber`](crate::transport::Subscriber) or nested in another stack.
///
/// ## Example
///
/// ```rust
/// use natstrace::middleware::{MiddlewareStack, Pipeline};
/// use natstrace::trace::TraceScope;
/// use natstrace::transport::Message;
///
/// # tokio_test::block_on(async {
/// let endpoint = |_scope: TraceScope, msg: Message| async move {
///     Ok::<_, natstrace::Error>(Some(msg.respond("pong")))
/// };
/// let pipeline = Pipeline::new(MiddlewareStack::new(), endpoint);
///
/// let reply = pipeline.handle(TraceScope::new(), Message::new("ping", "")).await.unwrap();
/// assert_eq!(reply.unwrap().data().as_ref(), b"pong");
/// # });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stack: MiddlewareStack,
    endpoint: Arc<dyn Endpoint>,
}

impl Pipeline {
    /// Binds `stack` to `endpoint`.
    pub fn new(stack: MiddlewareStack, endpoint: impl Endpoint) -> Self {
        Self { stack, endpoint: Arc::new(endpoint) }
    }

    /// Returns the middleware stack.
    pub fn stack(&self) -> &MiddlewareStack {
        &self.stack
    }

    /// Runs a message through the stack and endpoint.
    pub fn handle(&self, scope: TraceScope, message: Message) -> MessageFuture<'_> {
        self.stack.process(scope, message, self.endpoint.as_ref())
    }
}

impl Endpoint for Pipeline {
    fn call(&self, scope: TraceScope, message: Message) -> MessageFuture<'_> {
        self.handle(scope, message)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("stack", &self.stack).finish_non_exhaustive()
    }
}
