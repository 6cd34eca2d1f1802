//! # natstrace
//!
//! Zipkin-style span context propagation for message brokers whose messages
//! carry no headers.
//!
//! A traced sender wraps each payload in a small JSON envelope holding the B3
//! span context of its producer span. A traced receiver unwraps it, continues
//! the trace with a consumer span and hands the original payload to the
//! application. Payloads that are not envelopes pass through untouched, so
//! traced and untraced peers can share subjects.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use natstrace::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let transport = Arc::new(MemoryTransport::new());
//! let tracer = Arc::new(LocalTracer::new(Arc::new(LogReporter)));
//! let config = TracingConfig::default().with_tag("service", "billing");
//!
//! // Consumer side: every inbound message gets a consumer span.
//! let pipeline = Pipeline::new(
//!     MiddlewareStack::new().with(ConsumerTracing::new(tracer.clone(), config.clone())),
//!     |_: TraceScope, msg: Message| async move { Ok::<_, Error>(Some(msg.respond("paid"))) },
//! );
//! let server = Subscriber::new(transport.clone(), pipeline).serve("invoices.pay").await?;
//!
//! // Producer side: the consumer span above becomes a child of this one.
//! let publisher = Publisher::new(
//!     transport.clone(),
//!     MiddlewareStack::new().with(ProducerTracing::new(tracer, config)),
//! );
//! let reply = publisher
//!     .request(TraceScope::new(), Message::new("invoices.pay", "42"), Duration::from_secs(1))
//!     .await?;
//! assert_eq!(reply.data().as_ref(), b"paid");
//!
//! server.stop().await;
//! # Ok::<(), Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Key Concepts
//!
//! - **Envelope**: `{"natsSpanContextB3Map": {...}, "data": "<base64>"}`, see [`envelope`]
//! - **Trace scope**: the active span travels explicitly as a [`trace::TraceScope`] argument
//! - **Degradation**: propagation failures are logged, never fatal to a message
//! - **Reporting**: only sampled or debug spans reach the [`trace::Reporter`]

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod config;
pub mod error;
pub mod trace;

// Propagation
pub mod envelope;
pub mod middleware;

// Transport layer
pub mod transport;

// Testing utilities
pub mod testing;

// Prelude for convenient imports
pub mod prelude;

// Re-export main types at crate root for convenience
pub use config::TracingConfig;
pub use error::{BoxError, Error, ErrorKind, Result};
