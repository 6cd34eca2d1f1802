//! Testing utilities for code that uses the tracing middleware.
//!
//! - [`RecordingReporter`]: keeps finished spans so tests can assert on them
//! - [`CapturingLogger`]: keeps propagation failures the middleware recovered from
//!
//! Pair them with [`MemoryTransport`](crate::transport::MemoryTransport) to
//! exercise a full publish/consume round trip without a broker.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use natstrace::middleware::{ConsumerTracing, MiddlewareStack, Pipeline};
//! use natstrace::testing::{CapturingLogger, RecordingReporter};
//! use natstrace::trace::{LocalTracer, TraceScope};
//! use natstrace::transport::Message;
//! use natstrace::TracingConfig;
//!
//! # tokio_test::block_on(async {
//! let reporter = Arc::new(RecordingReporter::new());
//! let logger = CapturingLogger::new();
//! let tracer = Arc::new(LocalTracer::new(reporter.clone()));
//!
//! let config = TracingConfig::default().with_logger(logger.clone());
//! let pipeline = Pipeline::new(
//!     MiddlewareStack::new().with(ConsumerTracing::new(tracer, config)),
//!     |_: TraceScope, _: Message| async { Ok::<Option<Message>, natstrace::Error>(None) },
//! );
//!
//! pipeline.handle(TraceScope::new(), Message::new("orders.created", "{}")).await.unwrap();
//!
//! assert_eq!(reporter.len(), 1);
//! assert!(logger.failures().is_empty());
//! # });
//! ```

mod logger;
mod recorder;

pub use logger::{CapturedFailure, CapturingLogger};
pub use recorder::RecordingReporter;
