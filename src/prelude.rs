//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy importing:
//!
//! ```rust
//! use natstrace::prelude::*;
//! ```
//!
//! This provides access to:
//! - Error types
//! - Tracing configuration and middleware
//! - Span context and tracer types
//! - Transport types

pub use crate::{
    config::{PropagationLogger, TracingConfig},
    envelope::{EnvelopeCodec, EnvelopePropagator, Injection},
    error::{Error, ErrorKind, Result},
    middleware::{ConsumerTracing, Middleware, MiddlewareStack, Pipeline, ProducerTracing},
    trace::{
        LocalTracer, LogReporter, Reporter, Sampler, SpanContext, SpanId, SpanKind, TraceId,
        TraceScope, Tracer,
    },
    transport::{MemoryTransport, Message, Publisher, Subscriber, Transport},
};
