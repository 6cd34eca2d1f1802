//! Writing a middleware that runs inside the consumer span.
//!
//! `AuditMiddleware` sits behind `ConsumerTracing`, so the scope it receives
//! already carries the consumer span and it can log the trace id with every
//! message.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=info cargo run -p natstrace-demos --bin custom_middleware
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use natstrace::middleware::{MessageFuture, Next};
use natstrace::prelude::*;
use tracing_subscriber::EnvFilter;

struct AuditMiddleware;

impl Middleware for AuditMiddleware {
    fn handle<'a>(
        &'a self,
        scope: TraceScope,
        message: Message,
        next: Next<'a>,
    ) -> MessageFuture<'a> {
        Box::pin(async move {
            let trace_id =
                scope.span_context().map(|ctx| ctx.trace_id().to_string()).unwrap_or_default();
            let subject = message.subject().to_string();
            let start = Instant::now();

            let reply = next.call(scope, message).await;

            tracing::info!(
                subject = %subject,
                trace_id = %trace_id,
                elapsed_us = start.elapsed().as_micros() as u64,
                ok = reply.is_ok(),
                "message handled"
            );
            reply
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let transport = Arc::new(MemoryTransport::new());
    let sampler = Sampler::ratio(0.5)?;
    let tracer = Arc::new(LocalTracer::new(Arc::new(LogReporter)).with_sampler(sampler));

    let stack = MiddlewareStack::new()
        .with(ConsumerTracing::new(tracer.clone(), TracingConfig::default()))
        .with(AuditMiddleware);
    let pipeline = Pipeline::new(stack, |_: TraceScope, msg: Message| async move {
        Ok::<_, Error>(Some(msg.respond("done")))
    });
    let handle = Subscriber::new(transport.clone(), pipeline).serve("jobs.*").await?;

    let publisher = Publisher::new(
        transport.clone(),
        MiddlewareStack::new().with(ProducerTracing::new(tracer, TracingConfig::default())),
    );
    for job in ["jobs.resize", "jobs.encode", "jobs.upload", "jobs.notify"] {
        let message = Message::new(job, "{}");
        publisher.request(TraceScope::new(), message, Duration::from_secs(1)).await?;
    }

    handle.stop().await;
    Ok(())
}
