//! Traced request/reply over the in-memory broker.
//!
//! A producer sends a request from inside an application span; the consumer
//! continues the same trace and calls a downstream service with a nested
//! publish. Finished spans are printed by the `LogReporter`.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=info cargo run -p natstrace-demos --bin traced_request
//!
//! # Show propagation internals too
//! RUST_LOG=natstrace=debug,info cargo run -p natstrace-demos --bin traced_request
//! ```

use std::sync::Arc;
use std::time::Duration;

use natstrace::prelude::*;
use natstrace::trace::SpanOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let transport = Arc::new(MemoryTransport::new());
    let tracer: Arc<dyn Tracer> = Arc::new(LocalTracer::new(Arc::new(LogReporter)));

    // Downstream audit service: fire-and-forget receiver.
    let audit = Pipeline::new(
        MiddlewareStack::new().with(ConsumerTracing::new(
            tracer.clone(),
            TracingConfig::default().with_tag("service", "audit"),
        )),
        |_: TraceScope, msg: Message| async move {
            tracing::info!(payload = %String::from_utf8_lossy(msg.data()), "audit record stored");
            Ok::<_, Error>(None)
        },
    );
    let audit_handle = Subscriber::new(transport.clone(), audit).serve("audit.>").await?;

    // Accounts service: replies to lookups and records an audit event in the
    // same trace.
    let audit_publisher = Publisher::new(
        transport.clone(),
        MiddlewareStack::new().with(ProducerTracing::new(
            tracer.clone(),
            TracingConfig::default().with_tag("service", "accounts"),
        )),
    );
    let accounts = Pipeline::new(
        MiddlewareStack::new().with(ConsumerTracing::new(
            tracer.clone(),
            TracingConfig::default().with_name("accounts.lookup").with_tag("service", "accounts"),
        )),
        move |scope: TraceScope, msg: Message| {
            let audit_publisher = audit_publisher.clone();
            async move {
                let id = String::from_utf8_lossy(msg.data()).into_owned();
                let audit = Message::new("audit.accounts", format!("lookup {id}"));
                audit_publisher.publish(scope, audit).await?;
                Ok::<_, Error>(Some(msg.respond(format!(r#"{{"id":{id},"name":"bob"}}"#))))
            }
        },
    );
    let accounts_handle = Subscriber::new(transport.clone(), accounts).serve("accounts.get").await?;

    // Client: the request runs inside an application span.
    let client = Publisher::new(
        transport.clone(),
        MiddlewareStack::new().with(ProducerTracing::new(
            tracer.clone(),
            TracingConfig::default().with_tag("service", "frontend"),
        )),
    );

    let mut root = tracer.start_span("render-profile", SpanOptions::new(SpanKind::Server));
    let scope = TraceScope::new().with_span(root.context());
    let message = Message::new("accounts.get", "1");
    let reply = client.request(scope, message, Duration::from_secs(2)).await?;
    tracing::info!(reply = %String::from_utf8_lossy(reply.data()), "got reply");
    root.finish();
    root.flush();

    // Give the audit consumer a moment to finish its span.
    tokio::time::sleep(Duration::from_millis(50)).await;

    accounts_handle.stop().await;
    audit_handle.stop().await;
    Ok(())
}
