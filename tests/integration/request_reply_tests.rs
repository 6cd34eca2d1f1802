//! Request/reply exchanges linking producer and consumer spans.

use std::time::Duration;

use natstrace::Error;
use natstrace::trace::{SpanContext, SpanId, SpanKind, TraceId, TraceScope};
use natstrace::transport::Message;

use crate::common::Harness;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Replies with the trace id the handler observed in its scope.
async fn trace_echo(scope: TraceScope, msg: Message) -> natstrace::Result<Option<Message>> {
    let trace_id = scope.span_context().map(|ctx| ctx.trace_id().to_string()).unwrap_or_default();
    Ok(Some(msg.respond(trace_id)))
}

#[tokio::test]
async fn test_request_links_producer_and_consumer() {
    let harness = Harness::new();
    let handle = harness.serve("accounts.get", harness.config(), trace_echo).await.unwrap();
    let publisher = harness.publisher(harness.config());

    let message = Message::new("accounts.get", "7");
    let reply = publisher.request(TraceScope::new(), message, TIMEOUT).await.unwrap();

    let spans = harness.wait_for_spans(2).await.unwrap();
    let producer = spans.iter().find(|span| span.kind() == SpanKind::Producer).unwrap();
    let consumer = spans.iter().find(|span| span.kind() == SpanKind::Consumer).unwrap();

    assert_eq!(producer.context().parent_id(), None);
    assert_eq!(consumer.context().trace_id(), producer.context().trace_id());
    assert_eq!(consumer.context().parent_id(), Some(producer.context().span_id()));
    assert_eq!(reply.data().as_ref(), producer.context().trace_id().to_string().as_bytes());

    handle.stop().await;
}

#[tokio::test]
async fn test_reply_is_plain_payload() {
    let harness = Harness::new();
    let handle = harness
        .serve("echo", harness.config(), |_: TraceScope, msg: Message| async move {
            Ok::<_, Error>(Some(msg.respond(msg.data().clone())))
        })
        .await
        .unwrap();
    let publisher = harness.publisher(harness.config());

    let reply = publisher
        .request(TraceScope::new(), Message::new("echo", r#"{"Name":"bob","Id":1}"#), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply.data().as_ref(), br#"{"Name":"bob","Id":1}"#);

    handle.stop().await;
}

#[tokio::test]
async fn test_error_checker_flags_reply_without_changing_it() {
    let harness = Harness::new();
    let config = harness.config().with_error_checker(|msg: &Message| {
        if msg.data().starts_with(b"error:") {
            Err(String::from_utf8_lossy(msg.data()).into_owned().into())
        } else {
            Ok(())
        }
    });
    let handle = harness
        .serve("accounts.delete", config, |_: TraceScope, msg: Message| async move {
            Ok::<_, Error>(Some(msg.respond("error: account locked")))
        })
        .await
        .unwrap();
    let publisher = harness.publisher(harness.config());

    let message = Message::new("accounts.delete", "7");
    let reply = publisher.request(TraceScope::new(), message, TIMEOUT).await.unwrap();
    assert_eq!(reply.data().as_ref(), b"error: account locked");

    let spans = harness.wait_for_spans(2).await.unwrap();
    let consumer = spans.iter().find(|span| span.kind() == SpanKind::Consumer).unwrap();
    let producer = spans.iter().find(|span| span.kind() == SpanKind::Producer).unwrap();
    assert_eq!(consumer.error(), Some("error: account locked"));
    assert_eq!(producer.error(), None);

    handle.stop().await;
}

#[tokio::test]
async fn test_concurrent_requests_keep_traces_apart() {
    let harness = Harness::new();
    let handle = harness.serve("accounts.get", harness.config(), trace_echo).await.unwrap();
    let publisher = harness.publisher(harness.config());

    let mut tasks = Vec::new();
    for i in 1..=32u64 {
        let publisher = publisher.clone();
        tasks.push(tokio::spawn(async move {
            let caller = SpanContext::new(TraceId::from_u64(i), SpanId::new(i)).with_sampled(true);
            let scope = TraceScope::new().with_span(caller);
            let message = Message::new("accounts.get", i.to_string());
            let reply = publisher.request(scope, message, TIMEOUT).await.unwrap();
            (i, reply)
        }));
    }

    for task in tasks {
        let (i, reply) = task.await.unwrap();
        assert_eq!(reply.data().as_ref(), TraceId::from_u64(i).to_string().as_bytes());
    }

    let spans = harness.wait_for_spans(64).await.unwrap();
    for i in 1..=32u64 {
        let trace_id = TraceId::from_u64(i);
        let trace: Vec<_> =
            spans.iter().filter(|span| span.context().trace_id() == trace_id).collect();
        assert_eq!(trace.len(), 2);
    }

    handle.stop().await;
}

#[tokio::test]
async fn test_unsampled_trace_is_not_reported() {
    let harness = Harness::new();
    let handle = harness.serve("accounts.get", harness.config(), trace_echo).await.unwrap();
    let publisher = harness.publisher(harness.config());

    let caller = SpanContext::new(TraceId::from_u64(9), SpanId::new(9)).with_sampled(false);
    let reply = publisher
        .request(TraceScope::new().with_span(caller), Message::new("accounts.get", "9"), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(reply.data().as_ref(), TraceId::from_u64(9).to_string().as_bytes());
    assert!(harness.reporter.is_empty());

    handle.stop().await;
}
