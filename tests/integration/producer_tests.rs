//! Producer-side tracing over the in-memory broker.

use bytes::Bytes;
use natstrace::envelope::EnvelopeCodec;
use natstrace::trace::{SpanContext, SpanId, SpanKind, TraceId, TraceScope};
use natstrace::transport::{Message, Transport};

use crate::common::Harness;

const BOB: &[u8] = br#"{"Name":"bob","Id":1}"#;

#[tokio::test]
async fn test_root_producer_span_wraps_payload() {
    let harness = Harness::new();
    let mut wire = harness.transport.subscribe("people.created").await.unwrap();
    let publisher = harness.publisher(harness.config());

    publisher
        .publish(TraceScope::new(), Message::new("people.created", Bytes::from_static(BOB)))
        .await
        .unwrap();

    let spans = harness.reporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].kind(), SpanKind::Producer);
    assert_eq!(spans[0].context().parent_id(), None);

    let sent = wire.next().await.unwrap();
    let envelope = EnvelopeCodec::strict().unwrap(sent.into_data());
    assert_eq!(envelope.payload().as_ref(), BOB);
    assert_eq!(envelope.context().unwrap().decode().unwrap(), spans[0].context());
}

#[tokio::test]
async fn test_producer_span_is_child_of_caller_scope() {
    let harness = Harness::new();
    let _wire = harness.transport.subscribe("people.created").await.unwrap();
    let publisher = harness.publisher(harness.config());

    let caller = SpanContext::new(TraceId::new(0xabc, 0xdef), SpanId::new(42)).with_sampled(true);
    publisher
        .publish(TraceScope::new().with_span(caller), Message::new("people.created", "{}"))
        .await
        .unwrap();

    let span = harness.reporter.find("people.created").unwrap();
    assert_eq!(span.context().trace_id(), TraceId::new(0xabc, 0xdef));
    assert_eq!(span.context().parent_id(), Some(SpanId::new(42)));
}

#[tokio::test]
async fn test_propagation_disabled_sends_original_bytes() {
    let harness = Harness::new();
    let mut wire = harness.transport.subscribe("people.created").await.unwrap();
    let publisher = harness.publisher(harness.config().with_propagation(false));

    publisher
        .publish(TraceScope::new(), Message::new("people.created", Bytes::from_static(BOB)))
        .await
        .unwrap();

    assert_eq!(wire.next().await.unwrap().data().as_ref(), BOB);
    assert_eq!(harness.reporter.len(), 1);
}

#[tokio::test]
async fn test_send_failure_is_returned_and_tagged() {
    let harness = Harness::new();
    let publisher = harness.publisher(harness.config());
    harness.transport.close();

    let message = Message::new("people.created", "{}");
    let err = publisher.publish(TraceScope::new(), message).await.unwrap_err();
    assert_eq!(err.kind(), natstrace::ErrorKind::Closed);

    let span = harness.reporter.find("people.created").unwrap();
    assert!(span.error().unwrap().contains("closed"));
}

#[tokio::test]
async fn test_error_checker_sees_pre_injection_message() {
    let harness = Harness::new();
    let _wire = harness.transport.subscribe("people.created").await.unwrap();
    let config = harness.config().with_error_checker(|msg: &Message| {
        if msg.data().as_ref() == BOB {
            Ok(())
        } else {
            Err(format!("unexpected payload {}", msg).into())
        }
    });

    harness
        .publisher(config)
        .publish(TraceScope::new(), Message::new("people.created", Bytes::from_static(BOB)))
        .await
        .unwrap();

    assert_eq!(harness.reporter.find("people.created").unwrap().error(), None);
}
