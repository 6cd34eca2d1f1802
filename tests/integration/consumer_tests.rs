//! Consumer-side tracing over the in-memory broker.

use bytes::Bytes;
use natstrace::envelope::EnvelopePropagator;
use natstrace::trace::{SpanContext, SpanId, SpanKind, TraceId, TraceScope};
use natstrace::transport::{Message, Transport};
use natstrace::{Error, ErrorKind};
use tokio::sync::mpsc;

use crate::common::Harness;

const BOB: &[u8] = br#"{"Name":"bob","Id":1}"#;

type Reply = std::future::Ready<natstrace::Result<Option<Message>>>;

/// Handler that forwards what it received to the test.
fn forward(
    sender: mpsc::UnboundedSender<(Option<SpanContext>, Bytes)>,
) -> impl Fn(TraceScope, Message) -> Reply + Send + Sync + 'static {
    move |scope: TraceScope, msg: Message| {
        let _ = sender.send((scope.span_context(), msg.into_data()));
        std::future::ready(Ok(None))
    }
}

#[tokio::test]
async fn test_remote_parent_is_continued() {
    let harness = Harness::new();
    let (sender, mut received) = mpsc::unbounded_channel();
    let handle = harness.serve("people.created", harness.config(), forward(sender)).await.unwrap();

    let remote = SpanContext::new(TraceId::from_u64(1), SpanId::new(1)).with_sampled(true);
    let mut message = Message::new("people.created", Bytes::from_static(BOB));
    EnvelopePropagator::default().inject(&mut message, &remote).unwrap();
    harness.transport.publish(message).await.unwrap();

    let (scope_span, payload) = received.recv().await.unwrap();
    assert_eq!(payload.as_ref(), BOB);
    assert_eq!(scope_span.unwrap().trace_id(), TraceId::from_u64(1));

    let spans = harness.wait_for_spans(1).await.unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].kind(), SpanKind::Consumer);
    assert_eq!(spans[0].name(), "people.created");
    assert_eq!(spans[0].context().trace_id(), TraceId::from_u64(1));
    assert_eq!(spans[0].context().parent_id(), Some(SpanId::new(1)));
    assert!(harness.logger.failures().is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn test_untraced_sender_gets_root_span() {
    let harness = Harness::new();
    let (sender, mut received) = mpsc::unbounded_channel();
    let handle = harness.serve("people.created", harness.config(), forward(sender)).await.unwrap();

    let message = Message::new("people.created", Bytes::from_static(BOB));
    harness.transport.publish(message).await.unwrap();

    let (_, payload) = received.recv().await.unwrap();
    assert_eq!(payload.as_ref(), BOB);

    let spans = harness.wait_for_spans(1).await.unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].context().parent_id(), None);
    assert!(harness.logger.failures().is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn test_undecodable_context_is_logged_and_payload_kept() {
    let harness = Harness::new();
    let (sender, mut received) = mpsc::unbounded_channel();
    let handle = harness.serve("people.created", harness.config(), forward(sender)).await.unwrap();

    let original: &[u8] =
        br#"{"natsSpanContextB3Map":{"x-b3-traceid":"not-hex","x-b3-spanid":"1"},"data":"aGk="}"#;
    let message = Message::new("people.created", Bytes::from_static(original));
    harness.transport.publish(message).await.unwrap();

    let (_, payload) = received.recv().await.unwrap();
    assert_eq!(payload.as_ref(), original);

    let spans = harness.wait_for_spans(1).await.unwrap();
    assert_eq!(spans[0].context().parent_id(), None);

    let failures = harness.logger.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, ErrorKind::Codec);
    assert_eq!(failures[0].subject, "people.created");

    handle.stop().await;
}

#[tokio::test]
async fn test_configured_tags_and_name_on_every_span() {
    let harness = Harness::new();
    let config = harness
        .config()
        .with_name("people-consumer")
        .with_tags([("service", "crm"), ("team", "core")]);
    let (sender, mut received) = mpsc::unbounded_channel();
    let handle = harness.serve("people.*", config, forward(sender)).await.unwrap();

    for subject in ["people.created", "people.deleted"] {
        harness.transport.publish(Message::new(subject, "{}")).await.unwrap();
        received.recv().await.unwrap();
    }

    let spans = harness.wait_for_spans(2).await.unwrap();
    for span in spans {
        assert_eq!(span.name(), "people-consumer");
        assert_eq!(span.tag("service"), Some("crm"));
        assert_eq!(span.tag("team"), Some("core"));
    }

    handle.stop().await;
}

#[tokio::test]
async fn test_handler_failure_is_tagged_not_fatal() {
    let harness = Harness::new();
    let handle = harness
        .serve("jobs", harness.config(), |_: TraceScope, msg: Message| async move {
            if msg.data().as_ref() == b"bad" {
                return Err(Error::handler("cannot process job"));
            }
            Ok::<Option<Message>, Error>(None)
        })
        .await
        .unwrap();

    harness.transport.publish(Message::new("jobs", "bad")).await.unwrap();
    harness.transport.publish(Message::new("jobs", "good")).await.unwrap();

    let spans = harness.wait_for_spans(2).await.unwrap();
    let failed = spans.iter().filter(|span| span.error().is_some()).count();
    assert_eq!(failed, 1);
    assert!(!handle.is_finished());

    handle.stop().await;
}
