//! Envelope properties across arbitrary payloads.

use bytes::Bytes;
use natstrace::envelope::{EnvelopeCodec, EnvelopePropagator, Injection};
use natstrace::trace::{B3Map, SpanContext, SpanId, TraceId};
use natstrace::transport::Message;
use natstrace::ErrorKind;
use proptest::prelude::*;

fn arb_context() -> impl Strategy<Value = SpanContext> {
    let parent = proptest::option::of(1u64..);
    let sampled = proptest::option::of(any::<bool>());
    (any::<u64>(), 1u64.., 1u64.., parent, sampled).prop_map(|(high, low, span, parent, sampled)| {
        let mut ctx = SpanContext::new(TraceId::new(high, low), SpanId::new(span));
        if let Some(parent) = parent {
            ctx = ctx.with_parent(SpanId::new(parent));
        }
        if let Some(sampled) = sampled {
            ctx = ctx.with_sampled(sampled);
        }
        ctx
    })
}

fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..512)
}

proptest! {
    #[test]
    fn prop_wrap_unwrap_round_trip(payload in arb_payload(), ctx in arb_context()) {
        let codec = EnvelopeCodec::default();
        let wrapped = codec.wrap(&payload, &B3Map::encode(&ctx)).unwrap();

        let envelope = codec.try_unwrap(&wrapped).unwrap().unwrap();
        prop_assert_eq!(envelope.payload().as_ref(), payload.as_slice());
        prop_assert_eq!(envelope.context().unwrap().decode().unwrap(), ctx);
    }

    #[test]
    fn prop_inject_extract_round_trip(payload in arb_payload(), ctx in arb_context()) {
        let propagator = EnvelopePropagator::default();
        let mut message = Message::new("a.b", payload.clone());

        prop_assert_eq!(propagator.inject(&mut message, &ctx).unwrap(), Injection::Injected);
        prop_assert_eq!(propagator.extract(&mut message).unwrap(), Some(ctx));
        prop_assert_eq!(message.data().as_ref(), payload.as_slice());
    }

    #[test]
    fn prop_arbitrary_bytes_pass_through(payload in arb_payload()) {
        let propagator = EnvelopePropagator::default();
        let mut message = Message::new("a.b", payload.clone());

        prop_assert_eq!(propagator.extract(&mut message).unwrap(), None);
        prop_assert_eq!(message.data().as_ref(), payload.as_slice());
    }

    #[test]
    fn prop_foreign_json_objects_pass_through(
        key in "[a-zA-Z]{1,12}",
        value in "[a-zA-Z0-9 ]{0,32}",
    ) {
        prop_assume!(key != "natsSpanContextB3Map");
        let payload = serde_json::json!({ key: value, "data": "aGk=" }).to_string();
        let propagator = EnvelopePropagator::default();
        let mut message = Message::new("a.b", payload.clone());

        prop_assert_eq!(propagator.extract(&mut message).unwrap(), None);
        prop_assert_eq!(message.data().as_ref(), payload.as_bytes());
    }
}

#[test]
fn test_nested_envelope_unwraps_once() {
    let codec = EnvelopeCodec::default();
    let inner_ctx = SpanContext::new(TraceId::from_u64(1), SpanId::new(1)).with_sampled(true);
    let outer_ctx = SpanContext::new(TraceId::from_u64(2), SpanId::new(2)).with_sampled(true);

    let inner = codec.wrap(b"payload", &B3Map::encode(&inner_ctx)).unwrap();
    let outer = codec.wrap(&inner, &B3Map::encode(&outer_ctx)).unwrap();

    let envelope = codec.unwrap(outer);
    assert_eq!(envelope.context().unwrap().decode().unwrap(), outer_ctx);
    assert_eq!(envelope.payload(), &inner);
}

#[test]
fn test_empty_context_injection_leaves_payload() {
    let propagator = EnvelopePropagator::default();
    let mut message = Message::new("a.b", Bytes::from_static(b"x"));

    let err = propagator.inject(&mut message, &SpanContext::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyContext);
    assert_eq!(message.data().as_ref(), b"x");
}

#[test]
fn test_zero_span_id_injection_is_skipped() {
    let propagator = EnvelopePropagator::default();
    let mut message = Message::new("a.b", Bytes::from_static(b"x"));
    let ctx = SpanContext::new(TraceId::from_u64(1), SpanId::new(0)).with_sampled(true);

    assert_eq!(propagator.inject(&mut message, &ctx).unwrap(), Injection::Skipped);
    assert_eq!(message.data().as_ref(), b"x");
}

#[test]
fn test_go_style_null_data_is_empty_payload() {
    let strict = EnvelopeCodec::strict();
    let bytes: &[u8] = concat!(
        r#"{"natsSpanContextB3Map":{"x-b3-traceid":"0000000000000001","#,
        r#""x-b3-spanid":"0000000000000001","x-b3-sampled":"1"},"data":null}"#,
    )
    .as_bytes();

    let envelope = strict.try_unwrap(bytes).unwrap().unwrap();
    assert!(envelope.payload().is_empty());
    assert_eq!(envelope.context().unwrap().decode().unwrap().trace_id(), TraceId::from_u64(1));
}
