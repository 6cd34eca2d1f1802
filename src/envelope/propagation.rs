//! Span context extraction from and injection into messages.

use crate::envelope::codec::EnvelopeCodec;
use crate::trace::{B3Map, SpanContext};
use crate::transport::Message;
use crate::{Error, Result};

/// Outcome of a successful injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// The payload was replaced by an envelope.
    Injected,
    /// The context had a zero trace or span id; the message was left as is.
    Skipped,
}

/// Moves span contexts in and out of message payloads.
///
/// ## Example
///
/// ```rust
/// use natstrace::envelope::{EnvelopePropagator, Injection};
/// use natstrace::trace::{SpanContext, SpanId, TraceId};
/// use natstrace::transport::Message;
///
/// let propagator = EnvelopePropagator::default();
/// let ctx = SpanContext::new(TraceId::from_u64(1), SpanId::new(1)).with_sampled(true);
///
/// let mut message = Message::new("orders.created", r#"{"Name":"bob","Id":1}"#);
/// assert_eq!(propagator.inject(&mut message, &ctx).unwrap(), Injection::Injected);
///
/// let extracted = propagator.extract(&mut message).unwrap();
/// assert_eq!(extracted, Some(ctx));
/// assert_eq!(message.data().as_ref(), br#"{"Name":"bob","Id":1}"#);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopePropagator {
    codec: EnvelopeCodec,
}

impl EnvelopePropagator {
    /// Creates a propagator using `codec`.
    pub fn new(codec: EnvelopeCodec) -> Self {
        Self { codec }
    }

    /// Returns the envelope codec.
    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    /// Extracts the span context carried by `message`.
    ///
    /// Returns `Ok(None)` for messages without an envelope, with a malformed
    /// envelope, or with an empty context token. On success the payload is
    /// replaced by the unwrapped payload; on error it is left untouched.
    ///
    /// # Errors
    ///
    /// - `Codec` if the context token cannot be parsed
    /// - `EmptyContext` if the context has a zero trace id
    pub fn extract(&self, message: &mut Message) -> Result<Option<SpanContext>> {
        let envelope = match self.codec.try_unwrap(message.data()) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => return Ok(None),
            Err(err) => {
                tracing::debug!(
                    subject = message.subject(),
                    error = %err,
                    "ignoring malformed envelope"
                );
                return Ok(None);
            },
        };

        let (token, payload) = envelope.into_parts();
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            message.set_data(payload);
            return Ok(None);
        };

        let context = token
            .decode()
            .map_err(|err| Error::from(err).with_subject(message.subject()))?;
        if context.trace_id().is_empty() {
            return Err(Error::empty_context().with_subject(message.subject()));
        }

        message.set_data(payload);
        Ok(Some(context))
    }

    /// Wraps the payload of `message` in an envelope carrying `context`.
    ///
    /// # Errors
    ///
    /// - `EmptyContext` if every field of `context` is zero or unset
    /// - `Codec` if the envelope cannot be serialized
    pub fn inject(&self, message: &mut Message, context: &SpanContext) -> Result<Injection> {
        if context.is_empty() {
            return Err(Error::empty_context().with_subject(message.subject()));
        }
        if !context.is_valid() {
            return Ok(Injection::Skipped);
        }

        let wrapped = self.codec.wrap(message.data(), &B3Map::encode(context))?;
        message.set_data(wrapped);
        Ok(Injection::Injected)
    }
}
