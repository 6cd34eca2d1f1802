//! Span context identity for distributed tracing.

use std::fmt;

/// Errors produced while parsing a serialized span context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ContextError {
    /// The trace id is not 1..=32 hex characters.
    #[error("invalid trace id")]
    InvalidTraceId,
    /// The span id is not 1..=16 hex characters.
    #[error("invalid span id")]
    InvalidSpanId,
    /// The parent span id is not 1..=16 hex characters.
    #[error("invalid parent span id")]
    InvalidParentSpanId,
    /// The sampled value is not one of `0`, `1`, `true`, `false`.
    #[error("invalid sampled value")]
    InvalidSampled,
    /// Trace, span and parent ids are not present together as required.
    #[error("invalid id scope: trace id and span id must be set together")]
    InvalidScope,
    /// The single header form could not be split into its parts.
    #[error("invalid b3 single header format")]
    InvalidFormat,
    /// The serialized context is empty.
    #[error("empty span context")]
    Empty,
}

/// A 128-bit trace identifier.
///
/// Rendered as 16 hex characters when the high 64 bits are zero, and as 32
/// otherwise. The zero value is representable; it marks an unusable context.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId {
    high: u64,
    low: u64,
}

impl TraceId {
    /// Creates a trace id from its high and low halves.
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Creates a 64-bit trace id.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use natstrace::trace::TraceId;
    ///
    /// assert_eq!(TraceId::from_u64(1).to_string(), "0000000000000001");
    /// ```
    pub const fn from_u64(low: u64) -> Self {
        Self { high: 0, low }
    }

    /// Creates a new random, non-zero 64-bit trace id.
    pub fn random() -> Self {
        Self { high: 0, low: random_non_zero() }
    }

    /// Parses a trace id from 1..=32 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, ContextError> {
        let bytes: [u8; 16] = decode_padded(hex).ok_or(ContextError::InvalidTraceId)?;
        let (high, low) = bytes.split_at(8);
        Ok(Self {
            high: u64::from_be_bytes(high.try_into().map_err(|_| ContextError::InvalidTraceId)?),
            low: u64::from_be_bytes(low.try_into().map_err(|_| ContextError::InvalidTraceId)?),
        })
    }

    /// Returns the high 64 bits.
    pub fn high(&self) -> u64 {
        self.high
    }

    /// Returns the low 64 bits.
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Returns `true` if both halves are zero.
    pub fn is_empty(&self) -> bool {
        self.high == 0 && self.low == 0
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.high == 0 {
            f.write_str(&hex::encode(self.low.to_be_bytes()))
        } else {
            write!(
                f,
                "{}{}",
                hex::encode(self.high.to_be_bytes()),
                hex::encode(self.low.to_be_bytes())
            )
        }
    }
}

/// A 64-bit span identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(u64);

impl SpanId {
    /// Creates a span id from its numeric value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Creates a new random, non-zero span id.
    pub fn random() -> Self {
        Self(random_non_zero())
    }

    /// Parses a span id from 1..=16 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, ContextError> {
        let bytes: [u8; 8] = decode_padded(hex).ok_or(ContextError::InvalidSpanId)?;
        Ok(Self(u64::from_be_bytes(bytes)))
    }

    /// Returns the numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns `true` if the id is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({})", self)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_be_bytes()))
    }
}

/// The identity of one span within a trace.
///
/// `sampled` is tri-state: `None` means no sampling decision has been made
/// yet. A context whose fields are all zero or unset is *empty* and is never
/// valid for propagation.
///
/// ## Example
///
/// ```rust
/// use natstrace::trace::{SpanContext, SpanId, TraceId};
///
/// let ctx = SpanContext::new(TraceId::from_u64(1), SpanId::new(1)).with_sampled(true);
/// assert!(ctx.is_valid());
/// assert_eq!(ctx.sampled(), Some(true));
///
/// assert!(SpanContext::default().is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    parent_id: Option<SpanId>,
    sampled: Option<bool>,
    debug: bool,
}

impl SpanContext {
    /// Creates a context with the given ids and no sampling decision.
    pub fn new(trace_id: TraceId, span_id: SpanId) -> Self {
        Self { trace_id, span_id, parent_id: None, sampled: None, debug: false }
    }

    /// Creates a context that carries only a sampling decision.
    pub fn sampling_only(sampled: Option<bool>, debug: bool) -> Self {
        Self { sampled, debug, ..Self::default() }
    }

    /// Sets the parent span id.
    #[must_use]
    pub fn with_parent(mut self, parent_id: SpanId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the sampling decision.
    #[must_use]
    pub fn with_sampled(mut self, sampled: bool) -> Self {
        self.sampled = Some(sampled);
        self
    }

    /// Sets the debug flag. Debug contexts carry no separate sampling decision.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        if debug {
            self.sampled = None;
        }
        self
    }

    /// Returns the trace id.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Returns the span id.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Returns the parent span id, if any.
    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent_id
    }

    /// Returns the sampling decision, if one has been made.
    pub fn sampled(&self) -> Option<bool> {
        self.sampled
    }

    /// Returns `true` if the debug flag is set.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Returns `true` if every field is zero or unset.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `true` if both trace id and span id are non-zero.
    pub fn is_valid(&self) -> bool {
        !self.trace_id.is_empty() && !self.span_id.is_zero()
    }

    /// Returns `true` if spans in this context should be reported.
    pub fn is_recorded(&self) -> bool {
        self.debug || self.sampled == Some(true)
    }
}

/// Decodes up to `N * 2` hex characters, left-padding with zeros.
fn decode_padded<const N: usize>(hex: &str) -> Option<[u8; N]> {
    if hex.is_empty() || hex.len() > N * 2 {
        return None;
    }
    let padded = format!("{:0>width$}", hex, width = N * 2);
    let mut bytes = [0u8; N];
    hex::decode_to_slice(padded, &mut bytes).ok()?;
    Some(bytes)
}

fn random_non_zero() -> u64 {
    loop {
        let mut bytes = [0u8; 8];
        let id = match getrandom::getrandom(&mut bytes) {
            Ok(()) => u64::from_be_bytes(bytes),
            Err(_) => fastrand::u64(..),
        };
        if id != 0 {
            return id;
        }
    }
}
