//! B3 span context propagation.
//!
//! Span contexts travel as a B3 header map ([`B3Map`]) inside the message
//! envelope. The single header form (`b3: {trace}-{span}-{sampling}-{parent}`)
//! is understood on decode for older senders.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::context::{ContextError, SpanContext, SpanId, TraceId};

/// A trait for extracting values from headers.
pub trait HeaderExtractor {
    /// Gets a header value by name.
    fn get(&self, key: &str) -> Option<&str>;
}

/// A trait for injecting values into headers.
pub trait HeaderInjector {
    /// Sets a header value.
    fn set(&mut self, key: &str, value: String);
}

impl HeaderExtractor for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        self.get(key).map(|s| s.as_str())
    }
}

impl HeaderInjector for HashMap<String, String> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

/// A propagator for span contexts.
pub trait Propagator {
    /// Extracts a span context from headers.
    fn extract<E: HeaderExtractor>(&self, extractor: &E) -> Result<SpanContext, ContextError>;

    /// Injects a span context into headers.
    fn inject<I: HeaderInjector>(&self, context: &SpanContext, injector: &mut I);
}

/// The B3 header map carried inside an envelope.
///
/// Serializes as a flat JSON object of header name to header value. Lookups
/// are ASCII case-insensitive so maps written by other B3 implementations
/// (`X-B3-TraceId`) decode the same way.
///
/// ## Example
///
/// ```rust
/// use natstrace::trace::{B3Map, SpanContext, SpanId, TraceId};
///
/// let ctx = SpanContext::new(TraceId::from_u64(1), SpanId::new(2)).with_sampled(true);
/// let map = B3Map::encode(&ctx);
///
/// assert_eq!(map.get("x-b3-traceid"), Some("0000000000000001"));
/// assert_eq!(map.get("X-B3-Sampled"), Some("1"));
/// assert_eq!(map.decode().unwrap(), ctx);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct B3Map(BTreeMap<String, String>);

impl B3Map {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes a span context into a new map.
    ///
    /// An empty context still produces a well-formed map with zero ids.
    pub fn encode(context: &SpanContext) -> Self {
        let mut map = Self::new();
        B3Propagator::multi().inject(context, &mut map);
        map
    }

    /// Parses the span context held in this map.
    ///
    /// An empty map decodes to the empty context.
    pub fn decode(&self) -> Result<SpanContext, ContextError> {
        B3Propagator::multi().extract(self)
    }

    /// Returns a value by header name, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .or_else(|| self.0.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
            .map(|s| s.as_str())
    }

    /// Inserts a header.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns `true` if the map has no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the headers in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl HeaderExtractor for B3Map {
    fn get(&self, key: &str) -> Option<&str> {
        B3Map::get(self, key)
    }
}

impl HeaderInjector for B3Map {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key, value);
    }
}

impl FromIterator<(String, String)> for B3Map {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// B3 propagator for Zipkin compatibility.
///
/// Implements the [B3 Propagation](https://github.com/openzipkin/b3-propagation)
/// format in both its multi header and single header forms.
///
/// ## Example
///
/// ```rust
/// use std::collections::HashMap;
/// use natstrace::trace::{B3Propagator, Propagator, SpanContext, SpanId, TraceId};
///
/// let mut headers = HashMap::new();
/// headers.insert("b3".to_string(), "0000000000000001-0000000000000002-1".to_string());
///
/// let ctx = B3Propagator::single().extract(&headers).unwrap();
/// assert_eq!(ctx.trace_id(), TraceId::from_u64(1));
/// assert_eq!(ctx.span_id(), SpanId::new(2));
/// assert_eq!(ctx.sampled(), Some(true));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct B3Propagator {
    /// Whether to use single header format.
    single_header: bool,
}

impl B3Propagator {
    /// B3 single header name.
    pub const B3: &'static str = "b3";
    /// X-B3-TraceId header name.
    pub const X_B3_TRACE_ID: &'static str = "x-b3-traceid";
    /// X-B3-SpanId header name.
    pub const X_B3_SPAN_ID: &'static str = "x-b3-spanid";
    /// X-B3-ParentSpanId header name.
    pub const X_B3_PARENT_SPAN_ID: &'static str = "x-b3-parentspanid";
    /// X-B3-Sampled header name.
    pub const X_B3_SAMPLED: &'static str = "x-b3-sampled";
    /// X-B3-Flags header name.
    pub const X_B3_FLAGS: &'static str = "x-b3-flags";

    /// Creates a new B3 propagator using the single header format.
    pub fn single() -> Self {
        Self { single_header: true }
    }

    /// Creates a new B3 propagator using multiple headers.
    pub fn multi() -> Self {
        Self { single_header: false }
    }

    /// Returns `true` if this propagator writes the single header form.
    pub fn is_single_header(&self) -> bool {
        self.single_header
    }
}

impl Default for B3Propagator {
    fn default() -> Self {
        Self::multi()
    }
}

impl Propagator for B3Propagator {
    fn extract<E: HeaderExtractor>(&self, extractor: &E) -> Result<SpanContext, ContextError> {
        if let Some(b3) = extractor.get(Self::B3) {
            return parse_single_header(b3);
        }

        parse_headers(
            extractor.get(Self::X_B3_TRACE_ID).unwrap_or_default(),
            extractor.get(Self::X_B3_SPAN_ID).unwrap_or_default(),
            extractor.get(Self::X_B3_PARENT_SPAN_ID).unwrap_or_default(),
            extractor.get(Self::X_B3_SAMPLED).unwrap_or_default(),
            extractor.get(Self::X_B3_FLAGS).unwrap_or_default(),
        )
    }

    fn inject<I: HeaderInjector>(&self, context: &SpanContext, injector: &mut I) {
        if self.single_header {
            injector.set(Self::B3, build_single_header(context));
            return;
        }

        injector.set(Self::X_B3_TRACE_ID, context.trace_id().to_string());
        injector.set(Self::X_B3_SPAN_ID, context.span_id().to_string());
        if let Some(parent) = context.parent_id() {
            injector.set(Self::X_B3_PARENT_SPAN_ID, parent.to_string());
        }
        if context.is_debug() {
            injector.set(Self::X_B3_FLAGS, "1".to_string());
        } else if let Some(sampled) = context.sampled() {
            injector.set(Self::X_B3_SAMPLED, if sampled { "1" } else { "0" }.to_string());
        }
    }
}

/// Parses the multi header fields. Empty strings mean "header absent".
fn parse_headers(
    trace_id: &str,
    span_id: &str,
    parent_id: &str,
    sampled: &str,
    flags: &str,
) -> Result<SpanContext, ContextError> {
    let sampled = match sampled {
        "" => None,
        s if s == "1" || s.eq_ignore_ascii_case("true") => Some(true),
        s if s == "0" || s.eq_ignore_ascii_case("false") => Some(false),
        _ => return Err(ContextError::InvalidSampled),
    };
    let debug = flags == "1";

    if trace_id.is_empty() {
        if !span_id.is_empty() || !parent_id.is_empty() {
            return Err(ContextError::InvalidScope);
        }
        return Ok(SpanContext::sampling_only(sampled, debug));
    }
    if span_id.is_empty() {
        return Err(ContextError::InvalidScope);
    }

    let mut ctx = SpanContext::new(TraceId::from_hex(trace_id)?, SpanId::from_hex(span_id)?);
    if !parent_id.is_empty() {
        let parent = SpanId::from_hex(parent_id).map_err(|_| ContextError::InvalidParentSpanId)?;
        if !parent.is_zero() {
            ctx = ctx.with_parent(parent);
        }
    }
    if let Some(sampled) = sampled {
        ctx = ctx.with_sampled(sampled);
    }
    Ok(ctx.with_debug(debug))
}

/// Parses `{trace}-{span}[-{sampling}[-{parent}]]` or a lone sampling state.
fn parse_single_header(b3: &str) -> Result<SpanContext, ContextError> {
    if b3.is_empty() {
        return Err(ContextError::Empty);
    }

    let parts: Vec<&str> = b3.split('-').collect();
    if parts.len() == 1 {
        return parse_sampling_state(parts[0])
            .map(|(sampled, debug)| SpanContext::sampling_only(sampled, debug));
    }
    if parts.len() > 4 {
        return Err(ContextError::InvalidFormat);
    }

    let mut ctx = SpanContext::new(TraceId::from_hex(parts[0])?, SpanId::from_hex(parts[1])?);
    if let Some(state) = parts.get(2) {
        let (sampled, debug) = parse_sampling_state(state)?;
        if let Some(sampled) = sampled {
            ctx = ctx.with_sampled(sampled);
        }
        ctx = ctx.with_debug(debug);
    }
    if let Some(parent) = parts.get(3) {
        let parent = SpanId::from_hex(parent).map_err(|_| ContextError::InvalidParentSpanId)?;
        if !parent.is_zero() {
            ctx = ctx.with_parent(parent);
        }
    }
    Ok(ctx)
}

fn parse_sampling_state(state: &str) -> Result<(Option<bool>, bool), ContextError> {
    match state {
        "0" => Ok((Some(false), false)),
        "1" => Ok((Some(true), false)),
        "d" => Ok((None, true)),
        _ => Err(ContextError::InvalidSampled),
    }
}

fn build_single_header(context: &SpanContext) -> String {
    let state = if context.is_debug() {
        Some("d")
    } else {
        context.sampled().map(|s| if s { "1" } else { "0" })
    };

    if context.trace_id().is_empty() {
        return state.unwrap_or("0").to_string();
    }

    let mut header = format!("{}-{}", context.trace_id(), context.span_id());
    match (state, context.parent_id()) {
        (Some(state), Some(parent)) => header.push_str(&format!("-{}-{}", state, parent)),
        (Some(state), None) => header.push_str(&format!("-{}", state)),
        (None, _) => {},
    }
    header
}
