//! Envelope-based span context propagation.
//!
//! Brokers that carry only an opaque payload have no header channel for trace
//! context. A traced sender therefore wraps its payload in a JSON envelope:
//!
//! ```text
//! {"natsSpanContextB3Map": {"x-b3-traceid": "...", "x-b3-spanid": "...", ...},
//!  "data": "<base64 of the original payload>"}
//! ```
//!
//! Receivers unwrap it, and treat any payload that is not an envelope as a
//! message from an untraced sender. Traced and untraced peers can therefore
//! share subjects without corrupting each other's payloads.

mod codec;
mod propagation;

pub use codec::{CONTEXT_FIELD, ContextToken, DATA_FIELD, Envelope, EnvelopeCodec};
pub use propagation::{EnvelopePropagator, Injection};
