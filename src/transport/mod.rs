//! Broker transport layer.
//!
//! This module provides:
//!
//! - [`Message`]: subject, optional reply subject and opaque payload
//! - [`Transport`]: the broker client abstraction
//! - [`MemoryTransport`]: an in-process broker with subject wildcards
//! - [`Subscriber`]: serves a subject through a middleware pipeline
//! - [`Publisher`]: sends through a middleware stack ending at the transport
//!
//! ## Request/Reply
//!
//! ```text
//!  Publisher                 Transport                 Subscriber
//!  ─────────                 ─────────                 ──────────
//!  ProducerTracing ──wrap──▶  request  ──deliver──▶  ConsumerTracing
//!                                                           │
//!        ◀──────────────── reply on _INBOX.* ◀─────── handler reply
//! ```

mod memory;
mod message;
mod publisher;
mod subscriber;
mod traits;

pub use memory::{INBOX_PREFIX, MemoryTransport, subject_matches};
pub use message::Message;
pub use publisher::{Publisher, SendMode};
pub use subscriber::{ServeHandle, Subscriber};
pub use traits::{Subscription, Transport};
