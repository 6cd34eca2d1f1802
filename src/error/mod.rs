//! Error types for the crate.
//!
//! A single [`Error`] type carries an [`ErrorKind`] for matching.
//!
//! ## Key Invariant
//!
//! Propagation failures (`MalformedEnvelope`, `EmptyContext`, `Codec`) are
//! returned by the low-level extract/inject calls but never escape the
//! tracing middleware: a message whose trace context cannot be trusted is
//! still handled or sent, just without a linked trace.
//!
//! ```rust,ignore
//! // Low level: the caller decides
//! match propagator.extract(&mut message) {
//!     Ok(Some(parent)) => { /* continue the remote trace */ }
//!     Ok(None) => { /* untraced sender */ }
//!     Err(err) if err.kind().is_propagation() => { /* log and start a root span */ }
//!     Err(err) => return Err(err),
//! }
//! ```

mod core;
mod kind;

pub use self::core::Error;
pub use kind::ErrorKind;

/// A specialized `Result` type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by user-supplied callbacks such as error checkers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
