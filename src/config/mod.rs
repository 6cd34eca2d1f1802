//! Configuration types for the tracing middleware.
//!
//! This module provides:
//! - [`TracingConfig`]: span naming, tags, propagation and error checking
//! - [`ErrorChecker`]: post-handling error inspection
//! - [`PropagationLogger`]: where recovered propagation failures are reported

mod logger;
mod options;

pub use logger::{NopLogger, PropagationLogger, TracingLogger};
pub use options::{ErrorChecker, TracingConfig};
