//! Propagation logger that keeps failures for inspection.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::PropagationLogger;
use crate::{Error, ErrorKind};

/// One recorded propagation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFailure {
    /// Subject of the affected message.
    pub subject: String,
    /// Error category.
    pub kind: ErrorKind,
    /// Full error text.
    pub message: String,
}

/// Records every failure passed to it.
///
/// Clones share the same record, so keep one clone and hand the other to
/// [`TracingConfig::with_logger`](crate::TracingConfig::with_logger).
///
/// ## Example
///
/// ```rust
/// use natstrace::testing::CapturingLogger;
/// use natstrace::TracingConfig;
///
/// let logger = CapturingLogger::new();
/// let config = TracingConfig::default().with_logger(logger.clone());
///
/// assert!(logger.failures().is_empty());
/// # let _ = config;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapturingLogger {
    failures: Arc<Mutex<Vec<CapturedFailure>>>,
}

impl CapturingLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the failures logged so far.
    pub fn failures(&self) -> Vec<CapturedFailure> {
        self.failures.lock().clone()
    }

    /// Forgets every recorded failure.
    pub fn clear(&self) {
        self.failures.lock().clear();
    }
}

impl PropagationLogger for CapturingLogger {
    fn log(&self, subject: &str, error: &Error) {
        self.failures.lock().push(CapturedFailure {
            subject: subject.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}
