//! Sinks for non-fatal propagation failures.

use crate::Error;

/// Receives propagation failures the tracing middleware recovers from.
///
/// The middleware never fails a message because its trace context could not
/// be read or written; it reports the problem here and carries on.
pub trait PropagationLogger: Send + Sync {
    /// Records one failure for the message on `subject`.
    fn log(&self, subject: &str, error: &Error);
}

/// Logs propagation failures as `tracing` warnings. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PropagationLogger for TracingLogger {
    fn log(&self, subject: &str, error: &Error) {
        tracing::warn!(
            subject = subject,
            kind = %error.kind(),
            error = %error,
            "span context propagation failed"
        );
    }
}

/// Discards propagation failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl PropagationLogger for NopLogger {
    fn log(&self, _subject: &str, _error: &Error) {}
}

impl<F> PropagationLogger for F
where
    F: Fn(&str, &Error) + Send + Sync,
{
    fn log(&self, subject: &str, error: &Error) {
        self(subject, error)
    }
}
