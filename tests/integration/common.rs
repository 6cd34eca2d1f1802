//! Common test harness for natstrace integration tests.
//!
//! Every test builds its own [`Harness`]: an in-memory broker, a tracer that
//! records finished spans and a logger that records propagation failures.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Result, bail};
use natstrace::TracingConfig;
use natstrace::middleware::{ConsumerTracing, Endpoint, MiddlewareStack, Pipeline, ProducerTracing};
use natstrace::testing::{CapturingLogger, RecordingReporter};
use natstrace::trace::{FinishedSpan, LocalTracer, Tracer};
use natstrace::transport::{MemoryTransport, Publisher, ServeHandle, Subscriber};

/// How long to wait for asynchronous span reports.
pub const SPAN_WAIT: Duration = Duration::from_secs(5);

static TRACING: OnceLock<()> = OnceLock::new();

/// Installs a `tracing` subscriber once per test binary.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Shared fixtures for one test.
pub struct Harness {
    pub transport: Arc<MemoryTransport>,
    pub reporter: Arc<RecordingReporter>,
    pub tracer: Arc<dyn Tracer>,
    pub logger: CapturingLogger,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let reporter = Arc::new(RecordingReporter::new());
        let tracer: Arc<dyn Tracer> = Arc::new(LocalTracer::new(reporter.clone()));
        let transport = Arc::new(MemoryTransport::new());
        Self { transport, reporter, tracer, logger: CapturingLogger::new() }
    }

    /// Default configuration wired to the capturing logger.
    pub fn config(&self) -> TracingConfig {
        TracingConfig::default().with_logger(self.logger.clone())
    }

    /// Serves `subject` with a consumer-traced pipeline ending in `handler`.
    pub async fn serve(
        &self,
        subject: &str,
        config: TracingConfig,
        handler: impl Endpoint,
    ) -> Result<ServeHandle> {
        let stack = MiddlewareStack::new().with(ConsumerTracing::new(self.tracer.clone(), config));
        let pipeline = Pipeline::new(stack, handler);
        let handle = Subscriber::new(self.transport.clone(), pipeline).serve(subject).await?;
        Ok(handle)
    }

    /// A publisher with producer tracing in front of the transport.
    pub fn publisher(&self, config: TracingConfig) -> Publisher {
        let stack = MiddlewareStack::new().with(ProducerTracing::new(self.tracer.clone(), config));
        Publisher::new(self.transport.clone(), stack)
    }

    /// Waits until at least `count` spans have been reported.
    pub async fn wait_for_spans(&self, count: usize) -> Result<Vec<FinishedSpan>> {
        let deadline = tokio::time::Instant::now() + SPAN_WAIT;
        loop {
            let spans = self.reporter.spans();
            if spans.len() >= count {
                return Ok(spans);
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("expected {} spans, got {}", count, spans.len());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
