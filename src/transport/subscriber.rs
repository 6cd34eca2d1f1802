//! Serves a subject by running every delivered message through a pipeline.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::message::Message;
use super::traits::Transport;
use crate::Result;
use crate::middleware::Pipeline;
use crate::trace::TraceScope;

/// Dispatches inbound messages to a [`Pipeline`].
///
/// Each message is handled on its own task, so a slow handler does not hold
/// up the subscription. When the pipeline returns a reply and the message
/// carries a reply subject, the reply payload is published there.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use natstrace::middleware::{MiddlewareStack, Pipeline};
/// use natstrace::trace::TraceScope;
/// use natstrace::transport::{MemoryTransport, Message, Subscriber, Transport};
///
/// # tokio_test::block_on(async {
/// let transport = Arc::new(MemoryTransport::new());
/// let pipeline = Pipeline::new(MiddlewareStack::new(), |_: TraceScope, msg: Message| async move {
///     Ok::<_, natstrace::Error>(Some(msg.respond("pong")))
/// });
///
/// let handle = Subscriber::new(transport.clone(), pipeline).serve("ping").await.unwrap();
/// let reply = transport
///     .request(Message::new("ping", ""), std::time::Duration::from_secs(1))
///     .await
///     .unwrap();
/// assert_eq!(reply.data().as_ref(), b"pong");
///
/// handle.stop().await;
/// # });
/// ```
#[derive(Clone)]
pub struct Subscriber {
    transport: Arc<dyn Transport>,
    pipeline: Arc<Pipeline>,
}

impl Subscriber {
    /// Creates a subscriber that handles messages with `pipeline`.
    pub fn new(transport: Arc<dyn Transport>, pipeline: Pipeline) -> Self {
        Self { transport, pipeline: Arc::new(pipeline) }
    }

    /// Subscribes to `subject` and starts dispatching in the background.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the subscription cannot be created.
    pub async fn serve(&self, subject: &str) -> Result<ServeHandle> {
        let mut subscription = self.transport.subscribe(subject).await?;
        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let transport = Arc::clone(&self.transport);
        let pipeline = Arc::clone(&self.pipeline);

        tracing::info!(subject = subject, "serving subject");

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = subscription.next() => match message {
                        Some(message) => {
                            let transport = Arc::clone(&transport);
                            tokio::spawn(dispatch(transport, Arc::clone(&pipeline), message));
                        },
                        None => {
                            let subject = subscription.subject();
                            tracing::debug!(subject = subject, "subscription closed");
                            break;
                        },
                    },
                    _ = &mut stopped => {
                        tracing::debug!(subject = subscription.subject(), "serve loop stopped");
                        break;
                    },
                }
            }
        });

        Ok(ServeHandle { subject: subject.to_string(), shutdown: Some(shutdown), task })
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").field("pipeline", &self.pipeline).finish_non_exhaustive()
    }
}

async fn dispatch(transport: Arc<dyn Transport>, pipeline: Arc<Pipeline>, message: Message) {
    let subject = message.subject().to_string();
    let reply_to = message.reply().map(str::to_string);

    match pipeline.handle(TraceScope::new(), message).await {
        Ok(Some(reply)) => {
            let Some(reply_to) = reply_to else {
                tracing::debug!(subject = %subject, "reply dropped, message has no reply subject");
                return;
            };
            if let Err(err) = transport.publish(Message::new(reply_to, reply.into_data())).await {
                tracing::warn!(subject = %subject, error = %err, "failed to publish reply");
            }
        },
        Ok(None) => {},
        Err(err) => {
            tracing::warn!(subject = %subject, error = %err, "message handler failed");
        },
    }
}

/// Controls a running [`Subscriber::serve`] loop.
///
/// Dropping the handle also stops the loop; handlers already running finish
/// on their own tasks.
#[derive(Debug)]
pub struct ServeHandle {
    subject: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServeHandle {
    /// Returns the served subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns `true` once the serve loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the serve loop and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = (&mut self.task).await {
            tracing::warn!(subject = %self.subject, error = %err, "serve loop ended abnormally");
        }
    }
}
