use std::time::Duration;

use tokio::sync::mpsc;

use super::StatusMessage;

/// Handle for publishing status messages
///
/// This is cheaply cloneable and can be shared across workers.
/// Messages are sent through a bounded channel to be delivered by the
/// StatusListener.
#[derive(Clone)]
pub struct StatusHandle {
    tx: mpsc::Sender<StatusMessage>,
}

impl StatusHandle {
    /// Create a new status handle from a channel sender
    pub fn new(tx: mpsc::Sender<StatusMessage>) -> Self {
        Self { tx }
    }

    /// Publish a message without blocking
    ///
    /// Returns true if the message was queued. If the channel is full or
    /// closed the message is logged instead and the caller carries on.
    pub fn publish(&self, message: StatusMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::error!("Status channel full, dropping \"{}\"", message);
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                tracing::error!("Status channel closed, dropping \"{}\"", message);
                false
            }
        }
    }
}

/// Consuming end of the status channel.
pub struct StatusReceiver {
    rx: mpsc::Receiver<StatusMessage>,
}

impl StatusReceiver {
    pub fn new(rx: mpsc::Receiver<StatusMessage>) -> Self {
        Self { rx }
    }

    /// Wait for the next message. `None` once every handle is dropped and the
    /// buffer is empty.
    pub async fn recv(&mut self) -> Option<StatusMessage> {
        self.rx.recv().await
    }

    /// Wait up to `timeout` for the next message.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<StatusMessage> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Take a buffered message, if any.
    pub fn try_recv(&mut self) -> Option<StatusMessage> {
        self.rx.try_recv().ok()
    }
}

/// Create the status channel
///
/// Returns:
/// - `StatusHandle` - for publishing (clone this into every worker)
/// - `StatusReceiver` - hand this to a `StatusListener`
pub fn status_channel(capacity: usize) -> (StatusHandle, StatusReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StatusHandle::new(tx), StatusReceiver::new(rx))
}
