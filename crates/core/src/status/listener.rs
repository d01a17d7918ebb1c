use std::sync::Arc;

use async_trait::async_trait;

use super::{StatusMessage, StatusReceiver};
use crate::shutdown::StopSignal;

/// Renders status messages to the user.
///
/// Implementations must return promptly; workers never wait on them, but a
/// slow notifier lets the status channel fill up.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &StatusMessage);
}

/// Background task that drains the status channel into a notifier
pub struct StatusListener {
    rx: StatusReceiver,
    notifier: Arc<dyn Notifier>,
    stop: StopSignal,
}

impl StatusListener {
    /// Create a new status listener
    pub fn new(rx: StatusReceiver, notifier: Arc<dyn Notifier>, stop: StopSignal) -> Self {
        Self { rx, notifier, stop }
    }

    /// Run the listener until the stop signal is raised or every handle is
    /// dropped. Messages already buffered at stop time are still delivered.
    ///
    /// Returns the number of messages delivered. This should be spawned as a
    /// background task.
    pub async fn run(mut self) -> usize {
        tracing::info!("Status listener started");
        let mut delivered = 0;

        loop {
            tokio::select! {
                biased;
                message = self.rx.recv() => match message {
                    Some(message) => {
                        self.notifier.notify(&message).await;
                        delivered += 1;
                    }
                    None => {
                        tracing::info!("Status channel closed, listener shutting down");
                        return delivered;
                    }
                },
                _ = self.stop.triggered() => break,
            }
        }

        while let Some(message) = self.rx.try_recv() {
            self.notifier.notify(&message).await;
            delivered += 1;
        }

        tracing::info!("Status listener shutting down");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::status::status_channel;

    /// Mock notifier that records deliveries
    #[derive(Default)]
    struct MockNotifier {
        messages: Mutex<Vec<StatusMessage>>,
    }

    impl MockNotifier {
        fn get_messages(&self) -> Vec<StatusMessage> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn notify(&self, message: &StatusMessage) {
            self.messages.lock().unwrap().push(message.clone());
        }
    }

    #[tokio::test]
    async fn test_listener_delivers_until_channel_closes() {
        let notifier = Arc::new(MockNotifier::default());
        let (handle, rx) = status_channel(10);
        let listener = StatusListener::new(rx, notifier.clone(), StopSignal::new());

        let task = tokio::spawn(listener.run());

        for i in 0..5 {
            handle.publish(StatusMessage::sorted(&format!("f{i}.jpg"), "Images"));
        }
        drop(handle);

        let delivered = task.await.unwrap();
        assert_eq!(delivered, 5);
        assert_eq!(notifier.get_messages().len(), 5);
        assert_eq!(notifier.get_messages()[0].text, "f0.jpg was moved to Images.");
    }

    #[tokio::test]
    async fn test_listener_drains_buffer_on_stop() {
        let notifier = Arc::new(MockNotifier::default());
        let stop = StopSignal::new();
        let (handle, rx) = status_channel(10);

        handle.publish(StatusMessage::sorted("a.jpg", "Images"));
        handle.publish(StatusMessage::move_error("b.zip"));
        stop.trigger();

        let delivered = StatusListener::new(rx, notifier.clone(), stop).run().await;

        assert_eq!(delivered, 2);
        assert_eq!(notifier.get_messages()[1].title, "Move Error");
    }

    #[tokio::test]
    async fn test_listener_exits_on_stop_while_idle() {
        let notifier = Arc::new(MockNotifier::default());
        let stop = StopSignal::new();
        let (_handle, rx) = status_channel(10);

        let task = tokio::spawn(StatusListener::new(rx, notifier, stop.clone()).run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.trigger();

        let delivered = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("listener should observe stop")
            .unwrap();
        assert_eq!(delivered, 0);
    }
}
