//! Notifier that keeps every message it receives.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::status::{Notifier, StatusMessage};

/// Mock implementation of the Notifier trait.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<RwLock<Vec<StatusMessage>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all delivered messages, oldest first.
    pub async fn messages(&self) -> Vec<StatusMessage> {
        self.messages.read().await.clone()
    }

    /// Messages with the given title.
    pub async fn messages_titled(&self, title: &str) -> Vec<StatusMessage> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.title == title)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &StatusMessage) {
        self.messages.write().await.push(message.clone());
    }
}
