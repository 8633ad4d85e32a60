//! Engine event fan-out.
//!
//! State changes (auth transitions, application submissions, review
//! decisions) are published as JSON notifications that an embedding UI shell
//! can subscribe to and render. Token material never appears in payloads.

use serde_json::Value;
use tokio::sync::broadcast;

/// Broadcasts serialized `{event, payload}` notifications to all subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<String>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish a notification to all subscribers.
    pub fn broadcast(&self, event: &str, payload: Value) {
        let notification = serde_json::json!({
            "event": event,
            "payload": payload,
        });
        // No subscribers is fine
        let _ = self
            .tx
            .send(serde_json::to_string(&notification).unwrap_or_default());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_notifications() {
        let broadcaster = EventBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        broadcaster.broadcast("auth.stateChanged", serde_json::json!({ "loading": false }));

        let raw = rx.recv().await.unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["event"], "auth.stateChanged");
        assert_eq!(value["payload"]["loading"], false);
    }

    #[test]
    fn broadcast_without_subscribers_is_a_noop() {
        let broadcaster = EventBroadcaster::new();
        broadcaster.broadcast("application.submitted", serde_json::json!({}));
    }
}
