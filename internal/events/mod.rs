use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One activity event, emitted after every handled request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: u64,
    pub timestamp: String,
}

#[derive(Debug)]
struct Subscriber {
    id: Uuid,
    sender: UnboundedSender<String>,
}

/// Process-local fan-out of request events to WebSocket observers.
///
/// Broadcasting is best-effort: a subscriber whose channel is gone is
/// pruned, and no failure ever propagates to the request that triggered
/// the event.
#[derive(Clone, Debug)]
pub struct ActivityHub {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn subscribe(&self) -> (Uuid, UnboundedReceiver<String>) {
        let (sender, receiver) = unbounded_channel();
        let id = Uuid::new_v4();
        self.subscribers.lock().await.push(Subscriber { id, sender });
        (id, receiver)
    }

    pub async fn unsubscribe(&self, id: Uuid) {
        self.subscribers
            .lock()
            .await
            .retain(|subscriber| subscriber.id != id);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn broadcast(&self, event: &RequestEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        let mut subscribers = self.subscribers.lock().await;
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.sender.send(payload.clone()).is_ok());
        let pruned = before - subscribers.len();
        if pruned > 0 {
            tracing::debug!(pruned, "removed dead activity subscribers");
        }
    }

    /// Owns one observer socket for its lifetime: forwards broadcast
    /// events out, drains inbound frames, and deregisters on close or
    /// error.
    pub async fn run_socket(&self, socket: WebSocket) {
        let (id, mut receiver) = self.subscribe().await;
        tracing::debug!(subscriber = %id, "activity observer connected");
        let (mut sink, mut stream) = socket.split();
        loop {
            tokio::select! {
                outbound = receiver.recv() => {
                    let Some(payload) = outbound else {
                        break;
                    };
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
        self.unsubscribe(id).await;
        tracing::debug!(subscriber = %id, "activity observer disconnected");
    }
}

impl Default for ActivityHub {
    fn default() -> Self {
        Self::new()
    }
}
