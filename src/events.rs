use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Domain events emitted by the checkout and payment flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: i64,
    },
    PaymentInitiated {
        order_id: i64,
        method: String,
        reference: String,
    },
    PaymentApproved {
        order_id: i64,
        transaction_id: Option<String>,
    },
    PaymentRejected {
        order_id: i64,
        reason: String,
    },
}

/// Cloneable handle for emitting events onto the shared channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Best-effort send; a closed or full channel is logged and swallowed so
    /// event delivery never fails a request.
    pub async fn send(&self, event: Event) {
        if let Err(err) = self.sender.send(event).await {
            warn!("event channel unavailable: {}", err);
        }
    }
}

pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Background consumer: one structured log line per event. Runs until every
/// sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
}
