use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Domain events emitted by the order lifecycle after a committed state
/// change. Delivery is advisory: consumers observe, they never gate the
/// transition itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderSubmitted {
        order_id: i64,
        number: String,
        amount: Decimal,
    },
    OrderPaid {
        order_id: i64,
    },
    OrderConfirmed {
        order_id: i64,
    },
    OrderDelivered {
        order_id: i64,
    },
    OrderCompleted {
        order_id: i64,
    },
    OrderCancelled {
        order_id: i64,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging on failure. Event delivery never fails the
    /// surrounding operation.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            error!("Failed to deliver domain event: {}", e);
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Consumer loop. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderSubmitted { order_id, number, amount } => {
                info!(order_id, number = %number, amount = %amount, "order submitted");
            }
            Event::OrderPaid { order_id } => info!(order_id, "order paid"),
            Event::OrderConfirmed { order_id } => info!(order_id, "order confirmed"),
            Event::OrderDelivered { order_id } => info!(order_id, "order out for delivery"),
            Event::OrderCompleted { order_id } => info!(order_id, "order completed"),
            Event::OrderCancelled { order_id, reason } => {
                info!(order_id, reason = %reason, "order cancelled");
            }
        }
    }
    info!("Event channel closed; processor exiting");
}
