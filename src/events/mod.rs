use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after state-changing operations commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered(Uuid),
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
        total: Decimal,
    },
    CouponRedeemed {
        code: String,
        order_id: Uuid,
    },
    StockDepleted {
        product_id: Uuid,
    },
    CartCleared {
        cart_id: Uuid,
        user_id: Uuid,
    },
}

/// Handle for emitting events; cheap to clone.
///
/// Sends are best-effort: a full or closed channel is logged and dropped
/// rather than failing the request that produced the event.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("failed to send event: {}", e);
        }
    }
}

/// Drains the event channel, logging each event. Runs until every sender
/// has been dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::UserRegistered(user_id) => {
                info!(%user_id, "user registered");
            }
            Event::OrderPlaced {
                order_id,
                user_id,
                total,
            } => {
                info!(%order_id, %user_id, %total, "order placed");
            }
            Event::CouponRedeemed { code, order_id } => {
                info!(%code, %order_id, "coupon redeemed");
            }
            Event::StockDepleted { product_id } => {
                warn!(%product_id, "product stock depleted");
            }
            Event::CartCleared { cart_id, user_id } => {
                info!(%cart_id, %user_id, "cart cleared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender.send(Event::UserRegistered(Uuid::new_v4())).await;

        assert!(matches!(rx.recv().await, Some(Event::UserRegistered(_))));
    }

    #[tokio::test]
    async fn send_on_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        sender
            .send(Event::StockDepleted {
                product_id: Uuid::new_v4(),
            })
            .await;
    }
}
