//! Outbound trade publication.
//!
//! Completed trades leave the engine through the [`TradePublisher`] seam on
//! a single logical channel, in emission order. [`TradeFeed`] is the
//! in-process fan-out implementation; a broker transport would implement
//! the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::Trade;

/// The wire form of a completed trade: ids plus string-encoded decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMessage {
    pub trade_id: Uuid,
    pub bid_order_id: Uuid,
    pub ask_order_id: Uuid,
    pub price: String,
    pub amount: String,
}

impl From<&Trade> for TradeMessage {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            bid_order_id: trade.bid_order_id,
            ask_order_id: trade.ask_order_id,
            price: trade.price.to_string(),
            amount: trade.amount.to_string(),
        }
    }
}

/// Errors surfaced by a trade sink.
///
/// Publication happens after the store commit; the engine logs these and
/// moves on, the trade stays authoritative in the database.
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("trade sink refused the message: {0}")]
    Refused(String),
}

#[async_trait]
pub trait TradePublisher: Send + Sync {
    async fn publish(&self, trade: &Trade) -> Result<(), PublishError>;
}

/// A live subscription to the trade feed.
pub struct TradeSubscription {
    id: Uuid,
    receiver: Receiver<TradeMessage>,
}

impl TradeSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Blocks until the next trade arrives or the feed is dropped.
    pub fn receive(&self) -> Option<TradeMessage> {
        self.receiver.recv().ok()
    }

    pub fn try_receive(&self) -> Option<TradeMessage> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Debug, Default)]
struct FeedInner {
    senders: HashMap<Uuid, Sender<TradeMessage>>,
}

/// In-process trade fan-out: every subscriber sees every trade, in
/// publication order.
#[derive(Debug, Clone, Default)]
pub struct TradeFeed {
    inner: Arc<RwLock<FeedInner>>,
}

impl TradeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> TradeSubscription {
        let id = Uuid::new_v4();
        let (sender, receiver) = unbounded();
        self.inner.write().senders.insert(id, sender);
        TradeSubscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: Uuid) -> bool {
        self.inner.write().senders.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.read().senders.len()
    }

    fn broadcast(&self, message: TradeMessage) {
        // Collect senders first so a slow subscriber never holds the lock.
        let senders = {
            let inner = self.inner.read();
            inner.senders.values().cloned().collect::<Vec<_>>()
        };
        for sender in senders {
            let _ = sender.try_send(message.clone());
        }
    }
}

#[async_trait]
impl TradePublisher for TradeFeed {
    async fn publish(&self, trade: &Trade) -> Result<(), PublishError> {
        self.broadcast(TradeMessage::from(trade));
        Ok(())
    }
}
