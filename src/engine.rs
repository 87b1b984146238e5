//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The engine loop: the single consumer of the inbound order queue. Each
// order runs through persist → plan → commit → book → publish in that
// order, so the book, the store and the trade feed stay mutually
// consistent. Concurrency above the queue is fan-in; below it the matcher
// sees exactly one order at a time and the book needs no locks.
//
// | Component    | Description                                            |
// |--------------|--------------------------------------------------------|
// | Engine       | Owns the book; drains the command queue                |
// | EngineClient | Cloneable handle: submit orders, request snapshots     |
// | EngineError  | Store, matcher and book-invariant failures             |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::matching_engine::{match_limit, match_market, MatchError, MatchOutcome};
use crate::orderbook::{BookSnapshot, OrderBook};
use crate::publisher::TradePublisher;
use crate::store::{MatchBatch, OrderStore, StatusUpdate, StoreError};
use crate::types::{Order, OrderKind, OrderStatus};

/// Errors raised while processing one order.
///
/// Store and matcher failures drop the order and leave the book unchanged;
/// a book inconsistency is fatal and halts the loop.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("matching failure: {0}")]
    Match(#[from] MatchError),

    #[error("order book inconsistency: {0}")]
    BookInconsistency(String),
}

/// Errors raised when handing work to the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The bounded inbound queue is full; the ingress adapter applies
    /// backpressure.
    #[error("inbound queue full")]
    QueueFull,

    #[error("engine stopped")]
    Closed,
}

enum EngineCommand {
    Process(Order),
    Snapshot {
        depth: usize,
        reply: oneshot::Sender<BookSnapshot>,
    },
}

/// Cloneable handle for the ingress adapter and read-side endpoints.
#[derive(Clone)]
pub struct EngineClient {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineClient {
    /// Enqueues an admitted order. Non-blocking: a full queue is reported
    /// to the caller instead of stalling the ingress.
    pub fn submit(&self, order: Order) -> Result<(), SubmitError> {
        self.commands
            .try_send(EngineCommand::Process(order))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
            })
    }

    /// Requests an aggregated book snapshot from the engine task.
    ///
    /// Commands are processed in order, so the reply also acts as a barrier:
    /// every order submitted before this call has been fully processed when
    /// the snapshot arrives.
    pub async fn snapshot(&self, depth: usize) -> Result<BookSnapshot, SubmitError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(EngineCommand::Snapshot { depth, reply })
            .await
            .map_err(|_| SubmitError::Closed)?;
        rx.await.map_err(|_| SubmitError::Closed)
    }
}

/// The matching engine loop for one trading pair.
pub struct Engine {
    book: OrderBook,
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn TradePublisher>,
    commands: mpsc::Receiver<EngineCommand>,
}

impl Engine {
    /// Creates the engine and its client handle. `queue_depth` bounds the
    /// inbound queue between ingress and the loop.
    pub fn new(
        pair: impl Into<String>,
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn TradePublisher>,
        queue_depth: usize,
    ) -> (Self, EngineClient) {
        let (tx, rx) = mpsc::channel(queue_depth);
        let engine = Self {
            book: OrderBook::new(pair),
            store,
            publisher,
            commands: rx,
        };
        (engine, EngineClient { commands: tx })
    }

    /// Drains the command queue until every client handle is dropped, or a
    /// book inconsistency forces a halt.
    pub async fn run(mut self) -> Result<(), EngineError> {
        info!(pair = self.book.pair(), "matching engine started");
        while let Some(command) = self.commands.recv().await {
            match command {
                EngineCommand::Process(order) => {
                    let order_id = order.order_id;
                    match self.process(order).await {
                        Ok(outcome) => {
                            debug!(
                                %order_id,
                                trades = outcome.trades.len(),
                                residual = %outcome.residual(),
                                status = outcome.taker.status.as_str(),
                                "order processed"
                            );
                        }
                        Err(err @ EngineError::BookInconsistency(_)) => {
                            error!(%order_id, "halting engine: {err}");
                            return Err(err);
                        }
                        Err(err) => {
                            warn!(%order_id, "order dropped: {err}");
                        }
                    }
                }
                EngineCommand::Snapshot { depth, reply } => {
                    let _ = reply.send(self.book.snapshot(depth));
                }
            }
        }
        info!(pair = self.book.pair(), "matching engine stopped");
        Ok(())
    }

    /// Runs one order through the full pipeline.
    ///
    /// Order of operations is the atomicity contract: the store transaction
    /// commits before any book mutation, and publication comes last. A
    /// failure before the commit leaves both the book and the store rows
    /// exactly as they were (minus the OPEN order row, which is the record
    /// of an order that was admitted but never matched).
    async fn process(&mut self, order: Order) -> Result<MatchOutcome, EngineError> {
        self.store.insert_order(&order, self.book.pair()).await?;

        let outcome = match order.kind {
            OrderKind::Limit => match_limit(&self.book, order)?,
            OrderKind::Market => match_market(&self.book, order)?,
        };

        self.store.apply_match(&build_batch(&outcome)).await?;
        self.apply_to_book(&outcome)?;

        for trade in &outcome.trades {
            if let Err(err) = self.publisher.publish(trade).await {
                // The commit already happened; the trade is authoritative in
                // the store even if the feed missed it.
                warn!(trade_id = %trade.trade_id, "trade publication failed: {err}");
            }
        }

        Ok(outcome)
    }

    /// Applies the planned book mutations after a successful commit.
    fn apply_to_book(&mut self, outcome: &MatchOutcome) -> Result<(), EngineError> {
        for fill in &outcome.maker_fills {
            if fill.remaining.is_zero() {
                if self.book.remove(fill.order_id).is_none() {
                    return Err(EngineError::BookInconsistency(format!(
                        "filled maker {} missing from the book",
                        fill.order_id
                    )));
                }
            } else {
                self.book
                    .fill(fill.order_id, fill.amount)
                    .map_err(|e| EngineError::BookInconsistency(e.to_string()))?;
            }
        }

        if outcome.books_residual() {
            self.book
                .insert(outcome.taker.clone())
                .map_err(|e| EngineError::BookInconsistency(e.to_string()))?;
        }

        if self.book.is_crossed() {
            return Err(EngineError::BookInconsistency(format!(
                "book crossed after sweep: bid {:?} / ask {:?}",
                self.book.best_bid(),
                self.book.best_ask()
            )));
        }
        Ok(())
    }
}

/// Collects a sweep's persistent effects: every maker transition plus the
/// taker's, when it moved off its initial OPEN state.
fn build_batch(outcome: &MatchOutcome) -> MatchBatch {
    let mut updates: Vec<StatusUpdate> = outcome
        .maker_fills
        .iter()
        .map(|fill| StatusUpdate {
            order_id: fill.order_id,
            status: fill.status,
        })
        .collect();

    if outcome.taker.status != OrderStatus::Open {
        updates.push(StatusUpdate {
            order_id: outcome.taker.order_id,
            status: outcome.taker.status,
        });
    }

    MatchBatch {
        trades: outcome.trades.clone(),
        updates,
    }
}
