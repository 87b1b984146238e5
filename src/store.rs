//! Persistent store for orders and trades.
//!
//! The engine talks to storage through [`OrderStore`]: a plain insert for
//! freshly admitted orders, a single atomic [`MatchBatch`] per sweep, and
//! the user lookup the ingress adapter validates against. [`PgStore`] backs
//! the trait with Postgres; [`MemoryStore`] is the in-process double used
//! by tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::types::{Order, OrderStatus, Trade};

/// Errors surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),

    /// The store refused the write (unknown row, injected failure).
    #[error("store rejected the write: {0}")]
    Rejected(String),
}

/// A status transition for one persisted order row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

/// Everything a single sweep needs persisted: trade rows to append and
/// order statuses to move. Applied in one transaction or not at all.
#[derive(Debug, Clone, Default)]
pub struct MatchBatch {
    pub trades: Vec<Trade>,
    pub updates: Vec<StatusUpdate>,
}

impl MatchBatch {
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.updates.is_empty()
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a freshly admitted order with its initial status.
    async fn insert_order(&self, order: &Order, pair: &str) -> Result<(), StoreError>;

    /// Applies a sweep's trades and status updates atomically.
    async fn apply_match(&self, batch: &MatchBatch) -> Result<(), StoreError>;

    /// Whether the user id exists in the users table.
    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError>;
}

/// Postgres-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the orders/trades/users tables when missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_id   UUID PRIMARY KEY,
                user_id    BIGINT NOT NULL,
                pair       VARCHAR(20) NOT NULL,
                order_type VARCHAR(4) NOT NULL,
                price      NUMERIC NOT NULL,
                amount     NUMERIC NOT NULL,
                status     VARCHAR(20) NOT NULL DEFAULT 'OPEN',
                timestamp  BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                trade_id     UUID PRIMARY KEY,
                bid_order_id UUID NOT NULL,
                ask_order_id UUID NOT NULL,
                price        NUMERIC NOT NULL,
                amount       NUMERIC NOT NULL,
                timestamp    BIGINT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS users (user_id BIGINT PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order, pair: &str) -> Result<(), StoreError> {
        debug!(order_id = %order.order_id, "persisting order");
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, user_id, pair, order_type, price, amount, status, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.order_id)
        .bind(order.user_id)
        .bind(pair)
        .bind(order.side.as_str())
        .bind(order.price.as_decimal())
        .bind(order.amount.as_decimal())
        .bind(order.status.as_str())
        .bind(order.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(order_id = %order.order_id, "order insert failed: {e}");
            StoreError::from(e)
        })?;
        Ok(())
    }

    async fn apply_match(&self, batch: &MatchBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for update in &batch.updates {
            sqlx::query("UPDATE orders SET status = $1 WHERE order_id = $2")
                .bind(update.status.as_str())
                .bind(update.order_id)
                .execute(&mut *tx)
                .await?;
        }

        for trade in &batch.trades {
            sqlx::query(
                r#"
                INSERT INTO trades (trade_id, bid_order_id, ask_order_id, price, amount, timestamp)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(trade.trade_id)
            .bind(trade.bid_order_id)
            .bind(trade.ask_order_id)
            .bind(trade.price.as_decimal())
            .bind(trade.amount.as_decimal())
            .bind(trade.timestamp.timestamp())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            trades = batch.trades.len(),
            updates = batch.updates.len(),
            "match batch committed"
        );
        Ok(())
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[derive(Default)]
struct MemoryInner {
    orders: HashMap<Uuid, (Order, String)>,
    trades: Vec<Trade>,
    users: HashSet<i64>,
}

/// In-memory store used by tests and local runs without a database.
///
/// `fail_next_*` flags inject one-shot failures so the engine's rollback
/// behavior can be exercised deterministically.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_next_insert: AtomicBool,
    fail_next_apply: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(user_ids: impl IntoIterator<Item = i64>) -> Self {
        let store = Self::default();
        store.inner.lock().users.extend(user_ids);
        store
    }

    /// Makes the next `insert_order` call fail.
    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    /// Makes the next `apply_match` call fail.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    pub fn order_status(&self, order_id: Uuid) -> Option<OrderStatus> {
        self.inner
            .lock()
            .orders
            .get(&order_id)
            .map(|(order, _)| order.status)
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.inner.lock().trades.clone()
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().orders.len()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order, pair: &str) -> Result<(), StoreError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Rejected("injected insert failure".into()));
        }
        let mut inner = self.inner.lock();
        if inner.orders.contains_key(&order.order_id) {
            return Err(StoreError::Rejected(format!(
                "duplicate order {}",
                order.order_id
            )));
        }
        inner
            .orders
            .insert(order.order_id, (order.clone(), pair.to_string()));
        Ok(())
    }

    async fn apply_match(&self, batch: &MatchBatch) -> Result<(), StoreError> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Rejected("injected apply failure".into()));
        }
        let mut inner = self.inner.lock();

        // Validate everything before touching state so a failure leaves the
        // store unchanged, mirroring the transactional backend.
        for update in &batch.updates {
            if !inner.orders.contains_key(&update.order_id) {
                return Err(StoreError::Rejected(format!(
                    "unknown order {}",
                    update.order_id
                )));
            }
        }

        for update in &batch.updates {
            if let Some((order, _)) = inner.orders.get_mut(&update.order_id) {
                order.status = update.status;
            }
        }
        inner.trades.extend(batch.trades.iter().cloned());
        Ok(())
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.lock().users.contains(&user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Fixed;
    use crate::types::{OrderKind, Side};

    fn fx(s: &str) -> Fixed {
        s.parse().unwrap()
    }

    fn order(side: Side, price: &str, amount: &str) -> Order {
        Order::new(
            Uuid::new_v4(),
            1,
            side,
            OrderKind::Limit,
            fx(price),
            fx(amount),
            1,
        )
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::with_users([1, 2]);
        let o = order(Side::Bid, "40000", "1.0");
        store.insert_order(&o, "BTC_USDT").await.unwrap();

        assert_eq!(store.order_status(o.order_id), Some(OrderStatus::Open));
        assert!(store.user_exists(1).await.unwrap());
        assert!(!store.user_exists(9).await.unwrap());

        let maker = order(Side::Ask, "40000", "1.0");
        store.insert_order(&maker, "BTC_USDT").await.unwrap();

        let batch = MatchBatch {
            trades: vec![Trade::between(&o, &maker, fx("1.0"))],
            updates: vec![
                StatusUpdate {
                    order_id: o.order_id,
                    status: OrderStatus::Filled,
                },
                StatusUpdate {
                    order_id: maker.order_id,
                    status: OrderStatus::Filled,
                },
            ],
        };
        store.apply_match(&batch).await.unwrap();

        assert_eq!(store.order_status(o.order_id), Some(OrderStatus::Filled));
        assert_eq!(store.trades().len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicates() {
        let store = MemoryStore::new();
        let o = order(Side::Bid, "40000", "1.0");
        store.insert_order(&o, "BTC_USDT").await.unwrap();
        assert!(store.insert_order(&o, "BTC_USDT").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_failure_injection_is_one_shot() {
        let store = MemoryStore::new();
        store.fail_next_insert();

        let o = order(Side::Bid, "40000", "1.0");
        assert!(store.insert_order(&o, "BTC_USDT").await.is_err());
        store.insert_order(&o, "BTC_USDT").await.unwrap();

        store.fail_next_apply();
        let batch = MatchBatch::default();
        assert!(store.apply_match(&batch).await.is_err());
        store.apply_match(&batch).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_apply_is_all_or_nothing() {
        let store = MemoryStore::new();
        let known = order(Side::Bid, "40000", "1.0");
        store.insert_order(&known, "BTC_USDT").await.unwrap();

        let maker = order(Side::Ask, "40000", "1.0");
        let batch = MatchBatch {
            trades: vec![Trade::between(&known, &maker, fx("1.0"))],
            updates: vec![
                StatusUpdate {
                    order_id: maker.order_id, // never inserted
                    status: OrderStatus::Filled,
                },
                StatusUpdate {
                    order_id: known.order_id,
                    status: OrderStatus::Filled,
                },
            ],
        };

        assert!(store.apply_match(&batch).await.is_err());
        assert_eq!(store.order_status(known.order_id), Some(OrderStatus::Open));
        assert!(store.trades().is_empty());
    }
}
