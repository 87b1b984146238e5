//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Core data types shared by the order book, matcher and engine loop: orders,
// trades and their discrete enums, plus the wire-string conversions used by
// the ingress adapter and the persistent store.
//
// | Section | Description                                           |
// |---------|-------------------------------------------------------|
// | ENUMS   | Side, OrderKind, OrderStatus and their string forms.  |
// | STRUCTS | Order and Trade.                                      |
// | ERRORS  | Parse errors for the wire enums.                      |
// | TESTS   | Unit tests for conversions and construction.          |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::numeric::Fixed;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------

/// Side of an order: BID buys the base asset, ASK sells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The side holding the liquidity an incoming order of this side sweeps.
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Bid => "BID",
            Side::Ask => "ASK",
        }
    }
}

/// Kind of an order: LIMIT is price-bounded, MARKET takes any price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Limit => "LIMIT",
            OrderKind::Market => "MARKET",
        }
    }
}

/// Lifecycle status of an order.
///
/// `Close` is specific to market orders: the sweep ended with residual
/// amount, which is cancelled rather than booked. This includes the
/// zero-fill case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Persisted and accepted, no fills yet.
    Open,
    /// At least one fill, remaining amount still live.
    PartiallyFilled,
    /// Fully consumed.
    Filled,
    /// Market order with unfilled residual; the residual is discarded.
    Close,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Close => "CLOSE",
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  ERRORS
//--------------------------------------------------------------------------------------------------

/// Errors raised when converting wire strings into the typed enums.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid order side: {0}")]
    InvalidSide(String),
    #[error("invalid order kind: {0}")]
    InvalidKind(String),
    #[error("invalid order status: {0}")]
    InvalidStatus(String),
}

impl std::str::FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BID" => Ok(Side::Bid),
            "ASK" => Ok(Side::Ask),
            other => Err(TypeError::InvalidSide(other.to_string())),
        }
    }
}

impl std::str::FromStr for OrderKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIMIT" => Ok(OrderKind::Limit),
            "MARKET" => Ok(OrderKind::Market),
            other => Err(TypeError::InvalidKind(other.to_string())),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(OrderStatus::Open),
            "PARTIALLY_FILLED" => Ok(OrderStatus::PartiallyFilled),
            "FILLED" => Ok(OrderStatus::Filled),
            "CLOSE" => Ok(OrderStatus::Close),
            other => Err(TypeError::InvalidStatus(other.to_string())),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------

/// A trading order.
///
/// `amount` always holds the *remaining* quantity; the book, not the
/// persisted row, is the source of truth for it. `timestamp` is the
/// monotonic admission sequence assigned at the ingress boundary and is
/// what time priority is decided on — it never changes after admission,
/// including when a partially filled residual is booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: i64,
    pub side: Side,
    pub kind: OrderKind,
    /// Zero for market orders, strictly positive for limit orders.
    pub price: Fixed,
    /// Remaining amount, strictly positive until fully filled.
    pub amount: Fixed,
    pub timestamp: i64,
    pub status: OrderStatus,
}

impl Order {
    /// Builds a freshly admitted order in the `Open` state.
    pub fn new(
        order_id: Uuid,
        user_id: i64,
        side: Side,
        kind: OrderKind,
        price: Fixed,
        amount: Fixed,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            user_id,
            side,
            kind,
            price,
            amount,
            timestamp,
            status: OrderStatus::Open,
        }
    }
}

/// A completed trade between a resting maker and an incoming taker.
///
/// The price is always the maker's price. The bid/ask id slots are filled
/// by side, so the incoming order occupies whichever slot matches its own
/// side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub bid_order_id: Uuid,
    pub ask_order_id: Uuid,
    pub price: Fixed,
    pub amount: Fixed,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Creates a trade record, assigning the bid/ask slots from the taker's
    /// side.
    pub fn between(taker: &Order, maker: &Order, amount: Fixed) -> Self {
        let (bid_order_id, ask_order_id) = match taker.side {
            Side::Bid => (taker.order_id, maker.order_id),
            Side::Ask => (maker.order_id, taker.order_id),
        };
        Self {
            trade_id: Uuid::new_v4(),
            bid_order_id,
            ask_order_id,
            price: maker.price,
            amount,
            timestamp: Utc::now(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
