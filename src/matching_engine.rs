//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The matching algorithm: sweeps an incoming order against the opposite side
// of the book in price-time priority and plans the complete set of effects.
// The matcher never mutates the book or the store — it returns a
// MatchOutcome that the engine loop commits atomically (DB first, then book,
// then publication), so observers never see a partial match.
//
// | Component    | Description                                            |
// |--------------|--------------------------------------------------------|
// | match_limit  | Sweep with the price gate; residual is booked          |
// | match_market | Sweep without a gate; residual is discarded (CLOSE)    |
// | MatchOutcome | Trades, maker fills and the taker's final disposition  |
//--------------------------------------------------------------------------------------------------

use thiserror::Error;
use uuid::Uuid;

use crate::numeric::Fixed;
use crate::orderbook::OrderBook;
use crate::types::{Order, OrderKind, OrderStatus, Side, Trade};

/// Errors raised when an order is unfit for matching.
///
/// These guard engine-internal preconditions; the ingress adapter rejects
/// malformed orders long before they reach this point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid order for matching: {0}")]
    InvalidOrder(String),
}

pub type MatchingResult<T> = Result<T, MatchError>;

/// One maker's share of a sweep: how much was consumed and what is left.
#[derive(Debug, Clone, PartialEq)]
pub struct MakerFill {
    pub order_id: Uuid,
    pub price: Fixed,
    /// Amount consumed from this maker by the sweep.
    pub amount: Fixed,
    /// Maker's remaining amount after the fill; zero means it leaves the book.
    pub remaining: Fixed,
    pub status: OrderStatus,
}

/// The planned result of matching one incoming order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    /// The taker with its final status; `amount` holds the residual.
    pub taker: Order,
    /// The taker's amount before the sweep.
    pub original_amount: Fixed,
    /// Trades in emission order: ascending opposite price for an incoming
    /// bid (descending for an ask), ascending maker timestamp within a
    /// price.
    pub trades: Vec<Trade>,
    /// Maker consumption in the same order as `trades`.
    pub maker_fills: Vec<MakerFill>,
}

impl MatchOutcome {
    pub fn residual(&self) -> Fixed {
        self.taker.amount
    }

    /// True when the taker leaves a residual that belongs on the book:
    /// limit orders only, market residuals are cancelled.
    pub fn books_residual(&self) -> bool {
        self.taker.kind == OrderKind::Limit && self.taker.amount.is_positive()
    }
}

/// Matches an incoming limit order against the book.
///
/// The sweep stops at the first level whose price fails the taker's limit;
/// whatever remains afterwards is reported for booking with the taker's
/// original admission timestamp intact.
pub fn match_limit(book: &OrderBook, taker: Order) -> MatchingResult<MatchOutcome> {
    if taker.kind != OrderKind::Limit {
        return Err(MatchError::InvalidOrder("expected a limit order".into()));
    }
    if !taker.price.is_positive() {
        return Err(MatchError::InvalidOrder(format!(
            "limit order with non-positive price {}",
            taker.price
        )));
    }
    if !taker.amount.is_positive() {
        return Err(MatchError::InvalidOrder(format!(
            "order with non-positive amount {}",
            taker.amount
        )));
    }
    Ok(sweep(book, taker))
}

/// Matches an incoming market order against the book.
///
/// No price gate: the sweep runs until the taker is filled or the opposite
/// side is empty. Any residual is discarded and the order closes.
pub fn match_market(book: &OrderBook, taker: Order) -> MatchingResult<MatchOutcome> {
    if taker.kind != OrderKind::Market {
        return Err(MatchError::InvalidOrder("expected a market order".into()));
    }
    if !taker.price.is_zero() {
        return Err(MatchError::InvalidOrder(format!(
            "market order with price {}",
            taker.price
        )));
    }
    if !taker.amount.is_positive() {
        return Err(MatchError::InvalidOrder(format!(
            "order with non-positive amount {}",
            taker.amount
        )));
    }
    Ok(sweep(book, taker))
}

/// The common sweep. Walks opposite-side levels best-first and each level's
/// FIFO queue in order, filling `min(taker remaining, maker remaining)` per
/// maker at the maker's price.
///
/// Iteration runs over the live book without mutating it, which is the
/// snapshot the self-modification rule asks for: removals and decrements
/// happen later, when the engine applies the outcome.
fn sweep(book: &OrderBook, mut taker: Order) -> MatchOutcome {
    let original_amount = taker.amount;
    let mut trades = Vec::new();
    let mut maker_fills = Vec::new();

    'levels: for level in book.levels(taker.side.opposite()) {
        if taker.kind == OrderKind::Limit {
            let acceptable = match taker.side {
                Side::Bid => level.price <= taker.price,
                Side::Ask => level.price >= taker.price,
            };
            if !acceptable {
                break;
            }
        }

        for maker in level.orders() {
            if taker.amount.is_zero() {
                break 'levels;
            }
            let fill = taker.amount.min(maker.amount);
            let remaining = maker.amount - fill;

            trades.push(Trade::between(&taker, maker, fill));
            maker_fills.push(MakerFill {
                order_id: maker.order_id,
                price: maker.price,
                amount: fill,
                remaining,
                status: if remaining.is_zero() {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                },
            });
            taker.amount -= fill;
        }
    }

    taker.status = if taker.amount.is_zero() {
        OrderStatus::Filled
    } else if taker.kind == OrderKind::Market {
        OrderStatus::Close
    } else if taker.amount < original_amount {
        OrderStatus::PartiallyFilled
    } else {
        OrderStatus::Open
    };

    MatchOutcome {
        taker,
        original_amount,
        trades,
        maker_fills,
    }
}
