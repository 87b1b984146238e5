// Expose the modules
pub mod api;
pub mod config;
pub mod engine;
pub mod matching_engine;
pub mod numeric;
pub mod orderbook;
pub mod publisher;
pub mod store;
pub mod types;

// Re-export key types for easier usage
pub use api::Api;
pub use config::Config;
pub use engine::{Engine, EngineClient, EngineError, SubmitError};
pub use matching_engine::{match_limit, match_market, MatchError, MatchOutcome};
pub use numeric::Fixed;
pub use orderbook::{BookSnapshot, OrderBook};
pub use publisher::{TradeFeed, TradeMessage, TradePublisher};
pub use store::{MatchBatch, MemoryStore, OrderStore, PgStore};
pub use types::{Order, OrderKind, OrderStatus, Side, Trade};
