//! Exchange server binary: wires the store, the trade feed, the engine loop
//! and the HTTP ingress together for one trading pair.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use spotmatch::api::{Api, AppState};
use spotmatch::{Config, Engine, PgStore, TradeFeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = Arc::new(PgStore::new(pool));
    store
        .ensure_schema()
        .await
        .context("failed to prepare the database schema")?;

    let feed = TradeFeed::new();

    // Mirror the trade channel into the log so completed trades are visible
    // without a downstream consumer attached.
    let subscription = feed.subscribe();
    std::thread::spawn(move || {
        while let Some(trade) = subscription.receive() {
            info!(
                trade_id = %trade.trade_id,
                price = %trade.price,
                amount = %trade.amount,
                "trade completed"
            );
        }
    });

    let (engine, client) = Engine::new(
        config.pair.clone(),
        store.clone(),
        Arc::new(feed),
        config.queue_depth,
    );
    let engine_task = tokio::spawn(engine.run());

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid BIND_ADDR {}", config.bind_addr))?;
    let api = Api::new(addr, AppState::new(client, store));

    tokio::select! {
        served = api.serve() => {
            served.context("ingress server failed")?;
        }
        finished = engine_task => {
            finished.context("engine task panicked")??;
        }
    }
    Ok(())
}
