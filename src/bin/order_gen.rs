//! Load generator: posts randomized limit and market orders against the
//! ingress endpoint, using the user ids present in the database.

use anyhow::{bail, Context};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use spotmatch::Config;

#[derive(Parser, Debug)]
#[command(name = "order-gen", about = "Posts randomized orders to the exchange ingress")]
struct Args {
    /// Base URL of the exchange ingress.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    endpoint: String,

    /// Delay between orders, in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Stop after this many orders; runs forever when absent.
    #[arg(long)]
    count: Option<u64>,
}

/// Builds one random order message: LIMIT prices in [40000, 41000), amounts
/// in [0.01, 1.00), MARKET orders with price zero.
fn random_order(user_ids: &[i64]) -> Value {
    let mut rng = rand::thread_rng();

    let side = *["BID", "ASK"].choose(&mut rng).expect("non-empty");
    let kind = *["LIMIT", "MARKET"].choose(&mut rng).expect("non-empty");
    let user_id = *user_ids.choose(&mut rng).expect("non-empty");

    let price = if kind == "MARKET" {
        "0".to_string()
    } else {
        format!("{:.8}", 40000.0 + rng.gen::<f64>() * 1000.0)
    };
    let amount = format!("{:.8}", 0.01 + rng.gen::<f64>() * 0.99);

    serde_json::json!({
        "user_id": user_id,
        "order_type": side,
        "order_kind": kind,
        "price": price,
        "amount": amount,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let user_ids: Vec<i64> = sqlx::query("SELECT user_id FROM users")
        .fetch_all(&pool)
        .await
        .context("failed to load user ids")?
        .into_iter()
        .map(|row| row.get::<i64, _>(0))
        .collect();
    if user_ids.is_empty() {
        bail!("users table is empty; seed at least one user id");
    }
    info!(users = user_ids.len(), "loaded valid user ids");

    let client = reqwest::Client::new();
    let url = format!("{}/orders", args.endpoint.trim_end_matches('/'));
    let mut ticker = interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent: u64 = 0;

    loop {
        ticker.tick().await;

        let body = random_order(&user_ids);
        match client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                let ack: Value = response.json().await.unwrap_or_default();
                info!(order_id = %ack["order_id"], "order accepted");
            }
            Ok(response) => {
                warn!(status = %response.status(), "order rejected");
            }
            Err(err) => {
                warn!("failed to reach the ingress: {err}");
            }
        }

        sent += 1;
        if args.count.is_some_and(|limit| sent >= limit) {
            info!(sent, "done");
            break;
        }
    }
    Ok(())
}
