use dotenv::dotenv;
use std::env;

const DATABASE_URL: &str = "DATABASE_URL";
const BIND_ADDR: &str = "BIND_ADDR";
const PAIR: &str = "PAIR";
const QUEUE_DEPTH: &str = "QUEUE_DEPTH";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PAIR: &str = "BTC_USDT";
const DEFAULT_QUEUE_DEPTH: usize = 1024;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub pair: String,
    pub queue_depth: usize,
}

impl Config {
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_from_env() -> Result<Config, String> {
        // Load .env file
        dotenv().ok();

        let database_url = env::var(DATABASE_URL)
            .map_err(|_| format!("failed to load environment variable {}", DATABASE_URL))?;

        let bind_addr = env::var(BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let pair = env::var(PAIR).unwrap_or_else(|_| DEFAULT_PAIR.to_string());

        let queue_depth = match env::var(QUEUE_DEPTH) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("failed to parse {} as a queue depth", QUEUE_DEPTH))?,
            Err(_) => DEFAULT_QUEUE_DEPTH,
        };
        if queue_depth == 0 {
            return Err(format!("{} must be at least 1", QUEUE_DEPTH));
        }

        Ok(Config {
            database_url,
            bind_addr,
            pair,
            queue_depth,
        })
    }
}
