//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The HTTP ingress adapter. A thin Axum layer in front of the engine: it
// validates inbound order messages, checks the user against the store and
// enqueues admitted orders. Matching happens asynchronously; a successful
// response means "queued", never "filled".
//
// | Component | Description                                   |
// |-----------|-----------------------------------------------|
// | AppState  | Engine handle + store shared by all handlers  |
// | Api       | Router construction and serving               |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::engine::EngineClient;
use crate::store::OrderStore;

pub use dto::{PlaceOrderRequest, PlaceOrderResponse};
pub use error::{ApiError, ApiResult};

/// Shared application state accessible by all handlers
pub struct AppState {
    pub engine: EngineClient,
    pub store: Arc<dyn OrderStore>,
}

impl AppState {
    pub fn new(engine: EngineClient, store: Arc<dyn OrderStore>) -> Self {
        Self { engine, store }
    }
}

/// The ingress HTTP server.
pub struct Api {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl Api {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state: Arc::new(state),
        }
    }

    /// Creates all routes for the adapter.
    pub fn routes(&self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/orders", post(routes::place_order))
            .route("/book", get(routes::get_book))
            .layer(Extension(self.state.clone()))
    }

    /// Starts the server and runs until shutdown.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let app = self.routes();
        info!("ingress listening on {}", self.addr);
        let listener = TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await
    }
}
