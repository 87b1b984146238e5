//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name        | Description                                 | Return Type         |
// |-------------|---------------------------------------------|---------------------|
// | health      | Liveness probe                              | Response            |
// | place_order | Validate and enqueue a new order            | ApiResult<Response> |
// | get_book    | Aggregated book snapshot                    | ApiResult<Response> |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use super::{ApiError, ApiResult, AppState, PlaceOrderRequest, PlaceOrderResponse};

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Validates an inbound order and hands it to the engine.
///
/// The 200 acknowledges acceptance onto the inbound queue only; fills are
/// observed asynchronously on the trade channel.
pub async fn place_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<Response> {
    let order = req.into_order()?;

    if !state.store.user_exists(order.user_id).await? {
        return Err(ApiError::UnknownUser(order.user_id));
    }

    let order_id = order.order_id;
    state.engine.submit(order)?;
    debug!(%order_id, "order accepted");

    let response = PlaceOrderResponse {
        message: "order accepted".to_string(),
        order_id,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the aggregated per-level view of both sides of the book.
pub async fn get_book(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let depth = params
        .get("depth")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(20);

    let snapshot = state.engine.snapshot(depth).await?;
    Ok((StatusCode::OK, Json(snapshot)).into_response())
}
