//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name               | Description                                   |
// |--------------------|-----------------------------------------------|
// | PlaceOrderRequest  | Inbound order message (§ /orders)             |
// | PlaceOrderResponse | Acknowledgement returned on acceptance        |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use crate::numeric::Fixed;
use crate::types::{Order, OrderKind, Side};

/// The inbound order message.
///
/// `order_id` and `timestamp` are optional: missing or zero values are
/// assigned at admission. Prices and amounts travel as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    pub user_id: i64,
    pub order_type: String,
    pub order_kind: String,
    pub price: String,
    pub amount: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl PlaceOrderRequest {
    /// Validates the message and converts it into an admitted order.
    ///
    /// Rejections here implement the boundary contract: malformed orders
    /// never reach the engine.
    pub fn into_order(self) -> Result<Order, ApiError> {
        let side: Side = self.order_type.parse()?;
        let kind: OrderKind = self.order_kind.parse()?;

        let price: Fixed = self
            .price
            .parse()
            .map_err(|_| ApiError::InvalidOrder(format!("invalid price: {}", self.price)))?;
        let amount: Fixed = self
            .amount
            .parse()
            .map_err(|_| ApiError::InvalidOrder(format!("invalid amount: {}", self.amount)))?;

        if !amount.is_positive() {
            return Err(ApiError::InvalidOrder(
                "amount must be greater than zero".to_string(),
            ));
        }
        match kind {
            OrderKind::Limit => {
                if !price.is_positive() {
                    return Err(ApiError::InvalidOrder(
                        "limit order price must be greater than zero".to_string(),
                    ));
                }
            }
            OrderKind::Market => {
                if !price.is_zero() {
                    return Err(ApiError::InvalidOrder(
                        "market order price must be zero".to_string(),
                    ));
                }
            }
        }

        let order_id = self.order_id.unwrap_or_else(Uuid::new_v4);
        let timestamp = if self.timestamp == 0 {
            Utc::now().timestamp()
        } else {
            self.timestamp
        };

        Ok(Order::new(
            order_id,
            self.user_id,
            side,
            kind,
            price,
            amount,
            timestamp,
        ))
    }
}

/// Acknowledgement returned once the order is on the inbound queue.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderResponse {
    pub message: String,
    pub order_id: Uuid,
}
