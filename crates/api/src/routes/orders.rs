//! Customer order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{Order, PaymentMethod, ShippingAddress};
use fulfillment::CreateOrder;
use serde::Deserialize;
use store::Store;

use super::{ApiResponse, optional_json, parse_id};
use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub order_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /orders/create: checks out the caller's cart.
///
/// The lifecycle call runs on its own task so a client disconnect cannot drop
/// it between reserving stock and saving the order.
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ApiError> {
    let Json(req) = payload?;
    let cmd = CreateOrder {
        user_id: actor.id,
        shipping_address: req.shipping_address,
        payment_method: req.payment_method,
        notes: req.order_notes,
    };

    let orders = state.orders.clone();
    let order = tokio::spawn(async move { orders.create_order(cmd).await })
        .await
        .map_err(|e| ApiError::Internal(format!("order task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Order placed successfully", order)),
    ))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let orders = state.orders.list_user_orders(actor.id).await?;
    Ok(Json(ApiResponse::data(orders)))
}

/// GET /orders/{id}: one of the caller's orders.
#[tracing::instrument(skip_all, fields(user_id = %actor.id, order_id = %id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_user_order(order_id, actor.id).await?;
    Ok(Json(ApiResponse::data(order)))
}

/// PUT /orders/{id}/cancel: customer cancellation.
#[tracing::instrument(skip_all, fields(user_id = %actor.id, order_id = %id))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let CancelOrderRequest { reason } = optional_json(&body)?;
    let order = state.orders.cancel_order(order_id, actor.id, reason).await?;
    Ok(Json(ApiResponse::with_message(
        "Order cancelled successfully",
        order,
    )))
}
