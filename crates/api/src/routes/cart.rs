//! Cart endpoints. Every route acts on the caller's own cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use common::{CartLineId, ProductId};
use domain::Cart;
use fulfillment::AddToCart;
use serde::Deserialize;
use store::Store;

use super::ApiResponse;
use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiError;

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub item_id: CartLineId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// GET /cart
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<Json<ApiResponse<Cart>>, ApiError> {
    let cart = state.carts.get_cart(actor.id).await?;
    Ok(Json(ApiResponse::data(cart)))
}

/// POST /cart/add
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn add<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Cart>>, ApiError> {
    let Json(req) = payload?;
    let cart = state
        .carts
        .add_item(
            actor.id,
            AddToCart {
                product_id: req.product_id,
                quantity: req.quantity,
                size: req.size,
                color: req.color,
            },
        )
        .await?;
    Ok(Json(ApiResponse::with_message("Item added to cart", cart)))
}

/// PUT /cart/update
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Cart>>, ApiError> {
    let Json(req) = payload?;
    let cart = state
        .carts
        .update_item(actor.id, req.item_id, req.quantity)
        .await?;
    Ok(Json(ApiResponse::with_message("Cart updated", cart)))
}

/// DELETE /cart/remove
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    payload: Result<Json<RemoveItemRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Cart>>, ApiError> {
    let Json(req) = payload?;
    let cart = state
        .carts
        .remove_item(actor.id, req.product_id, req.size, req.color)
        .await?;
    Ok(Json(ApiResponse::with_message("Item removed from cart", cart)))
}

/// DELETE /cart/clear
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<Json<ApiResponse<Cart>>, ApiError> {
    let cart = state.carts.clear(actor.id).await?;
    Ok(Json(ApiResponse::with_message("Cart cleared", cart)))
}
