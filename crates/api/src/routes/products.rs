//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{NewProduct, Product, ProductUpdate};
use store::Store;

use super::{ApiResponse, parse_id};
use crate::AppState;
use crate::auth::Actor;
use crate::error::ApiError;

/// GET /products: active products.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(ApiResponse::data(products)))
}

/// GET /products/{id}
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let product = state.catalog.get_product(product_id).await?;
    Ok(Json(ApiResponse::data(product)))
}

/// POST /products: partners and admins only.
#[tracing::instrument(skip_all, fields(user_id = %actor.id))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let Json(new) = payload?;
    let product = state.catalog.create_product(&actor, new).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Product created", product)),
    ))
}

/// PUT /products/{id}: the authoring partner or an admin. Unknown fields are rejected.
#[tracing::instrument(skip_all, fields(user_id = %actor.id, product_id = %id))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product")?;
    let Json(update) = payload?;
    let product = state
        .catalog
        .update_product(&actor, product_id, update)
        .await?;
    Ok(Json(ApiResponse::with_message("Product updated", product)))
}
