//! Admin order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use common::OrderId;
use domain::{Order, OrderError, OrderStatus};
use fulfillment::{DeleteOutcome, UpdateStatus};
use serde::{Deserialize, Serialize};
use store::{OrderQuery, OrderSortField, Page, SortOrder, Store};

use super::{ApiResponse, optional_json, parse_id};
use crate::AppState;
use crate::auth::AdminActor;
use crate::error::ApiError;

/// Query string of `GET /orders/admin/all`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListOrdersParams {
    fn into_query(self) -> Result<OrderQuery, ApiError> {
        let mut query = OrderQuery::new();
        if let Some(page) = self.page {
            query = query.page(page);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(status) = self.status.filter(|s| !s.trim().is_empty()) {
            let status = OrderStatus::parse(status.trim())
                .ok_or_else(|| OrderError::InvalidStatus(status.clone()))?;
            query = query.status(status);
        }
        if let Some(search) = self.search {
            query = query.search(search);
        }

        let sort_by = match self.sort_by.as_deref() {
            None | Some("") => OrderSortField::default(),
            Some(field) => OrderSortField::parse(field)
                .ok_or_else(|| ApiError::Validation(format!("Invalid sortBy: {field}")))?,
        };
        let sort_order = match self.sort_order.as_deref() {
            None | Some("") => SortOrder::default(),
            Some(order) => SortOrder::parse(order)
                .ok_or_else(|| ApiError::Validation(format!("Invalid sortOrder: {order}")))?,
        };
        Ok(query.sort(sort_by, sort_order))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_orders: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub data: Vec<Order>,
    pub pagination: Pagination,
}

impl From<Page<Order>> for OrderListResponse {
    fn from(page: Page<Order>) -> Self {
        Self {
            success: true,
            pagination: Pagination {
                current_page: page.current_page,
                total_pages: page.total_pages,
                total_orders: page.total_items,
                has_next_page: page.has_next_page,
                has_prev_page: page.has_prev_page,
            },
            data: page.items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOrderRequest {
    #[serde(default)]
    pub hard_delete: bool,
}

/// GET /orders/admin/all: filtered, sorted, paginated listing.
#[tracing::instrument(skip_all, fields(admin = %admin.id))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminActor(admin): AdminActor,
    params: Result<Query<ListOrdersParams>, QueryRejection>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = state.orders.list_orders(&query).await?;
    Ok(Json(page.into()))
}

/// GET /orders/admin/{id}: any order.
#[tracing::instrument(skip_all, fields(admin = %admin.id, order_id = %id))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminActor(admin): AdminActor,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(ApiResponse::data(order)))
}

/// PUT /orders/admin/{id}/status: status change with optional notes and tracking.
#[tracing::instrument(skip_all, fields(admin = %admin.id, order_id = %id))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminActor(admin): AdminActor,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let Json(req) = payload?;
    let status = req
        .status
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Status is required".to_string()))?;

    let order = state
        .orders
        .update_status(UpdateStatus {
            order_id,
            status: status.trim().to_string(),
            notes: req.notes,
            tracking_number: req.tracking_number,
        })
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Order status updated successfully",
        order,
    )))
}

/// DELETE /orders/admin/{id}: soft delete by default, `{"hardDelete": true}` purges.
#[tracing::instrument(skip_all, fields(admin = %admin.id, order_id = %id))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AdminActor(admin): AdminActor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order")?;
    let DeleteOrderRequest { hard_delete } = optional_json(&body)?;

    let response = match state.orders.delete_order(order_id, hard_delete).await? {
        DeleteOutcome::Purged => ApiResponse {
            success: true,
            message: Some("Order permanently deleted".to_string()),
            data: None,
        },
        DeleteOutcome::SoftDeleted(order) => {
            ApiResponse::with_message("Order cancelled and marked as deleted", order)
        }
    };
    Ok(Json(response))
}
