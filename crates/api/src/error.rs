//! API error types with HTTP response mapping.
//!
//! Every error renders as
//! `{"success": false, "error": {"kind": ..., "message": ..., "debug": ...}}`.
//! `debug` is only filled in for internal errors.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CartError, OrderError, StockError};
use fulfillment::FulfillmentError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input.
    Validation(String),
    /// The caller could not be identified.
    Unauthorized(String),
    /// The caller's role does not permit the operation.
    AccessDenied(String),
    /// Resource not found.
    NotFound(String),
    /// Service-layer failure.
    Fulfillment(FulfillmentError),
    /// Internal server error.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<String>,
}

impl ApiError {
    /// Status code, stable kind and client message for this error.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "Validation", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg.clone()),
            ApiError::AccessDenied(msg) => (StatusCode::FORBIDDEN, "AccessDenied", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            ApiError::Fulfillment(err) => fulfillment_error_parts(err),
            ApiError::Internal(_) => internal(),
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal",
        "Internal server error".to_string(),
    )
}

fn fulfillment_error_parts(err: &FulfillmentError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        FulfillmentError::EmptyCart => (StatusCode::BAD_REQUEST, "EmptyCart", message),
        FulfillmentError::CartNotFound(_)
        | FulfillmentError::OrderNotFound(_)
        | FulfillmentError::ProductNotFound(_)
        | FulfillmentError::Stock(StockError::NotFound { .. })
        | FulfillmentError::Cart(CartError::LineNotFound(_)) => {
            (StatusCode::NOT_FOUND, "NotFound", message)
        }
        FulfillmentError::Stock(_) => (StatusCode::BAD_REQUEST, "Stock", message),
        FulfillmentError::Order(order_err) => match order_err {
            OrderError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "InvalidStatus", message),
            OrderError::InvalidTransition { .. } => {
                (StatusCode::BAD_REQUEST, "InvalidTransition", message)
            }
            OrderError::Forbidden(_) => (StatusCode::BAD_REQUEST, "Forbidden", message),
            OrderError::NoItems | OrderError::InvalidAddress { .. } => {
                (StatusCode::BAD_REQUEST, "Validation", message)
            }
        },
        FulfillmentError::Cart(CartError::InvalidQuantity | CartError::QuantityTooLarge)
        | FulfillmentError::Product(_) => {
            (StatusCode::BAD_REQUEST, "Validation", message)
        }
        FulfillmentError::AccessDenied(_) => (StatusCode::FORBIDDEN, "AccessDenied", message),
        FulfillmentError::Store(_) => internal(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        metrics::counter!("api_errors_total", "kind" => kind).increment(1);
        let debug = match &self {
            ApiError::Internal(detail) => Some(detail.clone()),
            ApiError::Fulfillment(FulfillmentError::Store(err)) => Some(err.to_string()),
            _ => None,
        };

        if status.is_server_error() {
            let debug_detail = &debug;
            tracing::error!(error = ?debug_detail, "internal server error");
        } else {
            tracing::debug!(kind, %message, "request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                kind,
                message,
                debug,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Fulfillment(err.into())
    }
}

impl From<store::StoreError> for ApiError {
    fn from(err: store::StoreError) -> Self {
        ApiError::Fulfillment(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
