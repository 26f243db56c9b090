//! HTTP API server for the storefront order backend.
//!
//! Provides REST endpoints for carts, the catalog and the order lifecycle,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post, put};
use fulfillment::{
    CartService, CatalogService, LifecycleConfig, OrderLifecycleManager, OrderNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub orders: OrderLifecycleManager<S>,
    pub carts: CartService<S>,
    pub catalog: CatalogService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, notifier: Arc<dyn OrderNotifier>, lifecycle: LifecycleConfig) -> Self {
        Self {
            orders: OrderLifecycleManager::new(store.clone(), notifier, lifecycle),
            carts: CartService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            store,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    request_timeout: Duration,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Customer orders
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/create", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        // Admin orders
        .route("/orders/admin/all", get(routes::admin::list::<S>))
        .route(
            "/orders/admin/{id}",
            get(routes::admin::get::<S>).delete(routes::admin::delete::<S>),
        )
        .route(
            "/orders/admin/{id}/status",
            put(routes::admin::update_status::<S>),
        )
        // Cart
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart/add", post(routes::cart::add::<S>))
        .route("/cart/update", put(routes::cart::update::<S>))
        .route("/cart/remove", delete(routes::cart::remove::<S>))
        .route("/cart/clear", delete(routes::cart::clear::<S>))
        // Catalog
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>).put(routes::products::update::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
