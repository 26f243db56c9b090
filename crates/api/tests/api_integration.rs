//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::UserId;
use domain::{Role, User};
use fulfillment::{InMemoryNotifier, LifecycleConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{InMemoryStore, UserRepository};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    customer: User,
    partner: User,
    admin: User,
}

impl TestApp {
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let customer = User::new(UserId::new(), "asha@example.com", Role::Customer);
        let partner = User::new(UserId::new(), "seller@example.com", Role::Partner);
        let admin = User::bootstrap_admin(UserId::new(), "root@example.com");
        for user in [&customer, &partner, &admin] {
            store.upsert_user(user).await.unwrap();
        }

        let state = Arc::new(api::AppState::new(
            store,
            Arc::new(InMemoryNotifier::new()),
            LifecycleConfig::default(),
        ));
        let app = api::create_app(state, get_metrics_handle(), Duration::from_secs(5));

        Self {
            app,
            customer,
            partner,
            admin,
        }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Lists a product as the partner and returns its id.
    async fn listed_product(&self, price: f64, stock: u32) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/products",
                Some(&self.partner),
                Some(json!({
                    "name": "Desk Lamp",
                    "description": "Adjustable LED desk lamp with dimmer",
                    "brand": "Lumen",
                    "category": "Electronics",
                    "gender": "Unisex",
                    "price": price,
                    "stock": stock,
                    "images": ["lamp.png"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        json["data"]["id"].as_str().unwrap().to_string()
    }

    async fn add_to_cart(&self, product_id: &str, quantity: u32) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/cart/add",
            Some(&self.customer),
            Some(json!({ "productId": product_id, "quantity": quantity })),
        )
        .await
    }

    async fn checkout(&self) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/orders/create",
            Some(&self.customer),
            Some(json!({
                "shippingAddress": {
                    "fullName": "Asha Rao",
                    "phone": "9999999999",
                    "email": "asha@example.com",
                    "addressLine1": "12 MG Road",
                    "city": "Bengaluru",
                    "state": "KA",
                    "pincode": "560001"
                },
                "paymentMethod": "COD",
                "orderNotes": "Leave at the door"
            })),
        )
        .await
    }

    /// Places an order for `quantity` units and returns (order id, product id).
    async fn placed_order(&self, price: f64, stock: u32, quantity: u32) -> (String, String) {
        let product_id = self.listed_product(price, stock).await;
        let (status, _) = self.add_to_cart(&product_id, quantity).await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = self.checkout().await;
        assert_eq!(status, StatusCode::CREATED);
        (json["data"]["id"].as_str().unwrap().to_string(), product_id)
    }

    async fn stock_of(&self, product_id: &str) -> u64 {
        let (_, json) = self
            .send("GET", &format!("/products/{product_id}"), None, None)
            .await;
        json["data"]["stock"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new().await;
    let (status, json) = t.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new().await;
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_identity_is_required() {
    let t = TestApp::new().await;

    let (status, json) = t.send("GET", "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "Unauthorized");

    let stranger = User::new(UserId::new(), "nobody@example.com", Role::Customer);
    let (status, _) = t.send("GET", "/orders", Some(&stranger), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let t = TestApp::new().await;
    let (status, json) = t
        .send("GET", "/orders/admin/all", Some(&t.customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["kind"], "AccessDenied");
}

#[tokio::test]
async fn test_checkout_flow() {
    let t = TestApp::new().await;
    let product_id = t.listed_product(100.0, 5).await;

    let (status, json) = t.add_to_cart(&product_id, 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["totalItems"], 2);
    assert_eq!(json["data"]["totalPrice"].as_f64(), Some(200.0));

    let (status, json) = t.checkout().await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    let order = &json["data"];
    assert_eq!(order["orderStatus"], "Processing");
    assert_eq!(order["subtotal"].as_f64(), Some(200.0));
    assert_eq!(order["tax"].as_f64(), Some(36.0));
    assert_eq!(order["totalAmount"].as_f64(), Some(236.0));
    assert_eq!(order["shippingAddress"]["country"], "India");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD"));
    assert_eq!(t.stock_of(&product_id).await, 3);

    let (_, cart) = t.send("GET", "/cart", Some(&t.customer), None).await;
    assert_eq!(cart["data"]["totalItems"], 0);

    let (status, json) = t.send("GET", "/orders", Some(&t.customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_quantity_overflow_is_rejected() {
    let t = TestApp::new().await;
    let product_id = t.listed_product(10.0, 5).await;

    let (status, _) = t.add_to_cart(&product_id, 1).await;
    assert_eq!(status, StatusCode::OK);
    let (status, json) = t.add_to_cart(&product_id, u32::MAX).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Stock");

    let (status, json) = t.send("GET", "/cart", Some(&t.customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["items"][0]["quantity"], 1);
    assert_eq!(json["data"]["totalItems"], 1);
}

#[tokio::test]
async fn test_checkout_errors() {
    let t = TestApp::new().await;

    let (status, json) = t.checkout().await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "EmptyCart");

    let product_id = t.listed_product(10.0, 1).await;
    let (status, json) = t.add_to_cart(&product_id, 2).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Stock");

    let missing = UserId::new().to_string();
    let (status, json) = t.add_to_cart(&missing, 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["kind"], "NotFound");

    let (status, json) = t
        .send("GET", "/orders/not-a-uuid", Some(&t.customer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Validation");
}

#[tokio::test]
async fn test_admin_status_updates() {
    let t = TestApp::new().await;
    let (order_id, _) = t.placed_order(50.0, 5, 1).await;
    let uri = format!("/orders/admin/{order_id}/status");

    let (status, json) = t
        .send("PUT", &uri, Some(&t.admin), Some(json!({ "notes": "hi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Validation");

    let (status, json) = t
        .send("PUT", &uri, Some(&t.admin), Some(json!({ "status": "Lost" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidStatus");

    let (status, json) = t
        .send(
            "PUT",
            &uri,
            Some(&t.admin),
            Some(json!({ "status": "Shipped", "trackingNumber": "TRK-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["orderStatus"], "Shipped");
    assert_eq!(json["data"]["trackingNumber"], "TRK-1");

    let (status, json) = t
        .send(
            "PUT",
            &format!("/orders/{order_id}/cancel"),
            Some(&t.customer),
            Some(json!({ "reason": "too slow" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "InvalidTransition");

    let (status, json) = t
        .send(
            "DELETE",
            &format!("/orders/admin/{order_id}"),
            Some(&t.admin),
            Some(json!({ "hardDelete": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Forbidden");
}

#[tokio::test]
async fn test_customer_cancel_releases_stock() {
    let t = TestApp::new().await;
    let (order_id, product_id) = t.placed_order(20.0, 10, 3).await;
    assert_eq!(t.stock_of(&product_id).await, 7);

    let (status, json) = t
        .send(
            "PUT",
            &format!("/orders/{order_id}/cancel"),
            Some(&t.customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["orderStatus"], "Cancelled");
    assert_eq!(json["data"]["cancellationReason"], "Cancelled by user");
    assert_eq!(t.stock_of(&product_id).await, 10);

    let (status, _) = t
        .send(
            "PUT",
            &format!("/orders/{order_id}/cancel"),
            Some(&t.customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.stock_of(&product_id).await, 10);
}

#[tokio::test]
async fn test_admin_deletes() {
    let t = TestApp::new().await;

    let (soft_id, soft_product) = t.placed_order(20.0, 10, 3).await;
    let (status, json) = t
        .send("DELETE", &format!("/orders/admin/{soft_id}"), Some(&t.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["orderStatus"], "Cancelled");
    assert_eq!(t.stock_of(&soft_product).await, 10);

    let (hard_id, hard_product) = t.placed_order(20.0, 10, 3).await;
    let (status, json) = t
        .send(
            "DELETE",
            &format!("/orders/admin/{hard_id}"),
            Some(&t.admin),
            Some(json!({ "hardDelete": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(t.stock_of(&hard_product).await, 10);

    let (status, _) = t
        .send("GET", &format!("/orders/admin/{hard_id}"), Some(&t.admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_listing_pages_and_sorts() {
    let t = TestApp::new().await;
    t.placed_order(10.0, 5, 1).await;
    t.placed_order(30.0, 5, 1).await;
    t.placed_order(20.0, 5, 1).await;

    let (status, json) = t
        .send(
            "GET",
            "/orders/admin/all?limit=2&sortBy=totalAmount&sortOrder=asc",
            Some(&t.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["subtotal"].as_f64(), Some(10.0));
    assert_eq!(data[1]["subtotal"].as_f64(), Some(20.0));
    assert_eq!(json["pagination"]["totalOrders"], 3);
    assert_eq!(json["pagination"]["totalPages"], 2);
    assert_eq!(json["pagination"]["hasNextPage"], true);
    assert_eq!(json["pagination"]["hasPrevPage"], false);

    let (status, json) = t
        .send(
            "GET",
            "/orders/admin/all?search=ASHA&status=Processing&page=2&limit=2",
            Some(&t.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["pagination"]["currentPage"], 2);

    let (status, json) = t
        .send("GET", "/orders/admin/all?sortBy=price", Some(&t.admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Validation");
}

#[tokio::test]
async fn test_other_customers_orders_are_hidden() {
    let t = TestApp::new().await;
    let (order_id, _) = t.placed_order(20.0, 10, 1).await;

    let (status, _) = t
        .send("GET", &format!("/orders/{order_id}"), Some(&t.partner), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = t
        .send("GET", &format!("/orders/{order_id}"), Some(&t.customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["orderNotes"], "Leave at the door");
}

#[tokio::test]
async fn test_product_writes() {
    let t = TestApp::new().await;
    let product_id = t.listed_product(40.0, 4).await;

    let (status, json) = t
        .send(
            "POST",
            "/products",
            Some(&t.customer),
            Some(json!({
                "name": "Mug",
                "description": "Stoneware mug that holds 350 ml",
                "brand": "Clay",
                "category": "Accessories",
                "gender": "Unisex",
                "price": 5.5,
                "stock": 3,
                "images": ["mug.png"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["kind"], "AccessDenied");

    let uri = format!("/products/{product_id}");
    let (status, json) = t
        .send("PUT", &uri, Some(&t.partner), Some(json!({ "author": "me" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "Validation");

    let (status, json) = t
        .send(
            "PUT",
            &uri,
            Some(&t.admin),
            Some(json!({ "stock": 9, "discount": 25 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["stock"], 9);
    assert_eq!(json["data"]["discount"], 25);
}
