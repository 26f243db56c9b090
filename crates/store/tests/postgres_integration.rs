//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{ProductId, UserId};
use domain::{
    Cart, Category, Gender, Money, NewProduct, Order, OrderLine, OrderStatus, PaymentMethod,
    PlaceOrder, Product, Role, ShippingAddress, User,
};
use sqlx::PgPool;
use store::{
    CartRepository, OrderQuery, OrderRepository, OrderSortField, PostgresStore,
    ProductRepository, SortOrder, StoreError, UserRepository,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_commerce_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE users, products, carts, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn sneaker(stock: u32) -> Product {
    Product::create(
        NewProduct {
            name: "Trail Runner".to_string(),
            description: "Lightweight trail running shoe with grip sole".to_string(),
            brand: "Stride".to_string(),
            category: Category::Footwear,
            gender: Gender::Male,
            price: Money::from_cents(2_499_00),
            discount: 10,
            sizes: vec!["8".to_string(), "9".to_string()],
            colors: vec!["Grey".to_string()],
            stock,
            images: vec!["runner.png".to_string()],
            is_active: true,
        },
        UserId::new(),
        Utc::now(),
    )
    .unwrap()
}

fn order_for(user_id: UserId, full_name: &str, price_major: i64, age_minutes: i64) -> Order {
    Order::place(
        PlaceOrder {
            user_id,
            lines: vec![OrderLine {
                product_id: ProductId::new(),
                name: "Trail Runner".to_string(),
                quantity: 1,
                size: Some("9".to_string()),
                color: None,
                price: Money::from_major(price_major),
                image: Some("runner.png".to_string()),
            }],
            shipping_address: ShippingAddress {
                full_name: full_name.to_string(),
                phone: "9111111111".to_string(),
                email: format!("{}@mail.test", full_name.to_lowercase().replace(' ', ".")),
                address_line1: "22 Residency Road".to_string(),
                address_line2: None,
                city: "Bengaluru".to_string(),
                state: "KA".to_string(),
                pincode: "560025".to_string(),
                country: "India".to_string(),
            },
            payment_method: PaymentMethod::Upi,
            notes: None,
        },
        Utc::now() - Duration::minutes(age_minutes),
    )
    .unwrap()
}

#[tokio::test]
async fn product_roundtrip_and_stock_column() {
    let store = get_test_store().await;
    let product = sneaker(4);
    store.save_product(&product).await.unwrap();

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded, product);
    assert_eq!(loaded.unit_price(), Money::from_cents(2_249_10));

    assert!(store.try_decrement_stock(product.id, 3).await.unwrap());
    assert!(!store.try_decrement_stock(product.id, 2).await.unwrap());
    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, 1);

    assert!(store.increment_stock(product.id, 3).await.unwrap());
    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, 4);
}

#[tokio::test]
async fn resaving_product_keeps_stored_stock() {
    let store = get_test_store().await;
    let mut product = sneaker(5);
    store.save_product(&product).await.unwrap();

    // A decrement lands after the copy below was read.
    assert!(store.try_decrement_stock(product.id, 3).await.unwrap());
    product.name = "Trail Runner II".to_string();
    store.save_product(&product).await.unwrap();

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Trail Runner II");
    assert_eq!(loaded.stock, 2);

    assert!(store.set_stock(product.id, 9).await.unwrap());
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 9);
    assert!(!store.set_stock(ProductId::new(), 1).await.unwrap());
}

#[tokio::test]
async fn stock_beyond_i32_range_is_stored_exactly() {
    let store = get_test_store().await;
    let product = sneaker(u32::MAX);
    store.save_product(&product).await.unwrap();

    let big = u32::MAX - 7;
    assert!(store.try_decrement_stock(product.id, big).await.unwrap());
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 7);

    assert!(store.increment_stock(product.id, u32::MAX).await.unwrap());
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().stock,
        u32::MAX
    );
}

#[tokio::test]
async fn concurrent_decrements_never_oversell() {
    let store = get_test_store().await;
    let product = sneaker(5);
    store.save_product(&product).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.try_decrement_stock(product.id, 3).await.unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, 2);
}

#[tokio::test]
async fn inactive_products_hidden_from_active_listing() {
    let store = get_test_store().await;
    let active = sneaker(1);
    let mut inactive = sneaker(1);
    inactive.is_active = false;
    store.save_product(&active).await.unwrap();
    store.save_product(&inactive).await.unwrap();

    assert_eq!(store.list_products(true).await.unwrap().len(), 1);
    assert_eq!(store.list_products(false).await.unwrap().len(), 2);
}

#[tokio::test]
async fn cart_upsert() {
    let store = get_test_store().await;
    let user = UserId::new();
    assert!(store.get_cart(user).await.unwrap().is_none());

    let mut draft = Cart::new(user).edit();
    draft
        .add(ProductId::new(), 2, Some("9".to_string()), None, Money::from_major(75))
        .unwrap();
    let cart = draft.commit();
    store.save_cart(&cart).await.unwrap();

    let mut draft = cart.edit();
    draft.clear();
    let cleared = draft.commit();
    store.save_cart(&cleared).await.unwrap();

    let loaded = store.get_cart(user).await.unwrap().unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.total_price(), Money::zero());
}

#[tokio::test]
async fn order_insert_update_delete() {
    let store = get_test_store().await;
    let user = UserId::new();
    let mut order = order_for(user, "Kavya Iyer", 100, 0);
    store.insert_order(&order).await.unwrap();

    let duplicate = store.insert_order(&order).await;
    assert!(duplicate.is_err());

    let mut stale = order.clone();
    order
        .update_status(
            OrderStatus::Shipped,
            Some("left warehouse".to_string()),
            Some("TRK-99".to_string()),
            Utc::now(),
        )
        .unwrap();
    assert!(store.update_order(&order, OrderStatus::Processing).await.unwrap());

    // A writer holding the pre-shipment copy can no longer overwrite it.
    stale.cancel(None, Utc::now()).unwrap();
    assert!(!store.update_order(&stale, OrderStatus::Processing).await.unwrap());

    let loaded = store.get_order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.status(), OrderStatus::Shipped);
    assert_eq!(loaded.tracking_number(), Some("TRK-99"));
    assert_eq!(loaded.total_amount(), Money::from_major(118));

    assert!(!store.delete_order(order.id(), OrderStatus::Processing).await.unwrap());
    assert!(store.delete_order(order.id(), OrderStatus::Shipped).await.unwrap());
    assert!(!store.delete_order(order.id(), OrderStatus::Shipped).await.unwrap());
    assert!(store.get_order(order.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_order_number_is_reported() {
    let store = get_test_store().await;
    let first = order_for(UserId::new(), "Arjun Das", 10, 0);
    store.insert_order(&first).await.unwrap();

    let mut json = serde_json::to_value(order_for(UserId::new(), "Sara Ali", 10, 0)).unwrap();
    json["orderNumber"] = serde_json::Value::String(first.order_number().to_string());
    let clash: Order = serde_json::from_value(json).unwrap();

    let result = store.insert_order(&clash).await;
    assert!(matches!(result, Err(StoreError::DuplicateOrderNumber(_))));
}

#[tokio::test]
async fn admin_query_filters_sorts_and_pages() {
    let store = get_test_store().await;
    let names = ["Neha Singh", "Rahul Jain", "Nehal Shah", "Vikram Rao"];
    for (i, name) in names.iter().enumerate() {
        let mut order = order_for(UserId::new(), name, (i as i64 + 1) * 50, i as i64);
        if i == 3 {
            order.cancel(None, Utc::now()).unwrap();
        }
        store.insert_order(&order).await.unwrap();
    }

    let page = store
        .query_orders(&OrderQuery::new().search("neha"))
        .await
        .unwrap();
    assert_eq!(page.total_items, 2);

    let page = store
        .query_orders(&OrderQuery::new().search("100%"))
        .await
        .unwrap();
    assert_eq!(page.total_items, 0);

    let page = store
        .query_orders(&OrderQuery::new().status(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].shipping_address().full_name, "Vikram Rao");

    let page = store
        .query_orders(
            &OrderQuery::new()
                .sort(OrderSortField::TotalAmount, SortOrder::Desc)
                .limit(3),
        )
        .await
        .unwrap();
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next_page);
    assert_eq!(page.items[0].shipping_address().full_name, "Vikram Rao");

    // Default sort is newest first.
    let page = store.query_orders(&OrderQuery::new()).await.unwrap();
    assert_eq!(page.items[0].shipping_address().full_name, "Neha Singh");
}

#[tokio::test]
async fn user_upsert() {
    let store = get_test_store().await;
    let id = UserId::new();
    store
        .upsert_user(&User::new(id, "seller@mail.test", Role::Partner))
        .await
        .unwrap();
    store
        .upsert_user(&User::new(id, "seller@mail.test", Role::Admin))
        .await
        .unwrap();

    let user = store.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Admin);
    assert!(store.get_user(UserId::new()).await.unwrap().is_none());
}
