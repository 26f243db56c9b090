use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{Cart, Order, OrderStatus, Product, Role, User};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderQuery, Page, Result, StoreError,
    repository::{CartRepository, OrderRepository, ProductRepository, UserRepository},
};

/// PostgreSQL-backed document store.
///
/// Aggregates are stored as JSONB documents. Product stock lives in its own
/// column so it can be changed with a single conditional `UPDATE`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let mut product: Product = serde_json::from_value(row.try_get("document")?)?;
        let stock: i64 = row.try_get("stock")?;
        let stock = u32::try_from(stock).map_err(|_| {
            StoreError::InvalidRecord(format!("product {} has stock {stock}", product.id))
        })?;
        product.stock = stock;
        Ok(product)
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(serde_json::from_value(row.try_get("document")?)?)
    }
}

/// Escapes `LIKE` wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Counts conditional writes whose guard did not match.
fn conditional_miss(operation: &'static str) {
    metrics::counter!("store_conditional_write_misses_total", "operation" => operation)
        .increment(1);
}

fn stock_param(quantity: u32) -> i64 {
    i64::from(quantity)
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT document, stock FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT document, stock FROM products
            WHERE ($1 = FALSE OR is_active)
            ORDER BY created_at DESC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn save_product(&self, product: &Product) -> Result<()> {
        let document = serde_json::to_value(product)?;

        sqlx::query(
            r#"
            INSERT INTO products (id, author_id, is_active, stock, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                author_id = EXCLUDED.author_id,
                is_active = EXCLUDED.is_active,
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.author.as_uuid())
        .bind(product.is_active)
        .bind(stock_param(product.stock))
        .bind(document)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_decrement_stock(&self, id: ProductId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
        )
        .bind(id.as_uuid())
        .bind(stock_param(quantity))
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        if !applied {
            conditional_miss("try_decrement_stock");
            tracing::debug!(product_id = %id, quantity, "conditional stock decrement not applied");
        }
        Ok(applied)
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock = LEAST(stock + $2, 4294967295), updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(stock_param(quantity))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_stock(&self, id: ProductId, stock: u32) -> Result<bool> {
        let result =
            sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(stock_param(stock))
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl CartRepository for PostgresStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT document FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_value(row.try_get("document")?)?)),
            None => Ok(None),
        }
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let document = serde_json::to_value(cart)?;

        sqlx::query(
            r#"
            INSERT INTO carts (user_id, document, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                document = EXCLUDED.document,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(cart.user_id().as_uuid())
        .bind(document)
        .bind(cart.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let document = serde_json::to_value(order)?;
        let address = order.shipping_address();

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, order_status, total_amount_cents,
                                full_name, email, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_number())
        .bind(order.user_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.total_amount().cents())
        .bind(&address.full_name)
        .bind(&address.email)
        .bind(document)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("unique_order_number") {
                    tracing::debug!(order_number = order.order_number(), "order number taken");
                    return StoreError::DuplicateOrderNumber(order.order_number().to_string());
                }
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_order(&self, order: &Order, expected_status: OrderStatus) -> Result<bool> {
        let document = serde_json::to_value(order)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2, document = $3, updated_at = $4
            WHERE id = $1 AND order_status = $5
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(document)
        .bind(order.updated_at())
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        if !applied {
            conditional_miss("update_order");
            tracing::debug!(
                order_id = %order.id(),
                expected = %expected_status,
                "order update lost a status race"
            );
        }
        Ok(applied)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT document FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn query_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let mut filter = String::from(" WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic filter
        if query.status.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND order_status = ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            filter.push_str(&format!(
                " AND (order_number ILIKE ${param_count} OR full_name ILIKE ${param_count} OR email ILIKE ${param_count})"
            ));
        }

        let count_sql = format!("SELECT COUNT(*) FROM orders{filter}");
        let select_sql = format!(
            "SELECT document FROM orders{filter} ORDER BY {} {}, id LIMIT ${} OFFSET ${}",
            query.sort_by.column(),
            query.sort_order.as_sql(),
            param_count + 1,
            param_count + 2,
        );

        let status = query.status.map(|s| s.as_str());
        let pattern = query.search.as_deref().map(like_pattern);

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut select_query = sqlx::query(&select_sql);
        if let Some(status) = status {
            count_query = count_query.bind(status);
            select_query = select_query.bind(status);
        }
        if let Some(pattern) = &pattern {
            count_query = count_query.bind(pattern.clone());
            select_query = select_query.bind(pattern.clone());
        }

        let total = count_query.fetch_one(&self.pool).await?;
        let rows = select_query
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(
            items,
            query.page,
            query.limit,
            u64::try_from(total).unwrap_or(0),
        ))
    }

    async fn delete_order(&self, id: OrderId, expected_status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND order_status = $2")
            .bind(id.as_uuid())
            .bind(expected_status.as_str())
            .execute(&self.pool)
            .await?;

        let applied = result.rows_affected() == 1;
        if !applied {
            conditional_miss("delete_order");
        }
        Ok(applied)
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row.try_get("role")?;
        let role = Role::parse(&role)
            .ok_or_else(|| StoreError::InvalidRecord(format!("unknown role '{role}' for user {id}")))?;

        Ok(Some(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
            email: row.try_get("email")?,
            role,
        }))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, role = EXCLUDED.role
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
