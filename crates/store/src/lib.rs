//! Persistence for the storefront backend.
//!
//! Repository traits are implemented by an in-memory store (tests and local
//! runs) and a PostgreSQL JSONB document store.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OrderQuery, OrderSortField, Page, SortOrder};
pub use repository::{CartRepository, OrderRepository, ProductRepository, Store, UserRepository};
