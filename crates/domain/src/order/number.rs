//! Human-readable order numbers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds `ORD<epoch millis><0-999>`.
///
/// This is a correlation id for people and emails; uniqueness is enforced by
/// the store, not relied upon for idempotency.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().as_u128() % 1000;
    format!("ORD{}{}", now.timestamp_millis(), suffix)
}
