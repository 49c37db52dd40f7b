pub mod api;
pub mod models;
pub mod social;

/// Milliseconds since the Unix epoch, the timestamp unit of every persisted record.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
