//! Correlation IDs tying an inbound request to its backend call and logs.

use uuid::Uuid;

/// Sent to the backend and echoed on the dashboard response.
pub const CORRELATION_HEADER: &str = "x-request-id";

/// Generate a new correlation ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
