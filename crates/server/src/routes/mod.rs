//! API route handlers
//!
//! - `health`: liveness probe
//! - `process`: multipart upload in, watermarked JPEG out

pub mod health;
pub mod process;

use crate::error::ServerError;

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
