//! Watermark Server - HTTP front end for the watermark processor
//!
//! This crate exposes the transform core over HTTP. It supports:
//!
//! - **Processing**: multipart upload in, watermarked JPEG attachment out
//! - **Health**: a fixed liveness body for load balancers and containers
//!
//! # Features
//!
//! - **Middleware**: CORS, request ID tracking, structured logging, timeouts
//! - **Configuration**: Environment variable and file-based configuration
//! - **Error Handling**: JSON error bodies with stable error codes
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `POST /process` - Watermark an image (`file` field, optional `watermark` text)
//!
//! Errors are returned as `{"error": {"code": "...", "message": "..."}}`.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
