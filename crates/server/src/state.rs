use crate::config::ServerConfig;
use crate::error::ServerResult;
use std::sync::Arc;
use watermark_processor::{Transformer, load_transformer};

/// Shared application state
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Immutable transform core shared across requests
    pub transformer: Arc<Transformer>,
}

impl ServerState {
    /// Create new server state, loading the watermark configuration file if
    /// one is configured.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let transformer = load_transformer(config.watermark_config.as_deref())?;
        Ok(Self::with_transformer(config, transformer))
    }

    /// Create server state around an already built transformer.
    pub fn with_transformer(config: ServerConfig, transformer: Transformer) -> Self {
        Self {
            config: Arc::new(config),
            transformer: Arc::new(transformer),
        }
    }
}
