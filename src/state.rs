//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! proxy keeps no per-request state; it only holds the external API client,
//! or the configuration error that prevented building one so every route can
//! report it instead of the process refusing to boot.

use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::upstream::UpstreamClient;

/// Clone is required by Axum; the client is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Result<Arc<UpstreamClient>, ConfigError>,
}

impl AppState {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let upstream = config
            .api_url
            .clone()
            .map(|url| Arc::new(UpstreamClient::new(url)));
        Self { upstream }
    }

    /// State whose external API is not configured.
    #[must_use]
    pub fn unconfigured(reason: ConfigError) -> Self {
        Self { upstream: Err(reason) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
