//! Embed gateway — library crate shared by the binary and integration tests.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod config;
pub mod embed;
pub mod errors;
pub mod identity;
pub mod middleware;
pub mod powerbi;
pub mod upstream;

use config::Config;
use embed::EmbedInfoService;

/// Shared application state passed to handlers.
pub struct AppState {
    pub embed: EmbedInfoService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let client = upstream::build_client(config.http_timeout)?;
        let embed = EmbedInfoService::new(config, client);
        Ok(Self { embed })
    }
}
