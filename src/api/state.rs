use std::sync::Arc;

use crate::calculate::RankingEngine;
use crate::config::{AppConfig, ConfigError};
use crate::live::{FeedHandle, LiveFeed};
use crate::storage::PlayerStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: RankingEngine,
    pub store: Arc<dyn PlayerStore>,
    pub feed: Arc<FeedHandle>,
    pub admin_token: Option<Arc<str>>,
    pub cors_origin: String,
}

impl AppState {
    /// Build the catalog from `config` and start the live feed over `store`.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn PlayerStore>,
    ) -> Result<Self, ConfigError> {
        let engine = RankingEngine::new(Arc::new(config.catalog()?));
        let feed = LiveFeed::new(Arc::clone(&store), engine.clone(), config.poll_interval()).spawn();

        Ok(Self {
            engine,
            store,
            feed: Arc::new(feed),
            admin_token: config
                .admin
                .token
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(Arc::from),
            cors_origin: config.server.cors_origin.clone(),
        })
    }
}
