//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{MatchConfig, MatchRegistry, SessionBackend, SessionReporter};
use crate::store::{ArenaApiClient, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub reporter: SessionReporter,
    pub match_registry: Arc<MatchRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // Backend API client and the session endpoints on top of it
        let api = ArenaApiClient::new(&config);
        let sessions: Arc<dyn SessionBackend> = Arc::new(SessionStore::new(api));

        Self::with_backend(config, sessions)
    }

    /// Build around any session backend
    pub fn with_backend(config: Config, backend: Arc<dyn SessionBackend>) -> Self {
        let reporter = SessionReporter::new(backend, config.report_timeout);

        Self {
            config: Arc::new(config),
            reporter,
            match_registry: Arc::new(MatchRegistry::new()),
        }
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig::from_config(&self.config)
    }
}
