//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and how it is assembled from the
//! configuration and a set of storage adapters.

use crate::adapters::{CsvRenderer, FileExtractor, OpenAiCompatibleGenerator, SpreadsheetRenderer};
use crate::config::Config;
use std::sync::Arc;
use testcase_core::ports::{RecordStore, TokenStore, UserStore};
use testcase_core::{ExportGateway, GenerationOrchestrator, ProviderRegistry, SessionManager};
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<SessionManager>,
    pub records: Arc<dyn RecordStore>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub exports: Arc<ExportGateway>,
}

impl AppState {
    /// Wires the core services on top of the given stores, registering every
    /// provider the configuration has a key for.
    pub fn build(
        config: Arc<Config>,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let mut registry = ProviderRegistry::new();
        for settings in &config.providers {
            info!(provider = %settings.id, model = %settings.model, "Registering AI provider");
            registry = registry.register(Arc::new(OpenAiCompatibleGenerator::from_settings(
                settings,
            )));
        }
        let registry = registry.with_default(config.default_provider.clone());
        Self::with_providers(config, users, tokens, records, registry)
    }

    /// Like `build`, but with an explicit provider registry.
    pub fn with_providers(
        config: Arc<Config>,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        records: Arc<dyn RecordStore>,
        providers: ProviderRegistry,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(tokens, config.token_ttl));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            sessions.clone(),
            Arc::new(FileExtractor),
            Arc::new(providers),
            records.clone(),
            config.generation_timeout,
        ));
        let exports = Arc::new(
            ExportGateway::new(records.clone())
                .with_renderer(Arc::new(SpreadsheetRenderer))
                .with_renderer(Arc::new(CsvRenderer)),
        );

        Self {
            config,
            users,
            sessions,
            records,
            orchestrator,
            exports,
        }
    }
}
