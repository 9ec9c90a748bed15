//! crates/testcase_core/src/providers.rs
//!
//! The registry of generation engines and the ranked chain of resolvers that
//! picks one for a request.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::ProviderInfo;
use crate::mock::{MockGenerator, MOCK_PROVIDER_ID};
use crate::ports::TestCaseGenerator;

/// Outcome of a single resolver in the chain.
pub enum Resolution {
    Resolved(Arc<dyn TestCaseGenerator>),
    /// This resolver has no opinion; try the next one.
    Pass,
    /// The request names a provider the system does not know.
    Unknown(String),
}

pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, registry: &ProviderRegistry, requested: Option<&str>) -> Resolution;
}

/// An explicitly requested provider must be registered.
pub struct RequestedProvider;

impl ProviderResolver for RequestedProvider {
    fn resolve(&self, registry: &ProviderRegistry, requested: Option<&str>) -> Resolution {
        match requested {
            Some(id) => match registry.get(id) {
                Some(provider) => Resolution::Resolved(provider),
                None => Resolution::Unknown(id.to_string()),
            },
            None => Resolution::Pass,
        }
    }
}

/// The configured default, when it is registered and available.
pub struct ConfiguredDefault;

impl ProviderResolver for ConfiguredDefault {
    fn resolve(&self, registry: &ProviderRegistry, _requested: Option<&str>) -> Resolution {
        let Some(id) = registry.configured_default.as_deref() else {
            return Resolution::Pass;
        };
        match registry.get(id) {
            Some(provider) if provider.is_available() => Resolution::Resolved(provider),
            _ => {
                debug!(provider = id, "Configured default provider is not available");
                Resolution::Pass
            }
        }
    }
}

/// Always resolves to the deterministic mock engine.
pub struct MockFallback;

impl ProviderResolver for MockFallback {
    fn resolve(&self, registry: &ProviderRegistry, _requested: Option<&str>) -> Resolution {
        Resolution::Resolved(registry.mock.clone())
    }
}

/// The engine picked for one request.
pub struct ResolvedProvider {
    pub engine: Arc<dyn TestCaseGenerator>,
    /// The caller named this engine, so its failures are reported rather than
    /// replaced by the mock.
    pub requested: bool,
}

/// Registered engines in listing order, with the mock always present and last.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TestCaseGenerator>>,
    mock: Arc<dyn TestCaseGenerator>,
    configured_default: Option<String>,
    chain: Vec<Box<dyn ProviderResolver>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            mock: Arc::new(MockGenerator),
            configured_default: None,
            chain: vec![
                Box::new(RequestedProvider),
                Box::new(ConfiguredDefault),
                Box::new(MockFallback),
            ],
        }
    }

    /// Registers an engine. A later registration with the same id replaces the earlier one.
    pub fn register(mut self, provider: Arc<dyn TestCaseGenerator>) -> Self {
        let id = provider.info().id;
        if id == MOCK_PROVIDER_ID {
            self.mock = provider;
            return self;
        }
        self.providers.retain(|p| p.info().id != id);
        self.providers.push(provider);
        self
    }

    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.configured_default = (!id.trim().is_empty()).then_some(id);
        self
    }

    /// Replaces the resolution chain. The mock fallback is still appended at
    /// the end, so resolution can never come back empty-handed.
    pub fn with_chain(mut self, mut chain: Vec<Box<dyn ProviderResolver>>) -> Self {
        chain.push(Box::new(MockFallback));
        self.chain = chain;
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TestCaseGenerator>> {
        if id == MOCK_PROVIDER_ID {
            return Some(self.mock.clone());
        }
        self.providers.iter().find(|p| p.info().id == id).cloned()
    }

    /// The engine of last resort.
    pub fn mock(&self) -> Arc<dyn TestCaseGenerator> {
        self.mock.clone()
    }

    pub fn available(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .chain(std::iter::once(&self.mock))
            .map(|p| p.info())
            .collect()
    }

    /// The id an omitted provider resolves to.
    pub fn default_id(&self) -> String {
        self.resolve_provider(None)
            .map(|resolved| resolved.engine.info().id)
            .unwrap_or_else(|_| MOCK_PROVIDER_ID.to_string())
    }

    /// Walks the chain; blank requests count as omitted.
    pub fn resolve_provider(
        &self,
        requested: Option<&str>,
    ) -> Result<ResolvedProvider, String> {
        let requested = requested.map(str::trim).filter(|id| !id.is_empty());
        let resolved = |engine| ResolvedProvider {
            engine,
            requested: requested.is_some(),
        };
        for resolver in &self.chain {
            match resolver.resolve(self, requested) {
                Resolution::Resolved(provider) => return Ok(resolved(provider)),
                Resolution::Unknown(id) => {
                    warn!(provider = %id, "Unknown provider requested");
                    return Err(id);
                }
                Resolution::Pass => continue,
            }
        }
        Ok(resolved(self.mock.clone()))
    }
}
