//! # Provider Factory
//!
//! Providers are registered once at startup and looked up by provider type.

use super::ClusterProvider;
use crate::api::ClusterProviderType;
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Default)]
pub struct ProviderFactory {
    providers: BTreeMap<ClusterProviderType, Arc<dyn ClusterProvider>>,
}

impl std::fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its own provider type, replacing any earlier registration
    #[must_use]
    pub fn register(mut self, provider: Arc<dyn ClusterProvider>) -> Self {
        let provider_type = provider.provider_type();
        info!("Registered {} cluster provider", provider_type);
        self.providers.insert(provider_type, provider);
        self
    }

    pub fn get_provider(
        &self,
        provider_type: ClusterProviderType,
    ) -> ServiceResult<Arc<dyn ClusterProvider>> {
        self.providers
            .get(&provider_type)
            .map(Arc::clone)
            .ok_or_else(|| {
                ServiceError::new(
                    ErrorKind::ProviderNotSupported,
                    format!("provider type {provider_type} is not supported"),
                )
            })
    }

    pub fn has_provider(&self, provider_type: ClusterProviderType) -> bool {
        self.providers.contains_key(&provider_type)
    }
}
