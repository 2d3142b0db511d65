/**
 * registry.rs
 * Named lookup services
 *
 * Services are registered once at startup. The first service registered
 * becomes the default until `set_default` names another one.
 * All services built through a registry share its CacheRegistry, so one
 * `invalidate_caches` call clears every response cache.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::CacheRegistry;
use crate::errors::{LookupError, Result};
use crate::lookup::model::{EntityType, LookupRequest, LookupResponse};
use crate::lookup::service::LookupService;

#[derive(Default)]
pub struct LookupServiceRegistry {
    services: BTreeMap<String, Arc<dyn LookupService>>,
    default_name: Option<String>,
    caches: Arc<CacheRegistry>,
}

impl LookupServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache registry services should register their caches with
    pub fn cache_registry(&self) -> &CacheRegistry {
        &self.caches
    }

    /// Add a service under its own name, replacing any previous one
    pub fn register(&mut self, service: Arc<dyn LookupService>) {
        let name = service.name().to_string();
        tracing::debug!(service = %name, "Registering lookup service");

        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.services.insert(name, service);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn LookupService>> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::ServiceNotFound(name.to_string()))
    }

    pub fn default_service(&self) -> Result<Arc<dyn LookupService>> {
        match &self.default_name {
            Some(name) => self.get(name),
            None => Err(LookupError::ServiceNotFound("<default>".to_string())),
        }
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.services.contains_key(name) {
            return Err(LookupError::ServiceNotFound(name.to_string()));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Registered service names, sorted
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn LookupService>> {
        match name {
            Some(name) => self.get(name),
            None => self.default_service(),
        }
    }

    /// Dispatch to the named service, or the default one
    pub fn lookup(&self, name: Option<&str>, request: &LookupRequest) -> Result<LookupResponse> {
        self.resolve(name)?.lookup(request)
    }

    pub fn available_entity_types(&self, name: Option<&str>) -> Result<Vec<EntityType>> {
        self.resolve(name)?.available_entity_types()
    }

    /// Clear the response cache of every service
    pub fn invalidate_caches(&self) -> usize {
        self.caches.invalidate_all()
    }
}
