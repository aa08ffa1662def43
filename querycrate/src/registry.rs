use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{EntityTrait, Select};

use crate::core::fields::resource_name;
use crate::errors::{ConfigError, QueryError};
use crate::params::IndexParams;
use crate::resource::ResourceQuery;

/// Query configurations of every resource, keyed by entity type.
///
/// Populated once at startup, then shared read-only (usually behind an
/// `Arc` in the router state).
#[derive(Default)]
pub struct QueryRegistry {
    resources: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl QueryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the configuration of `E`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlreadyConfigured`] if `E` already has one.
    pub fn configure<E>(&mut self, query: ResourceQuery<E>) -> Result<(), ConfigError>
    where
        E: EntityTrait + Send + Sync,
    {
        let type_id = TypeId::of::<E>();
        if self.resources.contains_key(&type_id) {
            return Err(ConfigError::AlreadyConfigured(resource_name::<E>()));
        }
        tracing::info!(resource = %query.resource(), "registered query configuration");
        self.resources.insert(type_id, Arc::new(query));
        Ok(())
    }

    /// Builder-style [`Self::configure`].
    ///
    /// # Errors
    ///
    /// See [`Self::configure`].
    pub fn with<E>(mut self, query: ResourceQuery<E>) -> Result<Self, ConfigError>
    where
        E: EntityTrait + Send + Sync,
    {
        self.configure(query)?;
        Ok(self)
    }

    #[must_use]
    pub fn get<E>(&self) -> Option<Arc<ResourceQuery<E>>>
    where
        E: EntityTrait + Send + Sync,
    {
        let query = self.resources.get(&TypeId::of::<E>())?;
        Arc::clone(query).downcast::<ResourceQuery<E>>().ok()
    }

    #[must_use]
    pub fn is_configured<E: EntityTrait>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<E>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Filter and sort `select` with the configuration registered for `E`.
    ///
    /// # Errors
    ///
    /// [`QueryError::NotConfigured`] if `E` was never configured, otherwise
    /// whatever [`ResourceQuery::handle_index_request`] returns.
    pub fn handle_index_request<E>(
        &self,
        params: &IndexParams,
        select: Select<E>,
    ) -> Result<Select<E>, QueryError>
    where
        E: EntityTrait + Send + Sync,
    {
        let query = self.get::<E>().ok_or_else(|| {
            tracing::warn!(
                resource = %resource_name::<E>(),
                "index request for unconfigured resource"
            );
            QueryError::NotConfigured(resource_name::<E>())
        })?;
        query.handle_index_request(params, select)
    }
}
