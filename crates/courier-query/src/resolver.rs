//! Validated query resolution, generic over the searchable entity kind.

use std::sync::Arc;

use tracing::debug;

use courier_core::Result;

use crate::params::SearchParameters;
use crate::store::EntityStore;

/// Resolves searches against one store.
///
/// A pure read: no registry or reconciler state is touched, and any number
/// of resolutions may run concurrently with ongoing reconciliation.
pub struct SearchResolver<S> {
    store: Arc<S>,
}

impl<S> SearchResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate `parameters`, then query the store.
    ///
    /// Invariant violations fail with
    /// [`CourierError::Validation`](courier_core::CourierError::Validation)
    /// before the store sees the query.
    pub async fn resolve<T>(&self, parameters: &SearchParameters) -> Result<Vec<T>>
    where
        S: EntityStore<T>,
    {
        parameters.validate()?;
        let results = self.store.query(parameters).await?;
        debug!(results = results.len(), "search resolved");
        Ok(results)
    }
}
