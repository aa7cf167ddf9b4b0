//! Resource client adapter - the boundary to the provider
//!
//! A [`ResourceClient`] wraps one provider's get/upsert/delete calls behind a
//! uniform interface so the reconciler never depends on a specific SDK or
//! REST API. Retries and long-running-operation polling, if any, live behind
//! this trait.

use crate::error::ProviderError;
use crate::field::Record;
use crate::identity::ResourceIdentity;
use crate::state::ObservedState;

/// Outcome of a read
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(ObservedState),
    NotFound,
}

impl Lookup {
    pub fn into_option(self) -> Option<ObservedState> {
        match self {
            Self::Found(state) => Some(state),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Provider operations for one or more resource kinds
///
/// Implementations must be idempotent:
/// - `get` returns [`Lookup::NotFound`] for a missing resource and only
///   errors on genuine transport or auth failures
/// - `create_or_update` may be repeated with the same body
/// - `delete` succeeds when the resource is already gone
pub trait ResourceClient: Send + Sync {
    /// Read the current state of a resource
    fn get(&self, identity: &ResourceIdentity) -> Result<Lookup, ProviderError>;

    /// Create or replace a resource, blocking until the provider is done
    fn create_or_update(
        &self,
        identity: &ResourceIdentity,
        body: &Record,
    ) -> Result<ObservedState, ProviderError>;

    /// Delete a resource
    fn delete(&self, identity: &ResourceIdentity) -> Result<(), ProviderError>;
}

impl<C: ResourceClient + ?Sized> ResourceClient for &C {
    fn get(&self, identity: &ResourceIdentity) -> Result<Lookup, ProviderError> {
        (**self).get(identity)
    }

    fn create_or_update(
        &self,
        identity: &ResourceIdentity,
        body: &Record,
    ) -> Result<ObservedState, ProviderError> {
        (**self).create_or_update(identity, body)
    }

    fn delete(&self, identity: &ResourceIdentity) -> Result<(), ProviderError> {
        (**self).delete(identity)
    }
}

impl<C: ResourceClient + ?Sized> ResourceClient for Box<C> {
    fn get(&self, identity: &ResourceIdentity) -> Result<Lookup, ProviderError> {
        (**self).get(identity)
    }

    fn create_or_update(
        &self,
        identity: &ResourceIdentity,
        body: &Record,
    ) -> Result<ObservedState, ProviderError> {
        (**self).create_or_update(identity, body)
    }

    fn delete(&self, identity: &ResourceIdentity) -> Result<(), ProviderError> {
        (**self).delete(identity)
    }
}

/// A boxed client for type-erased storage
pub type BoxedClient = Box<dyn ResourceClient>;
