//! In-memory resource client
//!
//! Useful for tests and offline previews. Every call is recorded so tests
//! can assert that no mutating call happened.

use crate::client::{Lookup, ResourceClient};
use crate::error::ProviderError;
use crate::field::Record;
use crate::identity::ResourceIdentity;
use crate::state::ObservedState;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// A recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String),
    Put(String),
    Delete(String),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get(_))
    }
}

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Put,
    Delete,
}

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<ResourceIdentity, Record>,
    calls: Vec<Call>,
    failures: HashMap<Operation, ProviderError>,
}

/// Thread-safe in-memory provider
///
/// Upserts stamp a provider-style `id` and `provisioningState`, the way a
/// real provider adds read-only fields to what was sent.
#[derive(Debug, Default)]
pub struct MemoryClient {
    inner: Mutex<Inner>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing resource
    pub fn with_resource(self, identity: ResourceIdentity, body: Value) -> Self {
        self.insert(identity, body);
        self
    }

    /// Seed an existing resource in place
    pub fn insert(&self, identity: ResourceIdentity, body: Value) {
        let body = ObservedState::from_value(body).into_body();
        self.lock().resources.insert(identity, body);
    }

    /// Make the next call of an operation fail
    pub fn fail_next(&self, operation: Operation, error: ProviderError) {
        self.lock().failures.insert(operation, error);
    }

    /// Stored body for an identity
    pub fn stored(&self, identity: &ResourceIdentity) -> Option<Record> {
        self.lock().resources.get(identity).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All calls made so far
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of create/update/delete calls made so far
    pub fn mutating_calls(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_mutating()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Every write is a single insert or remove, so poisoning is ignored
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Inner {
    fn take_failure(&mut self, operation: Operation) -> Result<(), ProviderError> {
        self.failures.remove(&operation).map_or(Ok(()), Err)
    }
}

impl ResourceClient for MemoryClient {
    fn get(&self, identity: &ResourceIdentity) -> Result<Lookup, ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Get(identity.to_string()));
        inner.take_failure(Operation::Get)?;
        Ok(inner
            .resources
            .get(identity)
            .cloned()
            .map_or(Lookup::NotFound, |body| {
                Lookup::Found(ObservedState::new(body))
            }))
    }

    fn create_or_update(
        &self,
        identity: &ResourceIdentity,
        body: &Record,
    ) -> Result<ObservedState, ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Put(identity.to_string()));
        inner.take_failure(Operation::Put)?;

        let mut stored = body.clone();
        stored
            .entry("id")
            .or_insert_with(|| Value::String(format!("/{identity}")));
        stored.insert(
            "provisioningState".to_string(),
            Value::String("Succeeded".to_string()),
        );
        inner.resources.insert(identity.clone(), stored.clone());
        Ok(ObservedState::new(stored))
    }

    fn delete(&self, identity: &ResourceIdentity) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        inner.calls.push(Call::Delete(identity.to_string()));
        inner.take_failure(Operation::Delete)?;
        inner.resources.remove(identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use serde_json::json;

    fn id(name: &str) -> ResourceIdentity {
        ResourceIdentity::builder("test").segment("name", name).build()
    }

    #[test]
    fn test_get_missing() {
        let client = MemoryClient::new();
        assert_eq!(client.get(&id("a")).unwrap(), Lookup::NotFound);
        assert_eq!(client.calls(), vec![Call::Get("test:a".into())]);
    }

    #[test]
    fn test_upsert_stamps_read_only_fields() {
        let client = MemoryClient::new();
        let body = json!({"sku": "Standard"}).as_object().cloned().unwrap();
        let state = client.create_or_update(&id("a"), &body).unwrap();
        assert_eq!(state.body()["id"], json!("/test:a"));
        assert_eq!(state.body()["provisioningState"], json!("Succeeded"));
        assert!(client.get(&id("a")).unwrap().is_found());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let client = MemoryClient::new().with_resource(id("a"), json!({"x": 1}));
        client.delete(&id("a")).unwrap();
        client.delete(&id("a")).unwrap();
        assert!(client.is_empty());
        assert_eq!(client.mutating_calls(), 2);
    }

    #[test]
    fn test_failure_injection_is_one_shot() {
        let client = MemoryClient::new();
        client.fail_next(
            Operation::Get,
            ProviderError::new(ProviderErrorKind::Transport, "connection reset"),
        );
        assert!(client.get(&id("a")).is_err());
        assert!(client.get(&id("a")).is_ok());
    }
}
