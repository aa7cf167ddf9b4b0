//! Azure Resource Manager provider

use armkit::{Client, ClientConfig, ErrorCategory, Transport, UreqTransport};
use reconcile::{
    Lookup, ObservedState, ProviderError, ProviderErrorKind, Record, ResourceClient,
    ResourceIdentity,
};
use serde_json::Value;

use super::{entry_for, resource_path};
use crate::catalog::Catalog;

pub struct ArmProvider<T = UreqTransport> {
    client: Client<T>,
    catalog: Catalog,
}

impl ArmProvider<UreqTransport> {
    pub fn new(config: ClientConfig, catalog: Catalog) -> Self {
        Self::with_client(Client::new(config), catalog)
    }
}

impl<T: Transport> ArmProvider<T> {
    pub fn with_client(client: Client<T>, catalog: Catalog) -> Self {
        Self { client, catalog }
    }

    fn locate(&self, identity: &ResourceIdentity) -> Result<(String, &str), ProviderError> {
        let entry = entry_for(&self.catalog, identity)?;
        let path = resource_path(&self.catalog, identity)?;
        Ok((path, entry.api_version.as_str()))
    }
}

/// Map an ARM error onto the reconciler's provider error
fn provider_error(err: &armkit::Error) -> ProviderError {
    let kind = match err.category() {
        ErrorCategory::NotFound => ProviderErrorKind::NotFound,
        ErrorCategory::Conflict => ProviderErrorKind::Conflict,
        ErrorCategory::Throttled => ProviderErrorKind::Throttled,
        ErrorCategory::Unauthorized => ProviderErrorKind::Unauthorized,
        ErrorCategory::BadRequest => ProviderErrorKind::BadRequest,
        ErrorCategory::Network => ProviderErrorKind::Transport,
        ErrorCategory::Server | ErrorCategory::Other => ProviderErrorKind::Other,
    };
    let mut mapped = ProviderError::new(kind, err.to_string());
    if let Some(status) = err.status() {
        mapped = mapped.with_status(status);
    }
    if let Some(code) = err.code() {
        mapped = mapped.with_code(code);
    }
    log::debug!("{mapped:?}: {}", err.category().advice());
    mapped
}

impl<T: Transport> ResourceClient for ArmProvider<T> {
    fn get(&self, identity: &ResourceIdentity) -> Result<Lookup, ProviderError> {
        let (path, api_version) = self.locate(identity)?;
        match self.client.get(&path, api_version) {
            Ok(Some(value)) => Ok(Lookup::Found(ObservedState::from_value(value))),
            Ok(None) => Ok(Lookup::NotFound),
            Err(err) => Err(provider_error(&err)),
        }
    }

    fn create_or_update(
        &self,
        identity: &ResourceIdentity,
        body: &Record,
    ) -> Result<ObservedState, ProviderError> {
        let (path, api_version) = self.locate(identity)?;
        self.client
            .put(&path, api_version, &Value::Object(body.clone()))
            .map(ObservedState::from_value)
            .map_err(|e| provider_error(&e))
    }

    fn delete(&self, identity: &ResourceIdentity) -> Result<(), ProviderError> {
        let (path, api_version) = self.locate(identity)?;
        self.client
            .delete(&path, api_version)
            .map_err(|e| provider_error(&e))
    }
}
