//! Resource client backends
//!
//! Both providers address resources through the catalog: the ARM provider
//! renders request paths from it, the local one uses it to stamp ids.

pub mod arm;
pub mod local;

use anyhow::Result;
use reconcile::{BoxedClient, ProviderError, ProviderErrorKind, ResourceIdentity};

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::{Config, ProviderKind};

pub use arm::ArmProvider;
pub use local::LocalProvider;

/// Build the client for the selected provider
pub fn connect(kind: ProviderKind, config: &Config, catalog: &Catalog) -> Result<BoxedClient> {
    match kind {
        ProviderKind::Arm => {
            let client_config = config.provider.arm.client_config();
            log::info!("Using ARM provider at {}", client_config.endpoint);
            Ok(Box::new(ArmProvider::new(client_config, catalog.clone())))
        }
        ProviderKind::Local => {
            let dir = config.provider.local.store_dir()?;
            log::info!("Using local provider in {}", dir.display());
            Ok(Box::new(LocalProvider::new(dir, catalog.clone())))
        }
    }
}

/// Catalog entry for an identity, as a provider error when unknown
pub(crate) fn entry_for<'a>(
    catalog: &'a Catalog,
    identity: &ResourceIdentity,
) -> Result<&'a CatalogEntry, ProviderError> {
    catalog.get(identity.kind()).ok_or_else(|| {
        ProviderError::new(
            ProviderErrorKind::Other,
            format!("no catalog entry for kind {}", identity.kind()),
        )
    })
}

/// ARM resource path for an identity
pub(crate) fn resource_path(catalog: &Catalog, identity: &ResourceIdentity) -> Result<String, ProviderError> {
    entry_for(catalog, identity)?
        .render_path(identity)
        .map_err(|e| ProviderError::new(ProviderErrorKind::BadRequest, e.to_string()))
}
