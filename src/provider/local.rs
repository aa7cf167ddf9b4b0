//! Local provider: one JSON document per resource
//!
//! Documents live under `<dir>/<kind>/<segment>/.../<name>.json`. Upserts
//! stamp what a real provider would add: `id`, `name`,
//! `properties.provisioningState` and `systemData.createdAt/updatedAt`.

use chrono::Utc;
use reconcile::{
    Lookup, ObservedState, ProviderError, ProviderErrorKind, Record, ResourceClient,
    ResourceIdentity,
};
use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::resource_path;
use crate::catalog::Catalog;

pub struct LocalProvider {
    root: PathBuf,
    catalog: Catalog,
    /// Serializes read-modify-write of documents
    write_lock: Mutex<()>,
}

impl LocalProvider {
    pub fn new(root: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            root: root.into(),
            catalog,
            write_lock: Mutex::new(()),
        }
    }

    /// Document path for an identity
    pub fn document_path(&self, identity: &ResourceIdentity) -> PathBuf {
        let mut path = self.root.join(encode_segment(identity.kind()));
        let segments = identity.segments();
        if let Some(((_, name), parents)) = segments.split_last() {
            for (_, value) in parents {
                path.push(encode_segment(value));
            }
            path.push(format!("{}.json", encode_segment(name)));
        }
        path
    }

    fn read(&self, identity: &ResourceIdentity) -> Result<Option<Record>, ProviderError> {
        let path = self.document_path(identity);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, &e)),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(body)) => Ok(Some(body)),
            Ok(_) => Err(ProviderError::new(
                ProviderErrorKind::Other,
                format!("{} does not hold a JSON object", path.display()),
            )),
            Err(e) => Err(ProviderError::new(
                ProviderErrorKind::Other,
                format!("invalid JSON in {}: {e}", path.display()),
            )),
        }
    }

    fn stamp(&self, identity: &ResourceIdentity, body: &mut Record, previous: Option<&Record>) {
        let now = Utc::now().to_rfc3339();
        let id = resource_path(&self.catalog, identity).unwrap_or_else(|_| format!("/{identity}"));
        body.insert("id".to_string(), Value::String(id));
        body.insert("name".to_string(), Value::String(identity.name().to_string()));

        match body
            .entry("properties")
            .or_insert_with(|| Value::Object(Record::new()))
        {
            Value::Object(properties) => {
                properties.insert("provisioningState".to_string(), json!("Succeeded"));
            }
            _ => log::warn!("{identity}: properties is not an object; provisioningState not stamped"),
        }

        let created_at = previous
            .and_then(|p| p.get("systemData"))
            .and_then(|s| s.get("createdAt"))
            .cloned()
            .unwrap_or_else(|| Value::String(now.clone()));
        body.insert(
            "systemData".to_string(),
            json!({"createdAt": created_at, "updatedAt": now}),
        );
    }
}

/// Keep path segments inside the store without two values sharing a file
///
/// Unreserved characters pass through; every other byte becomes `%XX`,
/// including `%` itself and a leading `.`. An empty value encodes as `%`.
fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(segment.len());
    for (i, byte) in segment.bytes().enumerate() {
        let plain = byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') || (byte == b'.' && i > 0);
        if plain {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn io_error(path: &Path, err: &io::Error) -> ProviderError {
    ProviderError::new(
        ProviderErrorKind::Transport,
        format!("{}: {err}", path.display()),
    )
}

impl ResourceClient for LocalProvider {
    fn get(&self, identity: &ResourceIdentity) -> Result<Lookup, ProviderError> {
        Ok(match self.read(identity)? {
            Some(body) => Lookup::Found(ObservedState::new(body)),
            None => Lookup::NotFound,
        })
    }

    fn create_or_update(
        &self,
        identity: &ResourceIdentity,
        body: &Record,
    ) -> Result<ObservedState, ProviderError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let previous = self.read(identity)?;
        let mut document = body.clone();
        self.stamp(identity, &mut document, previous.as_ref());

        let path = self.document_path(identity);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }
        let content = serde_json::to_string_pretty(&document).map_err(|e| {
            ProviderError::new(ProviderErrorKind::Other, format!("cannot serialize {identity}: {e}"))
        })?;
        fs::write(&path, content).map_err(|e| io_error(&path, &e))?;
        log::debug!("Wrote {}", path.display());

        Ok(ObservedState::new(document))
    }

    fn delete(&self, identity: &ResourceIdentity) -> Result<(), ProviderError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let path = self.document_path(identity);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, &e)),
        }
    }
}
