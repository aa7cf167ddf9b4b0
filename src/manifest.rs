//! Manifests: the resources to converge
//!
//! TOML or JSON, chosen by extension:
//!
//! ```toml
//! [defaults]
//! subscription_id = "sub-1"
//! resource_group = "rg-demo"
//! location = "westeurope"
//!
//! [[resources]]
//! kind = "resource_group"
//! name = "rg-demo"
//!
//! [[resources]]
//! kind = "managed_disk"
//! name = "data"
//! disk_size_gb = 64
//! ```
//!
//! Defaults are offered to every resource whose kind accepts the key;
//! values on the resource win.

use anyhow::{Context, Result, bail};
use reconcile::{ExecutionPlan, Record, Unit};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::catalog::Catalog;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub defaults: Record,
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestResource {
    pub kind: String,
    #[serde(flatten)]
    pub params: Record,
}

impl ManifestResource {
    /// Label for messages: `kind.name` or `kind[#index]`
    pub fn label(&self, index: usize) -> String {
        match self.params.get("name").and_then(|v| v.as_str()) {
            Some(name) => format!("{}.{name}", self.kind),
            None => format!("{}[#{index}]", self.kind),
        }
    }
}

/// A resource that could not be turned into a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceProblem {
    pub label: String,
    pub message: String,
}

/// Outcome of building a plan: the good units and everything wrong
#[derive(Debug, Default)]
pub struct Planned {
    pub plan: ExecutionPlan,
    pub problems: Vec<ResourceProblem>,
}

impl Manifest {
    /// Load a manifest, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in manifest: {}", path.display())),
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in manifest: {}", path.display())),
            _ => bail!(
                "Unsupported manifest format: {} (expected .toml or .json)",
                path.display()
            ),
        }
    }

    /// Raw parameters for one resource with defaults layered underneath
    ///
    /// `base` comes from config and sits below the manifest's own defaults.
    pub fn resolve(&self, resource: &ManifestResource, base: &Record, catalog: &Catalog) -> Record {
        let mut raw = resource.params.clone();
        let Some(entry) = catalog.get(&resource.kind) else {
            return raw;
        };
        for defaults in [&self.defaults, base] {
            for (key, value) in defaults {
                if entry.kind.args.accepts(key) && !raw.contains_key(key) {
                    raw.insert(key.clone(), value.clone());
                }
            }
        }
        raw
    }

    /// Validate every resource and build a plan from the valid ones
    pub fn plan(&self, catalog: &Catalog, base: &Record) -> Planned {
        let mut planned = Planned::default();

        for (index, resource) in self.resources.iter().enumerate() {
            let label = resource.label(index);
            match self.prepare(resource, base, catalog) {
                Ok(unit) => {
                    log::debug!("Planned {}", unit.identity);
                    planned.plan.push(unit);
                }
                Err(message) => planned.problems.push(ResourceProblem { label, message }),
            }
        }

        for identity in planned.plan.duplicates() {
            planned.problems.push(ResourceProblem {
                label: identity.to_string(),
                message: "declared more than once".to_string(),
            });
        }
        planned
    }

    fn prepare(&self, resource: &ManifestResource, base: &Record, catalog: &Catalog) -> Result<Unit, String> {
        let entry = catalog.get(&resource.kind).ok_or_else(|| {
            format!(
                "unknown kind {:?} (known: {})",
                resource.kind,
                catalog.names().join(", ")
            )
        })?;
        let raw = self.resolve(resource, base, catalog);
        entry.kind.prepare(&raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{Ensure, Field, FieldPath};
    use serde_json::json;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[defaults]
subscription_id = "sub-1"
resource_group = "rg-demo"
location = "westeurope"

[[resources]]
kind = "resource_group"
name = "rg-demo"

[[resources]]
kind = "managed_disk"
name = "data"
disk_size_gb = 64
location = "northeurope"

[[resources]]
kind = "managed_disk"
name = "old"
state = "absent"
"#;

    fn load(name: &str, content: &str) -> Result<Manifest> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        Manifest::load(&path)
    }

    #[test]
    fn test_load_toml_and_plan() {
        let manifest = load("infra.toml", MANIFEST).unwrap();
        assert_eq!(manifest.resources.len(), 3);

        let planned = manifest.plan(&Catalog::builtin(), &Record::new());
        assert!(planned.problems.is_empty(), "{:?}", planned.problems);
        let units = planned.plan.units();
        assert_eq!(units[0].identity.to_string(), "resource_group:sub-1/rg-demo");
        assert_eq!(units[1].identity.to_string(), "managed_disk:sub-1/rg-demo/data");
        assert_eq!(
            units[1].desired.get(&FieldPath::parse("location")),
            &Field::Set(json!("northeurope"))
        );
        assert_eq!(units[2].desired.ensure(), Ensure::Absent);
    }

    #[test]
    fn test_defaults_only_reach_kinds_that_accept_them() {
        let manifest = load("infra.toml", MANIFEST).unwrap();
        let raw = manifest.resolve(&manifest.resources[0], &Record::new(), &Catalog::builtin());
        assert!(!raw.contains_key("resource_group"));
        assert_eq!(raw.get("location"), Some(&json!("westeurope")));
    }

    #[test]
    fn test_config_defaults_sit_below_manifest_defaults() {
        let manifest = load("infra.toml", MANIFEST).unwrap();
        let base = json!({"subscription_id": "from-config", "tags": {"owner": "ops"}})
            .as_object()
            .cloned()
            .unwrap();
        let raw = manifest.resolve(&manifest.resources[1], &base, &Catalog::builtin());
        assert_eq!(raw.get("subscription_id"), Some(&json!("sub-1")));
        assert_eq!(raw.get("tags"), Some(&json!({"owner": "ops"})));
    }

    #[test]
    fn test_load_json() {
        let manifest = load(
            "infra.json",
            r#"{"resources": [{"kind": "resource_group", "subscription_id": "s", "name": "rg"}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.resources[0].kind, "resource_group");
        assert_eq!(manifest.resources[0].params.get("name"), Some(&json!("rg")));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load("infra.yaml", "resources: []").unwrap_err();
        assert!(err.to_string().contains("Unsupported manifest format"));
    }

    #[test]
    fn test_problems_are_collected() {
        let manifest = load(
            "bad.toml",
            r#"
[[resources]]
kind = "load_balancer"
name = "lb"

[[resources]]
kind = "managed_disk"
name = "data"
subscription_id = "s"

[[resources]]
kind = "resource_group"
subscription_id = "s"
name = "rg"

[[resources]]
kind = "resource_group"
subscription_id = "s"
name = "rg"
"#,
        )
        .unwrap();

        let planned = manifest.plan(&Catalog::builtin(), &Record::new());
        let labels: Vec<&str> = planned.problems.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["load_balancer.lb", "managed_disk.data", "resource_group:s/rg"]
        );
        assert!(planned.problems[0].message.contains("unknown kind"));
        assert!(planned.problems[1].message.contains("resource_group"));
        assert_eq!(planned.plan.len(), 2);
    }
}
