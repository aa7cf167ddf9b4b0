//! Resource kind catalog
//!
//! Every kind pairs a [`ResourceKind`] (parameters, bindings, comparison
//! rules) with the ARM path template and api-version used to address it.
//! Built-in kinds live in the submodules; more can be declared in config.

mod managed_disk;
mod postgresql_server;
mod resource_group;
mod virtual_hub;
mod vpn_site;

use reconcile::{
    ArgSpec, Compare, FieldPath, IDENTITY_PATTERN, ParamSpec, ResourceIdentity, ResourceKind, Unit,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identity parameter carrying the subscription
pub const SUBSCRIPTION_PARAM: &str = "subscription_id";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("path template {template:?} has an unterminated placeholder")]
    Unterminated { template: String },

    #[error("{identity} has no value for {{{key}}} in {template:?}")]
    MissingSegment {
        identity: String,
        key: String,
        template: String,
    },

    #[error("{key} {value:?} cannot be used in a resource path")]
    UnsafeSegment { key: String, value: String },
}

/// One entry: a kind plus how to address it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Path template with `{param}` placeholders for identity parameters
    pub path: String,
    pub api_version: String,
    #[serde(default)]
    pub kind: ResourceKind,
}

impl CatalogEntry {
    pub fn new(kind: ResourceKind, path: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            api_version: api_version.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.kind.name
    }

    /// Placeholder names in the path template, in order
    pub fn placeholders(&self) -> Result<Vec<String>, TemplateError> {
        placeholders(&self.path)
    }

    /// Render the resource path for an identity of this kind
    pub fn render_path(&self, identity: &ResourceIdentity) -> Result<String, TemplateError> {
        render(&self.path, identity)
    }

    /// Structural problems with the entry
    pub fn check(&self) -> Vec<String> {
        let mut problems = match self.kind.check() {
            Ok(()) => Vec::new(),
            Err(err) => err.problems,
        };
        if self.api_version.trim().is_empty() {
            problems.push(format!("kind {}: empty api_version", self.name()));
        }
        match self.placeholders() {
            Ok(keys) => {
                for key in keys {
                    if !self.kind.identity.contains(&key) {
                        problems.push(format!(
                            "kind {}: path placeholder {{{key}}} is not an identity parameter",
                            self.name()
                        ));
                    }
                }
            }
            Err(err) => problems.push(format!("kind {}: {err}", self.name())),
        }
        problems
    }
}

/// Split a template into placeholder names
fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
    let mut keys = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| TemplateError::Unterminated {
            template: template.to_string(),
        })?;
        keys.push(after[..end].to_string());
        rest = &after[end + 1..];
    }
    Ok(keys)
}

fn render(template: &str, identity: &ResourceIdentity) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| TemplateError::Unterminated {
            template: template.to_string(),
        })?;
        let key = &after[..end];
        let value = identity
            .get(key)
            .ok_or_else(|| TemplateError::MissingSegment {
                identity: identity.to_string(),
                key: key.to_string(),
                template: template.to_string(),
            })?;
        if !is_safe_segment(value) {
            return Err(TemplateError::UnsafeSegment {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// A value that stays exactly one path segment once spliced into a URL
fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && !value.chars().all(|c| c == '.')
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
}

/// All known kinds, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// The built-in kinds
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for entry in [
            resource_group::entry(),
            managed_disk::entry(),
            virtual_hub::entry(),
            vpn_site::entry(),
            postgresql_server::entry(),
        ] {
            catalog.insert(entry);
        }
        catalog
    }

    /// Add or replace an entry
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.name().to_string(), entry);
    }

    /// Add kinds declared in config; the table key names the kind
    pub fn extend_custom(&mut self, custom: &BTreeMap<String, CatalogEntry>) {
        for (name, entry) in custom {
            let mut entry = entry.clone();
            entry.kind.name.clone_from(name);
            if self.entries.contains_key(name) {
                log::info!("Config kind {name} overrides the built-in definition");
            }
            self.insert(entry);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Problems across every entry
    pub fn check(&self) -> Vec<String> {
        self.entries.values().flat_map(CatalogEntry::check).collect()
    }

    /// Resolve the entry a unit belongs to
    pub fn entry_for(&self, unit: &Unit) -> Option<&CatalogEntry> {
        self.get(unit.kind())
    }
}

/// Skeleton shared by resource-group scoped ARM kinds
///
/// Identity is `subscription_id / resource_group / name`; every such kind
/// has `state`, a create-only `location` and tags with `append_tags`.
pub(crate) fn scoped_kind(name: &str, args: ArgSpec) -> ResourceKind {
    ResourceKind::new(name)
        .args(with_common_params(args))
        .identity_param(SUBSCRIPTION_PARAM)
        .identity_param("resource_group")
        .identity_param("name")
        .with_state()
        .append_flag("append_tags", "tags")
        .rule("location", Compare::IgnoreCase)
        .create_only("location")
}

/// Add the parameters every ARM kind takes
pub(crate) fn with_common_params(args: ArgSpec) -> ArgSpec {
    args.param(
        SUBSCRIPTION_PARAM,
        ParamSpec::str()
            .required()
            .pattern(IDENTITY_PATTERN)
            .describe("Subscription the resource lives in"),
    )
    .param(
        "location",
        ParamSpec::str().describe("Azure region; can only be chosen at creation"),
    )
    .param(
        "tags",
        ParamSpec::dict().describe("Tags merged into the existing ones; replaced with append_tags=false"),
    )
}

/// Dotted paths from literals
pub(crate) fn paths(paths: &[&str]) -> Vec<FieldPath> {
    paths.iter().map(|p| FieldPath::parse(p)).collect()
}
