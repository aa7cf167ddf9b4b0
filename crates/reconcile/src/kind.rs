//! Resource kinds - bind a parameter schema to the reconciliation loop
//!
//! A kind is data: which parameters address the resource, which ones
//! steer the reconciler, where the rest land in the request body and how
//! each field is compared.

use crate::error::{Error, ValidationError};
use crate::field::{FieldPath, Record};
use crate::identity::ResourceIdentity;
use crate::outcome::ResultShape;
use crate::policy::{Compare, FieldRules};
use crate::schema::{ArgSpec, ParamSpec, ParamType, Params};
use crate::state::{DesiredState, Ensure};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Conventional parameter selecting present/absent
pub const STATE_PARAM: &str = "state";

/// Default pattern for identity parameters
///
/// Identity values become URL path segments, so separators, query and
/// fragment markers, `%`, whitespace and all-dot names are refused.
pub const IDENTITY_PATTERN: &str = r"[^/\\?#%\s]*[^/\\?#%\s.][^/\\?#%\s]*";

/// Declarative description of one resource type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceKind {
    pub name: String,
    pub description: String,
    pub args: ArgSpec,
    /// Parameters forming the identity, outermost first
    pub identity: Vec<String>,
    /// Parameters consumed by the reconciler, never sent in the body
    pub controls: Vec<String>,
    /// Parameter -> body path; unbound parameters land top-level under their own name
    pub bindings: BTreeMap<String, FieldPath>,
    pub rules: FieldRules,
    /// Bool parameter -> path merged when true and replaced when false
    pub append_flags: BTreeMap<String, FieldPath>,
    /// Paths returned to the caller; everything when absent
    pub returns: Option<Vec<FieldPath>>,
    /// Ordering: lower tiers are created first and deleted last
    pub tier: u32,
}

/// One resource ready to reconcile
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub identity: ResourceIdentity,
    pub desired: DesiredState,
    pub rules: FieldRules,
    pub shape: ResultShape,
    pub tier: u32,
}

impl Unit {
    pub fn kind(&self) -> &str {
        self.identity.kind()
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }
}

impl ResourceKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn args(mut self, args: ArgSpec) -> Self {
        self.args = args;
        self
    }

    /// Add an identity parameter (a required string matching [`IDENTITY_PATTERN`])
    pub fn identity_param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.args
            .params
            .entry(name.clone())
            .or_insert_with(|| ParamSpec::str().required().pattern(IDENTITY_PATTERN));
        self.identity.push(name);
        self
    }

    /// Add the conventional `state: present | absent` control
    pub fn with_state(mut self) -> Self {
        self.args.params.insert(
            STATE_PARAM.to_string(),
            ParamSpec::str()
                .choices(["present", "absent"])
                .default_value("present"),
        );
        self.controls.push(STATE_PARAM.to_string());
        self
    }

    pub fn control(mut self, name: impl Into<String>) -> Self {
        self.controls.push(name.into());
        self
    }

    pub fn bind(mut self, param: impl Into<String>, path: impl Into<FieldPath>) -> Self {
        self.bindings.insert(param.into(), path.into());
        self
    }

    pub fn rule(mut self, path: impl Into<FieldPath>, compare: Compare) -> Self {
        self.rules = self.rules.with(path, compare);
        self
    }

    pub fn create_only(mut self, path: impl Into<FieldPath>) -> Self {
        self.rules = self.rules.create_only(path);
        self
    }

    /// Add an `append_*` flag (default true) steering how `path` is merged
    pub fn append_flag(mut self, param: impl Into<String>, path: impl Into<FieldPath>) -> Self {
        let param = param.into();
        self.args
            .params
            .insert(param.clone(), ParamSpec::bool().default_value(true));
        self.append_flags.insert(param, path.into());
        self
    }

    pub fn returns(mut self, paths: impl IntoIterator<Item = FieldPath>) -> Self {
        self.returns = Some(paths.into_iter().collect());
        self
    }

    pub fn tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    /// Body path a parameter is written to
    pub fn path_for(&self, param: &str) -> FieldPath {
        self.bindings
            .get(param)
            .cloned()
            .unwrap_or_else(|| FieldPath::parse(param))
    }

    fn is_body_param(&self, param: &str) -> bool {
        !self.identity.iter().any(|p| p == param)
            && !self.controls.iter().any(|p| p == param)
            && !self.append_flags.contains_key(param)
    }

    /// Structural problems in the declaration (used for kinds from config)
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut problems: Vec<String> = self
            .args
            .lint()
            .into_iter()
            .map(|p| format!("kind {}: {p}", self.name))
            .collect();

        if self.name.is_empty() {
            problems.push("kind has no name".to_string());
        }
        if self.identity.is_empty() {
            problems.push(format!("kind {}: no identity parameters", self.name));
        }
        let declared = self
            .identity
            .iter()
            .chain(&self.controls)
            .chain(self.bindings.keys())
            .chain(self.append_flags.keys());
        for param in declared {
            if !self.args.params.contains_key(param) {
                problems.push(format!("kind {}: unknown parameter {param}", self.name));
            }
        }
        for param in self.append_flags.keys() {
            if self
                .args
                .params
                .get(param)
                .is_some_and(|spec| spec.kind != ParamType::Bool)
            {
                problems.push(format!("kind {}: append flag {param} must be a bool", self.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(problems))
        }
    }

    /// Validate raw input and build everything the reconciler needs
    pub fn prepare(&self, raw: &Record) -> Result<Unit, Error> {
        let params = self.args.validate(raw)?;

        Ok(Unit {
            identity: self.identity_from(&params)?,
            desired: self.desired_from(&params)?,
            rules: self.rules_from(&params),
            shape: self.shape(),
            tier: self.tier,
        })
    }

    fn identity_from(&self, params: &Params) -> Result<ResourceIdentity, Error> {
        let mut builder = ResourceIdentity::builder(&self.name);
        let mut problems = Vec::new();
        for key in &self.identity {
            match params.value(key) {
                Some(Value::String(s)) if !s.is_empty() => builder = builder.segment(key, s),
                Some(Value::Number(n)) => builder = builder.segment(key, n.to_string()),
                _ => problems.push(format!("identity parameter {key} must be a non-empty string")),
            }
        }
        if problems.is_empty() {
            Ok(builder.build())
        } else {
            Err(ValidationError::new(problems).into())
        }
    }

    fn desired_from(&self, params: &Params) -> Result<DesiredState, Error> {
        let ensure = match params.str(STATE_PARAM) {
            Some(s) if self.controls.iter().any(|c| c == STATE_PARAM) => Ensure::parse(s)
                .ok_or_else(|| ValidationError::single(format!("invalid state: {s}")))?,
            _ => Ensure::Present,
        };

        let mut desired = DesiredState::present().with_ensure(ensure);
        for (param, field) in params.iter() {
            if field.is_explicit() && self.is_body_param(param) {
                desired = desired.field(self.path_for(param), field.clone());
            }
        }
        Ok(desired)
    }

    fn rules_from(&self, params: &Params) -> FieldRules {
        let mut rules = self.rules.clone();
        for (flag, path) in &self.append_flags {
            let append = params.bool(flag).unwrap_or(true);
            rules.set_compare(path.clone(), Compare::tags(append));
        }
        rules
    }

    /// Projection and redaction for results of this kind
    pub fn shape(&self) -> ResultShape {
        let mut shape = ResultShape {
            returns: self.returns.clone(),
            secrets: Vec::new(),
        };
        for secret in self.args.secret_paths() {
            let (param, rest) = secret.split_once('.').unwrap_or((secret.as_str(), ""));
            if !self.is_body_param(param) {
                continue;
            }
            let mut path = self.path_for(param);
            for segment in rest.split('.').filter(|s| !s.is_empty()) {
                path = path.child(segment);
            }
            shape = shape.secret(path);
        }
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::field::Field;
    use serde_json::json;

    fn raw(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn disk_kind() -> ResourceKind {
        ResourceKind::new("managed_disk")
            .identity_param("resource_group")
            .identity_param("name")
            .with_state()
            .args(
                ArgSpec::new()
                    .param("resource_group", ParamSpec::str().required())
                    .param("name", ParamSpec::str().required())
                    .param("state", ParamSpec::str().choices(["present", "absent"]).default_value("present"))
                    .param("location", ParamSpec::str())
                    .param("disk_size_gb", ParamSpec::int())
                    .param("tags", ParamSpec::dict())
                    .param("append_tags", ParamSpec::bool().default_value(true))
                    .param("secret", ParamSpec::str().no_log()),
            )
            .bind("disk_size_gb", "properties.diskSizeGB")
            .bind("secret", "properties.encryption.key")
            .append_flag("append_tags", "tags")
            .create_only("location")
            .tier(1)
    }

    #[test]
    fn test_prepare_builds_unit() {
        let unit = disk_kind()
            .prepare(&raw(json!({
                "resource_group": "rg",
                "name": "d1",
                "location": "westeurope",
                "disk_size_gb": 64,
                "tags": {"env": "dev"}
            })))
            .unwrap();

        assert_eq!(unit.identity.to_string(), "managed_disk:rg/d1");
        assert_eq!(unit.desired.ensure(), Ensure::Present);
        assert_eq!(
            unit.desired.get(&"properties.diskSizeGB".into()),
            &Field::Set(json!(64))
        );
        assert_eq!(unit.desired.get(&"name".into()), &Field::Unset);
        assert_eq!(unit.desired.get(&"state".into()), &Field::Unset);
        assert_eq!(unit.desired.get(&"append_tags".into()), &Field::Unset);
        assert_eq!(unit.rules.compare_for(&"tags".into()), &Compare::tags(true));
        assert!(unit.rules.is_create_only(&"location".into()));
        assert_eq!(unit.tier, 1);
    }

    #[test]
    fn test_append_flag_false_replaces() {
        let unit = disk_kind()
            .prepare(&raw(json!({"resource_group": "rg", "name": "d1", "append_tags": false})))
            .unwrap();
        assert_eq!(unit.rules.compare_for(&"tags".into()), &Compare::Exact);
    }

    #[test]
    fn test_state_absent() {
        let unit = disk_kind()
            .prepare(&raw(json!({"resource_group": "rg", "name": "d1", "state": "absent"})))
            .unwrap();
        assert_eq!(unit.desired.ensure(), Ensure::Absent);
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = disk_kind()
            .prepare(&raw(json!({"name": "d1", "disk_size_gb": "huge"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_identity_params_must_be_single_segments() {
        let kind = ResourceKind::new("thing").identity_param("name");
        for bad in ["a/b", "..", "x?api-version=1", "a b", "%2F"] {
            let err = kind.prepare(&raw(json!({"name": bad}))).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
        let unit = kind.prepare(&raw(json!({"name": "rg.prod_(eu)-1"}))).unwrap();
        assert_eq!(unit.identity.get("name"), Some("rg.prod_(eu)-1"));
    }

    #[test]
    fn test_secret_paths_follow_bindings() {
        let shape = disk_kind().shape();
        assert_eq!(shape.secrets, vec![FieldPath::parse("properties.encryption.key")]);
    }

    #[test]
    fn test_check() {
        assert!(disk_kind().check().is_ok());

        let broken = ResourceKind::new("broken")
            .args(ArgSpec::new().param("flag", ParamSpec::str()))
            .bind("missing", "properties.missing");
        let err = broken.check().unwrap_err();
        assert_eq!(err.problems.len(), 2, "{:?}", err.problems);
    }

    #[test]
    fn test_deserialize_kind() {
        let kind: ResourceKind = serde_json::from_value(json!({
            "name": "dns_zone",
            "identity": ["resource_group", "name"],
            "controls": ["state"],
            "args": {"params": {
                "resource_group": {"type": "str", "required": true},
                "name": {"type": "str", "required": true},
                "state": {"type": "str", "choices": ["present", "absent"], "default": "present"},
                "zone_type": {"type": "str", "choices": ["Public", "Private"]}
            }},
            "bindings": {"zone_type": "properties.zoneType"},
            "rules": {"properties.zoneType": {"compare": "ignore_case"}}
        }))
        .unwrap();
        assert!(kind.check().is_ok());
        let unit = kind
            .prepare(&raw(json!({"resource_group": "rg", "name": "example.com", "zone_type": "Public"})))
            .unwrap();
        assert_eq!(unit.identity.name(), "example.com");
        assert_eq!(
            unit.rules.compare_for(&"properties.zoneType".into()),
            &Compare::IgnoreCase
        );
    }
}
