//! Parameter schema - typed, validated input for a resource kind
//!
//! An [`ArgSpec`] declares every parameter a kind accepts. Validation is
//! purely local and total: all type, required and choice problems are
//! collected before anything talks to a provider.

use crate::diff::values_equal;
use crate::error::{Error, ValidationError};
use crate::field::{Field, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashMap};

/// Parameter types with the coercions of the usual automation arg specs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
    /// Passed through untouched
    Raw,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Raw => "raw",
        }
    }
}

/// Declaration of a single parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    /// Match string choices ignoring ASCII case
    pub ignore_case: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Element type for lists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elements: Option<ParamType>,
    /// Sub-options for dicts, or for each element of a list of dicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ArgSpec>,
    /// Secret; never echoed back
    pub no_log: bool,
    /// Anchored regex a string value must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParamSpec {
    pub fn new(kind: ParamType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn str() -> Self {
        Self::new(ParamType::Str)
    }

    pub fn int() -> Self {
        Self::new(ParamType::Int)
    }

    pub fn bool() -> Self {
        Self::new(ParamType::Bool)
    }

    pub fn list(elements: ParamType) -> Self {
        Self {
            elements: Some(elements),
            ..Self::new(ParamType::List)
        }
    }

    pub fn dict() -> Self {
        Self::new(ParamType::Dict)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn options(mut self, options: ArgSpec) -> Self {
        self.options = Some(options);
        self
    }

    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// `param == value` makes other parameters required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredIf {
    pub param: String,
    pub value: Value,
    pub requires: Vec<String>,
    /// One of `requires` is enough, instead of all of them
    #[serde(default)]
    pub any: bool,
}

impl RequiredIf {
    pub fn new<I, S>(param: impl Into<String>, value: impl Into<Value>, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            param: param.into(),
            value: value.into(),
            requires: requires.into_iter().map(Into::into).collect(),
            any: false,
        }
    }

    pub fn any(mut self) -> Self {
        self.any = true;
        self
    }
}

/// A full parameter surface with group constraints
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArgSpec {
    pub params: BTreeMap<String, ParamSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mutually_exclusive: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_together: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_one_of: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_if: Vec<RequiredIf>,
}

/// Validated parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params(BTreeMap<String, Field>);

impl Params {
    /// Tri-state value of a parameter; unknown names are `Unset`
    pub fn get(&self, name: &str) -> &Field {
        self.0.get(name).unwrap_or(&Field::Unset)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).value()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl ArgSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    pub fn mutually_exclusive<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mutually_exclusive
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_together<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_together
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_one_of<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_one_of
            .push(group.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_if(mut self, rule: RequiredIf) -> Self {
        self.required_if.push(rule);
        self
    }

    /// Whether `key` names a parameter or one of its aliases
    pub fn accepts(&self, key: &str) -> bool {
        self.params
            .iter()
            .any(|(name, spec)| name == key || spec.aliases.iter().any(|a| a == key))
    }

    /// Dotted parameter paths of every `no_log` parameter, nested ones included
    pub fn secret_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for (name, spec) in &self.params {
            if spec.no_log {
                paths.push(name.clone());
            } else if let Some(options) = &spec.options
                && spec.kind == ParamType::Dict
            {
                paths.extend(
                    options
                        .secret_paths()
                        .into_iter()
                        .map(|sub| format!("{name}.{sub}")),
                );
            }
        }
        paths
    }

    /// Validate raw input
    ///
    /// Mutually exclusive parameters are reported as
    /// [`Error::Conflicting`] before anything else; every other problem is
    /// collected into one [`ValidationError`].
    pub fn validate(&self, raw: &Record) -> Result<Params, Error> {
        let mut problems = Vec::new();
        let values = self.check(raw, "", &mut problems)?;
        if problems.is_empty() {
            Ok(Params(values))
        } else {
            Err(ValidationError::new(problems).into())
        }
    }

    /// Structural checks on the spec itself (used for kinds loaded from config)
    pub fn lint(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (name, spec) in &self.params {
            for alias in &spec.aliases {
                if let Some(owner) = seen.insert(alias, name)
                    && owner != name
                {
                    problems.push(format!("alias {alias} is used by both {owner} and {name}"));
                }
                if self.params.contains_key(alias) {
                    problems.push(format!("alias {alias} of {name} shadows a parameter"));
                }
            }
            if let Some(pattern) = &spec.pattern
                && let Err(err) = anchored(pattern)
            {
                problems.push(format!("invalid pattern for {name}: {err}"));
            }
            if spec.required && spec.default.is_some() {
                problems.push(format!("{name} is required and cannot have a default"));
            }
            if let Some(options) = &spec.options {
                problems.extend(
                    options
                        .lint()
                        .into_iter()
                        .map(|p| format!("in {name}: {p}")),
                );
            }
        }
        let groups = self
            .mutually_exclusive
            .iter()
            .chain(&self.required_together)
            .chain(&self.required_one_of);
        for name in groups.flatten() {
            if !self.params.contains_key(name) {
                problems.push(format!("constraint references unknown parameter {name}"));
            }
        }
        for rule in &self.required_if {
            for name in std::iter::once(&rule.param).chain(&rule.requires) {
                if !self.params.contains_key(name) {
                    problems.push(format!("required_if references unknown parameter {name}"));
                }
            }
        }
        problems
    }

    fn check(
        &self,
        raw: &Record,
        prefix: &str,
        problems: &mut Vec<String>,
    ) -> Result<BTreeMap<String, Field>, Error> {
        let given = self.resolve_aliases(raw, prefix, problems);

        for group in &self.mutually_exclusive {
            let present: Vec<String> = group
                .iter()
                .filter(|name| given.get(*name).is_some_and(|v| !v.is_null()))
                .map(|name| qualify(prefix, name))
                .collect();
            if present.len() > 1 {
                return Err(Error::Conflicting { params: present });
            }
        }

        let mut values = BTreeMap::new();
        for (name, spec) in &self.params {
            let qualified = qualify(prefix, name);
            let field = match given.get(name) {
                Some(Value::Null) | None if spec.required => {
                    problems.push(format!("missing required parameter: {qualified}"));
                    continue;
                }
                Some(Value::Null) => Field::Null,
                Some(value) => match coerce_param(spec, value, &qualified, problems)? {
                    Some(v) => Field::Set(v),
                    None => continue,
                },
                None => match &spec.default {
                    Some(default) => match coerce_param(spec, default, &qualified, problems)? {
                        Some(v) => Field::Set(v),
                        None => continue,
                    },
                    None => Field::Unset,
                },
            };
            values.insert(name.clone(), field);
        }

        self.check_groups(&values, prefix, problems);
        Ok(values)
    }

    fn resolve_aliases(
        &self,
        raw: &Record,
        prefix: &str,
        problems: &mut Vec<String>,
    ) -> BTreeMap<String, Value> {
        let mut lookup: HashMap<&str, &str> = HashMap::new();
        for (name, spec) in &self.params {
            lookup.insert(name, name);
            for alias in &spec.aliases {
                lookup.insert(alias, name);
            }
        }

        let mut given = BTreeMap::new();
        for (key, value) in raw {
            match lookup.get(key.as_str()) {
                Some(canonical) => {
                    if given.insert((*canonical).to_string(), value.clone()).is_some() {
                        problems.push(format!(
                            "parameter {} given more than once (via {key})",
                            qualify(prefix, canonical)
                        ));
                    }
                }
                None => problems.push(format!("unsupported parameter: {}", qualify(prefix, key))),
            }
        }
        given
    }

    fn check_groups(&self, values: &BTreeMap<String, Field>, prefix: &str, problems: &mut Vec<String>) {
        let is_set = |name: &str| values.get(name).is_some_and(|f| f.value().is_some());
        let join = |names: &[String]| {
            names
                .iter()
                .map(|n| qualify(prefix, n))
                .collect::<Vec<_>>()
                .join(", ")
        };

        for group in &self.required_together {
            let count = group.iter().filter(|n| is_set(n)).count();
            if count > 0 && count < group.len() {
                problems.push(format!("parameters are required together: {}", join(group)));
            }
        }

        for group in &self.required_one_of {
            if !group.iter().any(|n| is_set(n)) {
                problems.push(format!("one of the following is required: {}", join(group)));
            }
        }

        for rule in &self.required_if {
            let Some(actual) = values.get(&rule.param).and_then(Field::value) else {
                continue;
            };
            if !values_equal(actual, &rule.value) {
                continue;
            }
            let missing: Vec<String> = rule
                .requires
                .iter()
                .filter(|n| !is_set(n))
                .cloned()
                .collect();
            let violated = if rule.any {
                missing.len() == rule.requires.len()
            } else {
                !missing.is_empty()
            };
            if violated {
                problems.push(format!(
                    "{} is {} but {} of the following are missing: {}",
                    qualify(prefix, &rule.param),
                    display_value(&rule.value),
                    if rule.any { "all" } else { "some" },
                    join(&missing)
                ));
            }
        }
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Coerce one supplied value; `Ok(None)` means a problem was recorded
fn coerce_param(
    spec: &ParamSpec,
    value: &Value,
    name: &str,
    problems: &mut Vec<String>,
) -> Result<Option<Value>, Error> {
    let coerced = match coerce(spec.kind, value) {
        Ok(v) => v,
        Err(reason) => {
            problems.push(format!("{name}: {reason}"));
            return Ok(None);
        }
    };

    let coerced = match (spec.kind, coerced) {
        (ParamType::List, Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item_name = format!("{name}[{index}]");
                let item = match spec.elements {
                    Some(elements) => match coerce(elements, item) {
                        Ok(v) => v,
                        Err(reason) => {
                            problems.push(format!("{item_name}: {reason}"));
                            continue;
                        }
                    },
                    None => item.clone(),
                };
                let item = match (&spec.options, item) {
                    (Some(options), Value::Object(map)) => {
                        Value::Object(nested(options, &map, &item_name, problems)?)
                    }
                    (_, item) => item,
                };
                out.push(item);
            }
            Value::Array(out)
        }
        (ParamType::Dict, Value::Object(map)) => match &spec.options {
            Some(options) => Value::Object(nested(options, &map, name, problems)?),
            None => Value::Object(map),
        },
        (_, other) => other,
    };

    let Some(coerced) = check_choices(spec, coerced, name, problems) else {
        return Ok(None);
    };

    if let (Some(pattern), Some(s)) = (&spec.pattern, coerced.as_str()) {
        match anchored(pattern) {
            Ok(re) if re.is_match(s) => {}
            Ok(_) => {
                problems.push(format!("{name}: value {s:?} does not match pattern {pattern}"));
                return Ok(None);
            }
            Err(err) => {
                problems.push(format!("{name}: invalid pattern {pattern}: {err}"));
                return Ok(None);
            }
        }
    }

    Ok(Some(coerced))
}

/// Validate a nested record and flatten it back to JSON
///
/// Unset sub-options are left out; explicit nulls stay so the differ can
/// treat them as "inherit".
fn nested(
    options: &ArgSpec,
    raw: &Record,
    name: &str,
    problems: &mut Vec<String>,
) -> Result<Record, Error> {
    let values = options.check(raw, name, problems)?;
    Ok(values
        .into_iter()
        .filter_map(|(key, field)| match field {
            Field::Unset => None,
            Field::Null => Some((key, Value::Null)),
            Field::Set(v) => Some((key, v)),
        })
        .collect())
}

fn check_choices(
    spec: &ParamSpec,
    value: Value,
    name: &str,
    problems: &mut Vec<String>,
) -> Option<Value> {
    if spec.choices.is_empty() {
        return Some(value);
    }

    let pick = |candidate: &Value| -> Option<Value> {
        spec.choices
            .iter()
            .find(|choice| match (choice, candidate) {
                (Value::String(a), Value::String(b)) if spec.ignore_case => a.eq_ignore_ascii_case(b),
                (a, b) => values_equal(a, b),
            })
            .cloned()
    };

    let allowed = || {
        spec.choices
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", ")
    };

    match value {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                match pick(item) {
                    Some(choice) => out.push(choice),
                    None => {
                        problems.push(format!(
                            "{name}: value {} must be one of: {}",
                            display_value(item),
                            allowed()
                        ));
                        return None;
                    }
                }
            }
            Some(Value::Array(out))
        }
        other => match pick(&other) {
            Some(choice) => Some(choice),
            None => {
                problems.push(format!(
                    "{name}: value must be one of: {}, got: {}",
                    allowed(),
                    display_value(&other)
                ));
                None
            }
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Coerce a value into a parameter type
pub fn coerce(kind: ParamType, value: &Value) -> Result<Value, String> {
    let fail = || {
        format!(
            "{} of type {} cannot be converted to {}",
            display_value(value),
            type_name(value),
            kind.as_str()
        )
    };

    match kind {
        ParamType::Raw => Ok(value.clone()),
        ParamType::Str => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(fail()),
        },
        ParamType::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract().abs() < f64::EPSILON && f.abs() < 9.0e15 => Ok(Value::from(f as i64)),
                _ => Err(fail()),
            },
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| fail()),
            _ => Err(fail()),
        },
        ParamType::Float => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail)
        }
        ParamType::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "on" | "true" | "1" | "y" | "t" => Ok(Value::Bool(true)),
                "no" | "off" | "false" | "0" | "n" | "f" => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Ok(Value::Bool(true)),
                Some(0) => Ok(Value::Bool(false)),
                _ => Err(fail()),
            },
            _ => Err(fail()),
        },
        ParamType::List => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Array(Vec::new())),
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(|part| Value::String(part.trim().to_string()))
                    .collect(),
            )),
            Value::Number(_) | Value::Bool(_) => Ok(Value::Array(vec![value.clone()])),
            _ => Err(fail()),
        },
        ParamType::Dict => match value {
            Value::Object(_) => Ok(value.clone()),
            Value::String(s) if s.trim_start().starts_with('{') => {
                match serde_json::from_str::<Value>(s) {
                    Ok(parsed @ Value::Object(_)) => Ok(parsed),
                    _ => Err(fail()),
                }
            }
            Value::String(s) => parse_key_values(s).map(Value::Object).ok_or_else(fail),
            _ => Err(fail()),
        },
    }
}

/// Parse `k=v, k2=v2`
fn parse_key_values(s: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        map.insert(key.to_string(), Value::String(value.trim().to_string()));
    }
    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn raw(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn validation_problems(err: Error) -> Vec<String> {
        match err {
            Error::Validation(v) => v.problems,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn disk_spec() -> ArgSpec {
        ArgSpec::new()
            .param("name", ParamSpec::str().required())
            .param("resource_group", ParamSpec::str().required())
            .param("disk_size_gb", ParamSpec::int())
            .param(
                "storage_account_type",
                ParamSpec::str()
                    .choices(["Standard_LRS", "Premium_LRS"])
                    .ignore_case(),
            )
            .param(
                "state",
                ParamSpec::str()
                    .choices(["present", "absent"])
                    .default_value("present"),
            )
            .param("zone", ParamSpec::str().alias("availability_zone"))
    }

    #[test]
    fn test_accepts_names_and_aliases() {
        let spec = disk_spec();
        assert!(spec.accepts("zone"));
        assert!(spec.accepts("availability_zone"));
        assert!(!spec.accepts("location"));
    }

    #[test]
    fn test_valid_input_with_defaults() {
        let params = disk_spec()
            .validate(&raw(json!({"name": "d1", "resource_group": "rg", "disk_size_gb": "64"})))
            .unwrap();
        assert_eq!(params.str("name"), Some("d1"));
        assert_eq!(params.value("disk_size_gb"), Some(&json!(64)));
        assert_eq!(params.str("state"), Some("present"));
        assert_eq!(params.get("zone"), &Field::Unset);
    }

    #[test]
    fn test_explicit_null_is_tristate_null() {
        let params = disk_spec()
            .validate(&raw(json!({"name": "d1", "resource_group": "rg", "zone": null})))
            .unwrap();
        assert_eq!(params.get("zone"), &Field::Null);
    }

    #[test]
    fn test_collects_all_problems() {
        let err = disk_spec()
            .validate(&raw(json!({
                "disk_size_gb": "big",
                "storage_account_type": "Ultra",
                "colour": "blue"
            })))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let problems = validation_problems(err);
        assert_eq!(problems.len(), 5, "{problems:?}");
        assert!(problems.contains(&"unsupported parameter: colour".to_string()));
        assert!(problems.contains(&"missing required parameter: name".to_string()));
        assert!(problems.iter().any(|p| p.starts_with("disk_size_gb:")));
        assert!(problems.iter().any(|p| p.contains("must be one of: Standard_LRS, Premium_LRS")));
    }

    #[test]
    fn test_choices_ignore_case_normalizes() {
        let params = disk_spec()
            .validate(&raw(json!({
                "name": "d1",
                "resource_group": "rg",
                "storage_account_type": "premium_lrs"
            })))
            .unwrap();
        assert_eq!(params.str("storage_account_type"), Some("Premium_LRS"));
    }

    #[test]
    fn test_alias() {
        let params = disk_spec()
            .validate(&raw(json!({"name": "d1", "resource_group": "rg", "availability_zone": "1"})))
            .unwrap();
        assert_eq!(params.str("zone"), Some("1"));

        let err = disk_spec()
            .validate(&raw(json!({
                "name": "d1",
                "resource_group": "rg",
                "zone": "1",
                "availability_zone": "2"
            })))
            .unwrap_err();
        assert!(validation_problems(err)[0].contains("given more than once"));
    }

    #[test]
    fn test_mutually_exclusive_wins() {
        let spec = ArgSpec::new()
            .param("name", ParamSpec::str().required())
            .param("password", ParamSpec::str().no_log())
            .param("key_value", ParamSpec::str())
            .mutually_exclusive(["password", "key_value"]);
        let err = spec
            .validate(&raw(json!({"password": "x", "key_value": "y"})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictingDesiredState);
        assert_eq!(
            err.to_string(),
            "parameters are mutually exclusive: password, key_value"
        );

        // A null member does not count
        assert!(spec
            .validate(&raw(json!({"name": "a", "password": "x", "key_value": null})))
            .is_ok());
    }

    #[test]
    fn test_required_together_and_one_of() {
        let spec = ArgSpec::new()
            .param("login", ParamSpec::str())
            .param("password", ParamSpec::str())
            .param("source_uri", ParamSpec::str())
            .param("source_id", ParamSpec::str())
            .required_together(["login", "password"])
            .required_one_of(["source_uri", "source_id"]);
        let problems = validation_problems(spec.validate(&raw(json!({"login": "admin"}))).unwrap_err());
        assert_eq!(
            problems,
            vec![
                "parameters are required together: login, password".to_string(),
                "one of the following is required: source_uri, source_id".to_string(),
            ]
        );
    }

    #[test]
    fn test_required_if() {
        let spec = ArgSpec::new()
            .param("create_option", ParamSpec::str().default_value("Empty"))
            .param("source_uri", ParamSpec::str())
            .param("source_id", ParamSpec::str())
            .param("disk_size_gb", ParamSpec::int())
            .required_if(RequiredIf::new("create_option", "Import", ["source_uri", "source_id"]).any())
            .required_if(RequiredIf::new("create_option", "Empty", ["disk_size_gb"]));

        let problems = validation_problems(spec.validate(&raw(json!({}))).unwrap_err());
        assert_eq!(
            problems,
            vec!["create_option is Empty but some of the following are missing: disk_size_gb".to_string()]
        );

        assert!(spec
            .validate(&raw(json!({"create_option": "Import", "source_id": "/x"})))
            .is_ok());
        let problems = validation_problems(
            spec.validate(&raw(json!({"create_option": "Import"})))
                .unwrap_err(),
        );
        assert!(problems[0].contains("all of the following are missing: source_uri, source_id"));
    }

    #[test]
    fn test_nested_options_in_list() {
        let spec = ArgSpec::new().param(
            "links",
            ParamSpec::list(ParamType::Dict).options(
                ArgSpec::new()
                    .param("name", ParamSpec::str().required())
                    .param("speed", ParamSpec::int().default_value(10))
                    .param("bgp", ParamSpec::bool()),
            ),
        );
        let params = spec
            .validate(&raw(json!({"links": [{"name": "l1", "bgp": "yes"}, {"name": "l2", "speed": null}]})))
            .unwrap();
        assert_eq!(
            params.value("links"),
            Some(&json!([
                {"name": "l1", "speed": 10, "bgp": true},
                {"name": "l2", "speed": null}
            ]))
        );

        let problems = validation_problems(spec.validate(&raw(json!({"links": [{"speed": 5}]}))).unwrap_err());
        assert_eq!(problems, vec!["missing required parameter: links[0].name".to_string()]);
    }

    #[test]
    fn test_nested_dict_options() {
        let spec = ArgSpec::new().param(
            "sku",
            ParamSpec::dict().options(
                ArgSpec::new()
                    .param("name", ParamSpec::str().required())
                    .param("tier", ParamSpec::str().choices(["Basic", "GeneralPurpose"])),
            ),
        );
        let problems = validation_problems(
            spec.validate(&raw(json!({"sku": {"tier": "Gold"}})))
                .unwrap_err(),
        );
        assert_eq!(problems.len(), 2, "{problems:?}");
        assert!(problems.contains(&"missing required parameter: sku.name".to_string()));
    }

    #[test]
    fn test_pattern() {
        let spec = ArgSpec::new().param("name", ParamSpec::str().pattern("[a-z][a-z0-9-]{2,62}"));
        assert!(spec.validate(&raw(json!({"name": "pg-main"}))).is_ok());
        let problems = validation_problems(spec.validate(&raw(json!({"name": "PG main"}))).unwrap_err());
        assert!(problems[0].contains("does not match pattern"));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce(ParamType::Str, &json!(5)), Ok(json!("5")));
        assert_eq!(coerce(ParamType::Int, &json!(" 42 ")), Ok(json!(42)));
        assert_eq!(coerce(ParamType::Int, &json!(4.0)), Ok(json!(4)));
        assert!(coerce(ParamType::Int, &json!(4.5)).is_err());
        assert_eq!(coerce(ParamType::Float, &json!("1.5")), Ok(json!(1.5)));
        assert_eq!(coerce(ParamType::Bool, &json!("off")), Ok(json!(false)));
        assert_eq!(coerce(ParamType::Bool, &json!(1)), Ok(json!(true)));
        assert_eq!(coerce(ParamType::List, &json!("a, b")), Ok(json!(["a", "b"])));
        assert_eq!(coerce(ParamType::List, &json!(3)), Ok(json!([3])));
        assert_eq!(
            coerce(ParamType::Dict, &json!("env=prod, team=core")),
            Ok(json!({"env": "prod", "team": "core"}))
        );
        assert_eq!(coerce(ParamType::Dict, &json!("{\"a\": 1}")), Ok(json!({"a": 1})));
        assert!(coerce(ParamType::Dict, &json!("nonsense")).is_err());
        assert!(coerce(ParamType::Str, &json!(["a"])).is_err());
    }

    #[test]
    fn test_list_elements_coerced() {
        let spec = ArgSpec::new().param("zones", ParamSpec::list(ParamType::Str));
        let params = spec.validate(&raw(json!({"zones": [1, 2]}))).unwrap();
        assert_eq!(params.value("zones"), Some(&json!(["1", "2"])));
    }

    #[test]
    fn test_secret_paths() {
        let spec = ArgSpec::new()
            .param("password", ParamSpec::str().no_log())
            .param(
                "credentials",
                ParamSpec::dict().options(ArgSpec::new().param("secret", ParamSpec::str().no_log())),
            );
        assert_eq!(spec.secret_paths(), vec!["credentials.secret", "password"]);
    }

    #[test]
    fn test_lint() {
        let spec = ArgSpec::new()
            .param("a", ParamSpec::str().alias("b").pattern("("))
            .param("b", ParamSpec::str())
            .required_together(["a", "c"]);
        let problems = spec.lint();
        assert_eq!(problems.len(), 3, "{problems:?}");
    }

    #[test]
    fn test_deserialize_from_toml_like_json() {
        let spec: ArgSpec = serde_json::from_value(json!({
            "params": {
                "name": {"type": "str", "required": true},
                "sku": {"type": "str", "choices": ["Basic", "Standard"], "default": "Basic"}
            },
            "required_if": [{"param": "sku", "value": "Standard", "requires": ["name"]}]
        }))
        .unwrap();
        let params = spec.validate(&raw(json!({"name": "x"}))).unwrap();
        assert_eq!(params.str("sku"), Some("Basic"));
    }
}
