//! State differ - compares desired against observed state field by field

use crate::field::{Field, FieldPath, Record};
use crate::policy::{Compare, FieldRules};
use crate::state::{DesiredState, Ensure, ObservedState, strip_nulls};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One field whose desired value differs from what the provider reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub path: FieldPath,
    /// Observed value, `None` if the field (or the resource) is missing
    pub before: Option<Value>,
    /// Value the field will have after the mutating call
    pub after: Option<Value>,
}

/// Result of comparing desired and observed state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    /// Whether a create, update or delete is required
    pub changed: bool,
    /// Observed state overlaid with every explicit desired field
    pub merged_body: Record,
    /// Explicit fields that differ
    pub changes: Vec<FieldChange>,
    /// Create-only fields that differ on an existing resource
    pub immutable: Vec<FieldPath>,
}

/// Compare desired state with the observed state of a resource
///
/// `observed` is `None` when the resource does not exist. Only fields the
/// caller set explicitly are compared; everything else in the observed record
/// is carried into `merged_body` untouched, so an update never resets fields
/// the caller did not mention.
pub fn diff(
    desired: &DesiredState,
    observed: Option<&ObservedState>,
    rules: &FieldRules,
) -> DiffResult {
    match (desired.ensure(), observed) {
        (Ensure::Absent, None) => DiffResult::default(),
        (Ensure::Absent, Some(observed)) => DiffResult {
            changed: true,
            merged_body: observed.body().clone(),
            ..DiffResult::default()
        },
        (Ensure::Present, None) => {
            let changes = desired
                .explicit()
                .filter_map(|(path, field)| {
                    field.value().map(|value| FieldChange {
                        path: path.clone(),
                        before: None,
                        after: Some(strip_nulls(value)),
                    })
                })
                .collect();
            DiffResult {
                changed: true,
                merged_body: desired.initial_body(),
                changes,
                immutable: Vec::new(),
            }
        }
        (Ensure::Present, Some(observed)) => diff_existing(desired, observed, rules),
    }
}

fn diff_existing(desired: &DesiredState, observed: &ObservedState, rules: &FieldRules) -> DiffResult {
    let mut result = DiffResult {
        merged_body: observed.body().clone(),
        ..DiffResult::default()
    };

    for (path, field) in desired.explicit() {
        let before = observed.get(path);
        let (equal, after) = match field {
            Field::Unset => continue,
            Field::Null => (before.is_none_or(Value::is_null), Value::Null),
            Field::Set(value) => {
                let scope = Scope::Absolute {
                    rules,
                    path: path.clone(),
                };
                compare_value(value, before, rules.compare_for(path), &scope)
            }
        };

        if equal {
            // Write-only values still need to reach the provider if an update happens
            if matches!(rules.compare_for(path), Compare::Ignore) {
                path.assign(&mut result.merged_body, after);
            }
            continue;
        }

        log::trace!("field {path} differs");
        if rules.is_create_only(path) {
            result.immutable.push(path.clone());
        }
        result.changes.push(FieldChange {
            path: path.clone(),
            before: before.cloned(),
            after: Some(after.clone()),
        });
        path.assign(&mut result.merged_body, after);
    }

    result.changed = !result.changes.is_empty();
    result
}

/// Where child rules are looked up while recursing into objects
enum Scope<'a> {
    /// Rules keyed by full paths from the record root
    Absolute { rules: &'a FieldRules, path: FieldPath },
    /// Rules keyed relative to the object being compared
    Relative { rules: &'a FieldRules, path: FieldPath },
}

impl Scope<'_> {
    fn child(&self, key: &str) -> (Compare, Scope<'_>) {
        match self {
            Scope::Absolute { rules, path } => {
                let child = path.child(key);
                (
                    rules.compare_for(&child).clone(),
                    Scope::Absolute {
                        rules: *rules,
                        path: child,
                    },
                )
            }
            Scope::Relative { rules, path } => {
                let child = path.child(key);
                (
                    rules.compare_for(&child).clone(),
                    Scope::Relative {
                        rules: *rules,
                        path: child,
                    },
                )
            }
        }
    }
}

/// Compare one desired value, returning `(equal, merged value)`
fn compare_value(
    desired: &Value,
    observed: Option<&Value>,
    policy: &Compare,
    scope: &Scope<'_>,
) -> (bool, Value) {
    let observed = observed.filter(|v| !v.is_null());
    match policy {
        Compare::Ignore => (true, strip_nulls(desired)),
        Compare::Exact => (exact_equal(desired, observed), strip_nulls(desired)),
        Compare::IgnoreCase => {
            let equal = match (desired, observed) {
                (Value::String(d), Some(Value::String(o))) => d.eq_ignore_ascii_case(o),
                _ => exact_equal(desired, observed),
            };
            (equal, desired.clone())
        }
        Compare::Set => {
            let equal = match (desired, observed) {
                (Value::Array(d), Some(Value::Array(o))) => set_equal(d, o),
                _ => exact_equal(desired, observed),
            };
            (equal, desired.clone())
        }
        Compare::Sequence => (exact_equal(desired, observed), desired.clone()),
        Compare::Nested(rules) => {
            let scope = Scope::Relative {
                rules,
                path: FieldPath::default(),
            };
            compare_object(desired, observed, &scope)
        }
        Compare::Keyed { key, rules } => match (desired, observed) {
            (Value::Array(d), Some(Value::Array(o))) => compare_keyed(d, o, key, rules),
            _ => (exact_equal(desired, observed), strip_nulls(desired)),
        },
        Compare::Auto => match desired {
            // An explicit `{}` clears the map rather than inheriting every key
            Value::Object(wanted) if wanted.is_empty() => {
                (exact_equal(desired, observed), Value::Object(Map::new()))
            }
            Value::Object(_) => compare_object(desired, observed, scope),
            _ => (exact_equal(desired, observed), desired.clone()),
        },
    }
}

/// Recursive overlay compare; null or missing desired keys inherit
fn compare_object(desired: &Value, observed: Option<&Value>, scope: &Scope<'_>) -> (bool, Value) {
    let Value::Object(wanted) = desired else {
        return (exact_equal(desired, observed), desired.clone());
    };
    let Some(Value::Object(current)) = observed else {
        let equal = wanted.values().all(Value::is_null) && observed.is_none();
        return (equal, strip_nulls(desired));
    };

    let mut merged: Map<String, Value> = current.clone();
    let mut equal = true;
    for (key, value) in wanted {
        if value.is_null() {
            continue;
        }
        let (policy, child_scope) = scope.child(key);
        let (child_equal, child_merged) =
            compare_value(value, current.get(key), &policy, &child_scope);
        equal &= child_equal;
        merged.insert(key.clone(), child_merged);
    }
    (equal, Value::Object(merged))
}

/// Match object elements by `key` and overlay each onto its observed twin
///
/// Equal when both sides hold the same keys and every desired element matches
/// its counterpart under `rules`. The merged array keeps the desired order, and
/// observed-only fields of a matched element (ids, etags) are carried forward.
fn compare_keyed(desired: &[Value], observed: &[Value], key: &str, rules: &FieldRules) -> (bool, Value) {
    let scope = Scope::Relative {
        rules,
        path: FieldPath::default(),
    };
    let key_of = |value: &Value| value.get(key).filter(|k| !k.is_null()).cloned();

    let mut equal = desired.len() == observed.len();
    let mut used = vec![false; observed.len()];
    let mut merged = Vec::with_capacity(desired.len());
    for element in desired {
        let twin = key_of(element).and_then(|wanted| {
            observed.iter().enumerate().position(|(i, candidate)| {
                !used[i] && key_of(candidate).is_some_and(|k| values_equal(&k, &wanted))
            })
        });
        match twin {
            Some(i) => {
                used[i] = true;
                let (element_equal, element_merged) =
                    compare_object(element, Some(&observed[i]), &scope);
                equal &= element_equal;
                merged.push(element_merged);
            }
            None => {
                equal = false;
                merged.push(strip_nulls(element));
            }
        }
    }
    equal &= used.iter().all(|u| *u);
    (equal, Value::Array(merged))
}

/// Equality with numeric normalization; empty collections match a missing value
fn exact_equal(desired: &Value, observed: Option<&Value>) -> bool {
    match observed {
        Some(observed) => values_equal(desired, observed),
        None => is_empty_collection(desired),
    }
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Structural equality where `1` and `1.0` are the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

/// Integers compare exactly; only a float on either side falls back to `f64`
fn numbers_equal(x: &serde_json::Number, y: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    if (x.is_f64() || y.is_f64())
        && let (Some(x), Some(y)) = (x.as_f64(), y.as_f64())
    {
        return (x - y).abs() < f64::EPSILON;
    }
    x == y
}

/// Same elements with the same multiplicity, in any order
fn set_equal(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match (0..b.len()).find(|&i| !used[i] && values_equal(x, &b[i])) {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observed(value: Value) -> ObservedState {
        ObservedState::from_value(value)
    }

    #[test]
    fn test_create_when_missing() {
        let desired = DesiredState::present()
            .set("name", json!("x"))
            .set("sku", json!("Standard"));
        let result = diff(&desired, None, &FieldRules::new());
        assert!(result.changed);
        assert_eq!(
            Value::Object(result.merged_body),
            json!({"name": "x", "sku": "Standard"})
        );
        assert_eq!(result.changes.len(), 2);
    }

    #[test]
    fn test_no_change_when_explicit_fields_match() {
        let desired = DesiredState::present()
            .set("name", json!("x"))
            .set("sku", json!("Standard"));
        let current = observed(json!({"name": "x", "sku": "Standard", "id": "/x"}));
        let result = diff(&desired, Some(&current), &FieldRules::new());
        assert!(!result.changed);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_update_carries_unset_fields_forward() {
        let desired = DesiredState::present()
            .set("name", json!("x"))
            .set("sku", json!("Premium"));
        let current = observed(json!({"name": "x", "sku": "Standard", "id": "/x"}));
        let result = diff(&desired, Some(&current), &FieldRules::new());
        assert!(result.changed);
        assert_eq!(
            Value::Object(result.merged_body),
            json!({"name": "x", "sku": "Premium", "id": "/x"})
        );
        assert_eq!(
            result.changes,
            vec![FieldChange {
                path: "sku".into(),
                before: Some(json!("Standard")),
                after: Some(json!("Premium")),
            }]
        );
    }

    #[test]
    fn test_absent_existing_is_change() {
        let current = observed(json!({"name": "x"}));
        assert!(diff(&DesiredState::absent(), Some(&current), &FieldRules::new()).changed);
        assert!(!diff(&DesiredState::absent(), None, &FieldRules::new()).changed);
    }

    #[test]
    fn test_set_vs_sequence() {
        let desired = DesiredState::present().set("tags", json!(["a", "b"]));
        let current = observed(json!({"tags": ["b", "a"]}));

        let as_set = FieldRules::new().with("tags", Compare::Set);
        assert!(!diff(&desired, Some(&current), &as_set).changed);

        let as_sequence = FieldRules::new().with("tags", Compare::Sequence);
        assert!(diff(&desired, Some(&current), &as_sequence).changed);
    }

    #[test]
    fn test_set_detects_missing_element() {
        let desired = DesiredState::present().set("ips", json!(["10.0.0.1", "10.0.0.2"]));
        let current = observed(json!({"ips": ["10.0.0.1"]}));
        let rules = FieldRules::new().with("ips", Compare::Set);
        assert!(diff(&desired, Some(&current), &rules).changed);
    }

    #[test]
    fn test_ignore_case() {
        let desired = DesiredState::present().set("location", json!("WestEurope"));
        let current = observed(json!({"location": "westeurope"}));
        let rules = FieldRules::new().with("location", Compare::IgnoreCase);
        assert!(!diff(&desired, Some(&current), &rules).changed);
        assert!(diff(&desired, Some(&current), &FieldRules::new()).changed);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let desired = DesiredState::present().set("size", json!(128));
        let current = observed(json!({"size": 128.0}));
        assert!(!diff(&desired, Some(&current), &FieldRules::new()).changed);
    }

    #[test]
    fn test_nested_inherits_missing_keys() {
        let desired = DesiredState::present()
            .set("properties", json!({"diskSizeGB": 64, "tier": null}));
        let current = observed(json!({
            "properties": {"diskSizeGB": 32, "tier": "P4", "zone": "1"}
        }));
        let result = diff(&desired, Some(&current), &FieldRules::new());
        assert!(result.changed);
        assert_eq!(
            Value::Object(result.merged_body),
            json!({"properties": {"diskSizeGB": 64, "tier": "P4", "zone": "1"}})
        );
    }

    #[test]
    fn test_nested_uses_child_rules() {
        let desired = DesiredState::present()
            .set("properties", json!({"zones": ["2", "1"]}));
        let current = observed(json!({"properties": {"zones": ["1", "2"]}}));
        let rules = FieldRules::new().with("properties.zones", Compare::Set);
        assert!(!diff(&desired, Some(&current), &rules).changed);
    }

    #[test]
    fn test_tags_append_vs_replace() {
        let desired = DesiredState::present().set("tags", json!({"env": "prod"}));
        let current = observed(json!({"tags": {"env": "prod", "owner": "ops"}}));

        let append = FieldRules::new().with("tags", Compare::tags(true));
        let result = diff(&desired, Some(&current), &append);
        assert!(!result.changed);

        let replace = FieldRules::new().with("tags", Compare::tags(false));
        let result = diff(&desired, Some(&current), &replace);
        assert!(result.changed);
        assert_eq!(result.merged_body["tags"], json!({"env": "prod"}));
    }

    #[test]
    fn test_explicit_null_clears() {
        let desired = DesiredState::present().clear("description");
        let current = observed(json!({"description": "old", "id": "/x"}));
        let result = diff(&desired, Some(&current), &FieldRules::new());
        assert!(result.changed);
        assert_eq!(result.merged_body["description"], Value::Null);

        let already_clear = observed(json!({"id": "/x"}));
        assert!(!diff(&desired, Some(&already_clear), &FieldRules::new()).changed);
    }

    #[test]
    fn test_empty_collection_is_a_real_value() {
        let desired = DesiredState::present().set("ipRules", json!([]));
        let populated = observed(json!({"ipRules": ["1.2.3.4"]}));
        let rules = FieldRules::new().with("ipRules", Compare::Set);
        let result = diff(&desired, Some(&populated), &rules);
        assert!(result.changed);
        assert_eq!(result.merged_body["ipRules"], json!([]));

        let missing = observed(json!({}));
        assert!(!diff(&desired, Some(&missing), &rules).changed);
    }

    #[test]
    fn test_empty_map_clears_under_auto() {
        let desired = DesiredState::present().set("tags", json!({}));
        let tagged = observed(json!({"tags": {"env": "prod"}}));
        let result = diff(&desired, Some(&tagged), &FieldRules::new());
        assert!(result.changed);
        assert_eq!(result.merged_body["tags"], json!({}));

        let untagged = observed(json!({"tags": {}}));
        assert!(!diff(&desired, Some(&untagged), &FieldRules::new()).changed);

        let append = FieldRules::new().with("tags", Compare::tags(true));
        assert!(!diff(&desired, Some(&tagged), &append).changed);
    }

    #[test]
    fn test_keyed_matches_elements_by_name() {
        let rules = FieldRules::new().with("links", Compare::keyed("name"));
        let desired = DesiredState::present().set(
            "links",
            json!([
                {"name": "b", "properties": {"ipAddress": "10.0.0.2"}},
                {"name": "a", "properties": {"ipAddress": "10.0.0.1"}}
            ]),
        );
        let current = observed(json!({"links": [
            {"name": "a", "id": "/links/a", "etag": "1",
             "properties": {"ipAddress": "10.0.0.1", "provisioningState": "Succeeded"}},
            {"name": "b", "id": "/links/b", "etag": "2",
             "properties": {"ipAddress": "10.0.0.2", "provisioningState": "Succeeded"}}
        ]}));
        assert!(!diff(&desired, Some(&current), &rules).changed);

        let moved = DesiredState::present().set(
            "links",
            json!([{"name": "a", "properties": {"ipAddress": "10.9.9.9"}}]),
        );
        let result = diff(&moved, Some(&current), &rules);
        assert!(result.changed);
        assert_eq!(
            result.merged_body["links"],
            json!([{"name": "a", "id": "/links/a", "etag": "1",
                    "properties": {"ipAddress": "10.9.9.9", "provisioningState": "Succeeded"}}])
        );
    }

    #[test]
    fn test_set_counts_duplicates() {
        let rules = FieldRules::new().with("ips", Compare::Set);
        let desired = DesiredState::present().set("ips", json!(["a", "a", "b"]));
        assert!(diff(&desired, Some(&observed(json!({"ips": ["a", "b"]}))), &rules).changed);
        assert!(diff(&desired, Some(&observed(json!({"ips": ["a", "b", "b"]}))), &rules).changed);
        assert!(!diff(&desired, Some(&observed(json!({"ips": ["b", "a", "a"]}))), &rules).changed);
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        assert!(!values_equal(&json!(9_007_199_254_740_993_u64), &json!(9_007_199_254_740_992_u64)));
        assert!(!values_equal(&json!(i64::MIN + 1), &json!(i64::MIN)));
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(values_equal(&json!(1), &json!(1.0)));
    }

    #[test]
    fn test_unset_field_not_compared() {
        let desired = DesiredState::present().set("name", json!("x"));
        let current = observed(json!({"name": "x", "sku": "Standard"}));
        let result = diff(&desired, Some(&current), &FieldRules::new());
        assert!(!result.changed);
        assert_eq!(result.merged_body["sku"], json!("Standard"));
    }

    #[test]
    fn test_ignored_field_written_but_not_compared() {
        let desired = DesiredState::present()
            .set("properties.administratorLoginPassword", json!("s3cret"))
            .set("properties.version", json!("12"));
        let current = observed(json!({"properties": {"version": "11"}}));
        let rules = FieldRules::new().with("properties.administratorLoginPassword", Compare::Ignore);
        let result = diff(&desired, Some(&current), &rules);
        assert!(result.changed);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(
            result.merged_body["properties"]["administratorLoginPassword"],
            json!("s3cret")
        );

        let same_version = observed(json!({"properties": {"version": "12"}}));
        assert!(!diff(&desired, Some(&same_version), &rules).changed);
    }

    #[test]
    fn test_create_only_reported() {
        let desired = DesiredState::present().set("location", json!("eastus"));
        let current = observed(json!({"location": "westeurope"}));
        let rules = FieldRules::new().create_only("location");
        let result = diff(&desired, Some(&current), &rules);
        assert_eq!(result.immutable, vec![FieldPath::parse("location")]);
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }
}
