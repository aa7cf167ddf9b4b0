//! Desired and observed resource state

use crate::field::{Field, FieldPath, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Whether the resource should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl Ensure {
    /// Parse the conventional `state` parameter value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// What the caller wants a resource to look like
///
/// Built once per invocation from validated input and passed explicitly
/// through the reconciler. Only explicit fields take part in diffing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesiredState {
    ensure: Ensure,
    fields: BTreeMap<FieldPath, Field>,
}

impl DesiredState {
    /// A desired state for a resource that should exist
    pub fn present() -> Self {
        Self::default()
    }

    /// A desired state for a resource that should not exist
    pub fn absent() -> Self {
        Self {
            ensure: Ensure::Absent,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    /// Set a field to an explicit value
    pub fn set(self, path: impl Into<FieldPath>, value: Value) -> Self {
        self.field(path, Field::from_value(value))
    }

    /// Explicitly clear a field
    pub fn clear(self, path: impl Into<FieldPath>) -> Self {
        self.field(path, Field::Null)
    }

    /// Record a tri-state field; `Unset` entries are not stored
    pub fn field(mut self, path: impl Into<FieldPath>, field: Field) -> Self {
        let path = path.into();
        if field.is_explicit() {
            self.fields.insert(path, field);
        } else {
            self.fields.remove(&path);
        }
        self
    }

    pub fn ensure(&self) -> Ensure {
        self.ensure
    }

    /// Look up a field; anything not recorded is `Unset`
    pub fn get(&self, path: &FieldPath) -> &Field {
        self.fields.get(path).unwrap_or(&Field::Unset)
    }

    /// Explicit fields in path order
    pub fn explicit(&self) -> impl Iterator<Item = (&FieldPath, &Field)> {
        self.fields.iter()
    }

    /// Body built only from explicit values, used when nothing exists yet
    ///
    /// Nulls are dropped: there is nothing to clear on a new resource.
    pub fn initial_body(&self) -> Record {
        let mut body = Record::new();
        for (path, field) in &self.fields {
            if let Field::Set(value) = field {
                path.assign(&mut body, strip_nulls(value));
            }
        }
        body
    }
}

/// Remove null members from nested objects
pub(crate) fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// What the provider reports for an existing resource
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedState(Record);

impl ObservedState {
    pub fn new(body: Record) -> Self {
        Self(body)
    }

    /// Build from any JSON value; non-objects become an empty record
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self(Record::new()),
        }
    }

    pub fn body(&self) -> &Record {
        &self.0
    }

    pub fn into_body(self) -> Record {
        self.0
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup(&self.0)
    }
}
