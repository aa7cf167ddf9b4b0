//! Tri-state fields and dotted paths into JSON records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A resource body: a JSON object
pub type Record = Map<String, Value>;

/// One desired field
///
/// Optional fields need three states, not two: leaving a field alone is
/// different from clearing it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Not specified; the current value is kept
    #[default]
    Unset,
    /// Explicitly cleared
    Null,
    /// Explicitly set
    Set(Value),
}

impl Field {
    /// Build from an input value, mapping JSON null to [`Field::Null`]
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            Self::Null
        } else {
            Self::Set(value)
        }
    }

    /// Whether the caller said anything about this field
    pub fn is_explicit(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// The explicit value, if set
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// A dotted path into a record, e.g. `properties.diskSizeGB`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted path; empty segments are dropped
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extend the path by one key
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_string());
        Self(segments)
    }

    /// Whether `self` equals `other` or is an ancestor of it
    pub fn contains(&self, other: &FieldPath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// The remainder of `self` below `ancestor`
    pub fn relative_to(&self, ancestor: &FieldPath) -> Option<FieldPath> {
        ancestor
            .contains(self)
            .then(|| Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Read the value at this path
    pub fn lookup<'a>(&self, record: &'a Record) -> Option<&'a Value> {
        let (first, rest) = self.0.split_first()?;
        let mut current = record.get(first)?;
        for key in rest {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }

    /// Write a value at this path, creating intermediate objects
    ///
    /// A non-object value sitting on an intermediate segment is replaced.
    pub fn assign(&self, record: &mut Record, value: Value) {
        let Some((last, parents)) = self.0.split_last() else {
            return;
        };
        let mut current = record;
        for key in parents {
            let slot = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.clone(), value);
    }

    /// Keep only this path from a record (used for projections)
    pub fn project(&self, source: &Record, target: &mut Record) {
        if let Some(value) = self.lookup(source) {
            self.assign(target, value.clone());
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}
