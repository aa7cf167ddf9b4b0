//! Per-field comparison policies

use crate::field::FieldPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a desired field is compared with its observed value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compare {
    /// Objects recurse, arrays are sequences, scalars compare exactly
    #[default]
    Auto,
    /// Whole-value equality; objects are replaced wholesale
    Exact,
    /// Strings compare ignoring ASCII case (enum-like values)
    IgnoreCase,
    /// Arrays compare as multisets, ignoring order
    Set,
    /// Arrays compare element by element, in order
    Sequence,
    /// Objects compare key by key; null or missing desired keys inherit
    Nested(FieldRules),
    /// Arrays of objects matched by the value of `key`, order ignored
    ///
    /// Each matched pair compares like [`Compare::Nested`], so fields only the
    /// provider reports (ids, etags, provisioning state) do not count as drift.
    Keyed {
        key: String,
        #[serde(default)]
        rules: FieldRules,
    },
    /// Never compared, but still written (write-only secrets)
    Ignore,
}

impl Compare {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Exact => "exact",
            Self::IgnoreCase => "ignore_case",
            Self::Set => "set",
            Self::Sequence => "sequence",
            Self::Nested(_) => "nested",
            Self::Keyed { .. } => "keyed",
            Self::Ignore => "ignore",
        }
    }

    /// Policy for object arrays identified by one key field
    pub fn keyed(key: impl Into<String>) -> Self {
        Self::Keyed {
            key: key.into(),
            rules: FieldRules::new(),
        }
    }

    /// Policy for tag-like maps: merge into existing keys or replace them all
    pub fn tags(append: bool) -> Self {
        if append {
            Self::Nested(FieldRules::new())
        } else {
            Self::Exact
        }
    }
}

/// Comparison rule for one field path
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default)]
    pub compare: Compare,
    /// Can only be chosen at creation time
    #[serde(default)]
    pub create_only: bool,
}

/// Rules keyed by field path; paths without a rule use [`Compare::Auto`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRules(BTreeMap<FieldPath, FieldRule>);

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the comparison policy for a path
    pub fn with(mut self, path: impl Into<FieldPath>, compare: Compare) -> Self {
        self.0.entry(path.into()).or_default().compare = compare;
        self
    }

    /// Mark a path as settable only on create
    pub fn create_only(mut self, path: impl Into<FieldPath>) -> Self {
        self.0.entry(path.into()).or_default().create_only = true;
        self
    }

    /// Replace the policy of a path in place
    pub fn set_compare(&mut self, path: FieldPath, compare: Compare) {
        self.0.entry(path).or_default().compare = compare;
    }

    /// Rule for a path, if one was declared
    pub fn get(&self, path: &FieldPath) -> Option<&FieldRule> {
        self.0.get(path)
    }

    /// Comparison policy for a path
    pub fn compare_for(&self, path: &FieldPath) -> &Compare {
        static AUTO: Compare = Compare::Auto;
        self.0.get(path).map_or(&AUTO, |rule| &rule.compare)
    }

    pub fn is_create_only(&self, path: &FieldPath) -> bool {
        self.0.get(path).is_some_and(|rule| rule.create_only)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &FieldRule)> {
        self.0.iter()
    }
}
