//! Resource identity - the immutable address of a managed resource

use serde::{Deserialize, Serialize};
use std::fmt;

/// The tuple of fields that uniquely addresses a resource
///
/// An identity is built once from validated input and never mutated
/// afterwards. Changing any segment means addressing a different resource,
/// so there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    kind: String,
    segments: Vec<(String, String)>,
}

impl ResourceIdentity {
    /// Start building an identity for a resource kind
    pub fn builder(kind: impl Into<String>) -> IdentityBuilder {
        IdentityBuilder {
            kind: kind.into(),
            segments: Vec::new(),
        }
    }

    /// Resource kind (e.g. "managed_disk")
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Ordered `(key, value)` segments, outermost scope first
    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    /// Look up a segment value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The innermost segment value, which is the resource's own name
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", |(_, v)| v.as_str())
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.kind)?;
        for (i, (_, value)) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(value)?;
        }
        Ok(())
    }
}

/// Builder for [`ResourceIdentity`]
#[derive(Debug)]
pub struct IdentityBuilder {
    kind: String,
    segments: Vec<(String, String)>,
}

impl IdentityBuilder {
    /// Append a segment
    pub fn segment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.segments.push((key.into(), value.into()));
        self
    }

    /// Finish the identity
    pub fn build(self) -> ResourceIdentity {
        ResourceIdentity {
            kind: self.kind,
            segments: self.segments,
        }
    }
}
