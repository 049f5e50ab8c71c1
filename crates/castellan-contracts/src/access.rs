//! Access-control record types.
//!
//! A `Constraint` is a named restriction that may be placed on a resource;
//! absence of a constraint means unrestricted access. A `Permission` is a
//! recorded exemption from a specific constraint for a specific subject on
//! a specific resource, and is only meaningful once the matching constraint
//! has been placed.

use serde::{Deserialize, Serialize};

use crate::agent::SubjectId;

/// Stable identifier for a constraint (e.g. "open", "read", "write").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintId(pub String);

impl ConstraintId {
    /// Construct a constraint id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConstraintId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Stable identifier for a protected object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Construct a resource id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A named restriction that may be placed on a resource.
///
/// Placing a constraint flips the resource's default for that operation
/// from allow to deny until matching permissions are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Stable identifier, referenced by permission records.
    pub id: ConstraintId,
    /// Human-readable description for log output.
    pub description: String,
}

impl Constraint {
    /// Construct a constraint with the given id and description.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ConstraintId::new(id),
            description: description.into(),
        }
    }
}

/// A recorded exemption: `subject` may pass `constraint` on `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub constraint: ConstraintId,
    pub resource: ResourceId,
    pub subject: SubjectId,
}
