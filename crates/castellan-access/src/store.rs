//! The resource-local permission store.
//!
//! A lighter variant of the Administrator for the case where a single
//! object gates its own operations without consulting the system-wide
//! authority — configuration files, templates, handles. Same allow/deny
//! model: no constraint registered means unrestricted access; once a
//! constraint is registered only exempted subjects pass.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use castellan_contracts::{
    access::{Constraint, ConstraintId, ResourceId},
    agent::SubjectId,
};

#[derive(Debug, Clone)]
struct StoreEntry {
    constraint: Constraint,
    exemptions: HashSet<SubjectId>,
}

/// Object-local allow/deny state for one resource.
#[derive(Debug)]
pub struct PermissionStore {
    resource: ResourceId,
    constraints: HashMap<ConstraintId, StoreEntry>,
}

impl PermissionStore {
    /// Create a store gating the named resource, with no constraints.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: ResourceId::new(resource),
            constraints: HashMap::new(),
        }
    }

    /// The resource this store gates.
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// Register `constraint` with an empty exemption set.
    ///
    /// From this point on, `has_permission` denies every subject for this
    /// constraint until exemptions are recorded. Re-registering resets the
    /// exemption set.
    pub fn set_constraint(&mut self, constraint: Constraint) {
        self.constraints.insert(
            constraint.id.clone(),
            StoreEntry {
                constraint,
                exemptions: HashSet::new(),
            },
        );
    }

    /// Exempt `subject` from `constraint`.
    ///
    /// Returns false without any effect if the constraint was never
    /// registered here.
    pub fn set_permission(
        &mut self,
        subject: impl Into<SubjectId>,
        constraint: &ConstraintId,
    ) -> bool {
        match self.constraints.get_mut(constraint) {
            Some(entry) => {
                entry.exemptions.insert(subject.into());
                true
            }
            None => false,
        }
    }

    /// Whether `subject` may pass `constraint` on this resource.
    ///
    /// True if the constraint was never registered, or if the subject is
    /// exempted. Denials are logged with constraint, subject, and resource
    /// names; the caller decides whether to raise.
    pub fn has_permission(
        &self,
        subject: impl Into<SubjectId>,
        constraint: &ConstraintId,
    ) -> bool {
        let subject = subject.into();
        match self.constraints.get(constraint) {
            None => true,
            Some(entry) => {
                let granted = entry.exemptions.contains(&subject);
                if !granted {
                    warn!(
                        constraint = %entry.constraint.id,
                        description = %entry.constraint.description,
                        subject = %subject,
                        resource = %self.resource,
                        "resource-level permission denied"
                    );
                }
                granted
            }
        }
    }
}
