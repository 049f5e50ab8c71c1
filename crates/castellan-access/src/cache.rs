//! The constraint/permission cache behind the Administrator.
//!
//! Shape: `constraint_id → { constraint, resources: resource_id →
//! { authority, permissions: subject_id → granted } }`. Populated lazily
//! on first lookup and never invalidated within a process — it is a
//! read-mostly, append-only cache for the duration of the request.

use std::collections::HashMap;

use castellan_contracts::{
    access::{Constraint, ConstraintId, ResourceId},
    agent::SubjectId,
};

/// The answer to a cache lookup, consumed by the Administrator.
///
/// `cached == false` means the constraint id has never been seen and the
/// persistence fetch must run. Once `cached` is true, `constraint_exists`
/// says whether the constraint was actually placed on the queried
/// resource, and `permission_exists` whether the subject holds a recorded
/// exemption there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLookup {
    pub cached: bool,
    pub constraint_exists: bool,
    pub permission_exists: bool,
}

/// Per-resource slot under one cached constraint.
#[derive(Debug, Clone)]
struct ResourceEntry {
    /// The authority that placed the constraint on this resource.
    authority: SubjectId,
    /// Recorded exemptions for this (constraint, resource) pair.
    permissions: HashMap<SubjectId, bool>,
}

/// Per-constraint slot: descriptive info plus the resources it was placed on.
#[derive(Debug, Clone)]
struct ConstraintEntry {
    /// Descriptive record, filled in when known.
    constraint: Option<Constraint>,
    resources: HashMap<ResourceId, ResourceEntry>,
}

/// The append-only constraint/permission cache.
#[derive(Debug, Default)]
pub struct AccessCache {
    constraints: HashMap<ConstraintId, ConstraintEntry>,
}

impl AccessCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the `(constraint, resource, subject)` triple.
    pub fn check_constraint_settings(
        &self,
        constraint: &ConstraintId,
        resource: &ResourceId,
        subject: &SubjectId,
    ) -> CacheLookup {
        match self.constraints.get(constraint) {
            None => CacheLookup {
                cached: false,
                constraint_exists: false,
                permission_exists: false,
            },
            Some(entry) => match entry.resources.get(resource) {
                None => CacheLookup {
                    cached: true,
                    constraint_exists: false,
                    permission_exists: false,
                },
                Some(res) => CacheLookup {
                    cached: true,
                    constraint_exists: true,
                    permission_exists: res.permissions.get(subject).copied().unwrap_or(false),
                },
            },
        }
    }

    /// Ensure a cache slot exists for `constraint`, without placing it on
    /// any resource. Idempotent; an existing slot is left untouched.
    pub fn seed_constraint(&mut self, constraint: &ConstraintId) {
        self.constraints
            .entry(constraint.clone())
            .or_insert_with(|| ConstraintEntry {
                constraint: None,
                resources: HashMap::new(),
            });
    }

    /// Record that `authority` placed `constraint` on `resource`.
    ///
    /// Idempotent: re-recording leaves existing exemptions intact.
    pub fn record_constraint(
        &mut self,
        authority: impl Into<SubjectId>,
        constraint: &ConstraintId,
        resource: &ResourceId,
    ) {
        let authority = authority.into();
        let entry = self
            .constraints
            .entry(constraint.clone())
            .or_insert_with(|| ConstraintEntry {
                constraint: None,
                resources: HashMap::new(),
            });
        entry
            .resources
            .entry(resource.clone())
            .or_insert_with(|| ResourceEntry {
                authority,
                permissions: HashMap::new(),
            });
    }

    /// Attach descriptive info to a cached constraint slot.
    pub fn describe_constraint(&mut self, constraint: Constraint) {
        let entry = self
            .constraints
            .entry(constraint.id.clone())
            .or_insert_with(|| ConstraintEntry {
                constraint: None,
                resources: HashMap::new(),
            });
        entry.constraint = Some(constraint);
    }

    /// Record an exemption for `subject` under `(constraint, resource)`.
    ///
    /// Returns false without recording anything if the constraint was
    /// never placed on the resource — exemptions cannot be granted against
    /// nonexistent constraints.
    pub fn record_permission(
        &mut self,
        constraint: &ConstraintId,
        resource: &ResourceId,
        subject: impl Into<SubjectId>,
    ) -> bool {
        match self
            .constraints
            .get_mut(constraint)
            .and_then(|entry| entry.resources.get_mut(resource))
        {
            Some(res) => {
                res.permissions.insert(subject.into(), true);
                true
            }
            None => false,
        }
    }

    /// Descriptive info attached to a cached constraint, if any.
    pub fn constraint_info(&self, constraint: &ConstraintId) -> Option<&Constraint> {
        self.constraints
            .get(constraint)
            .and_then(|entry| entry.constraint.as_ref())
    }

    /// The authority that placed `constraint` on `resource`, if recorded.
    pub fn authority_for(
        &self,
        constraint: &ConstraintId,
        resource: &ResourceId,
    ) -> Option<&SubjectId> {
        self.constraints
            .get(constraint)
            .and_then(|entry| entry.resources.get(resource))
            .map(|res| &res.authority)
    }
}
