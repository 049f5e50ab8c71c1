//! The Administrator: the system-wide access-control authority.
//!
//! Resolves "does subject X have permission Y on resource Z" against an
//! in-memory cache, falling back to the database — reached as `DbQuery`
//! commands through the command chain — on first miss. The engine is thus
//! both a consumer of the command bus and a policy layer over it.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use castellan_chain::CommandChain;
use castellan_contracts::{
    access::{Constraint, ConstraintId, Permission, ResourceId},
    agent::{Agent, AgentKind, SubjectId},
    command::{Command, CommandBody},
    error::{CastellanError, CastellanResult},
};

use crate::cache::AccessCache;
use crate::roles::RoleKind;

/// The statement fetching all constraints placed on `resource`.
///
/// Expected row shape: `{ constraint_id, authority }`.
pub fn constraints_statement(resource: &ResourceId) -> String {
    format!(
        "SELECT constraint_id, authority FROM resource_constraints WHERE resource_id = '{}'",
        resource
    )
}

/// The statement fetching all permissions granted on `resource`.
///
/// Expected row shape: `{ constraint_id, subject_id }`.
pub fn permissions_statement(resource: &ResourceId) -> String {
    format!(
        "SELECT constraint_id, subject_id FROM resource_permissions WHERE resource_id = '{}'",
        resource
    )
}

/// The statement fetching the stored roles of one agent.
///
/// Expected row shape: `{ role }`.
pub fn roles_statement(agent_id: &SubjectId) -> String {
    format!(
        "SELECT role FROM agent_roles WHERE agent_id = '{}'",
        agent_id
    )
}

struct AdminState {
    cache: AccessCache,
    /// Session-lifetime role cache, keyed by agent id.
    roles: std::collections::HashMap<SubjectId, Vec<RoleKind>>,
}

/// The access-control authority.
///
/// One Administrator per `AppContext`; its cache grows monotonically and
/// is never invalidated — a persistent server must construct a fresh
/// context per logical request rather than share one across requests.
pub struct Administrator {
    chain: Arc<CommandChain>,
    /// Invoker identity for internally-issued commands.
    system: Agent,
    state: Mutex<AdminState>,
}

impl Administrator {
    /// Create an authority dispatching its queries through `chain` on
    /// behalf of `system`.
    pub fn new(chain: Arc<CommandChain>, system: Agent) -> Self {
        Self {
            chain,
            system,
            state: Mutex::new(AdminState {
                cache: AccessCache::new(),
                roles: std::collections::HashMap::new(),
            }),
        }
    }

    /// Whether `subject` may pass `constraint` on `resource`.
    ///
    /// Never errors: a denial is an ordinary `false`, and a collaborator
    /// failure during the fetch is logged and folded as zero rows. A
    /// resource with no constraint placed on it allows every subject.
    ///
    /// At most one fetch pair (constraints + permissions) is ever issued
    /// per constraint id; subsequent calls are served from the cache.
    pub fn has_permission(
        &self,
        authority: impl Into<SubjectId>,
        subject: impl Into<SubjectId>,
        resource: &ResourceId,
        constraint: &ConstraintId,
    ) -> bool {
        let authority = authority.into();
        let subject = subject.into();

        {
            let state = self.state.lock().expect("administrator state lock poisoned");
            let lookup = state
                .cache
                .check_constraint_settings(constraint, resource, &subject);
            if lookup.cached {
                return !lookup.constraint_exists || lookup.permission_exists;
            }
        }

        debug!(
            constraint = %constraint,
            resource = %resource,
            subject = %subject,
            "permission cache miss, fetching constraint settings"
        );

        // Fetch outside the lock; both results fold into the cache below.
        let constraint_rows = self.fetch_rows(&constraints_statement(resource));
        let permission_rows = self.fetch_rows(&permissions_statement(resource));

        let mut state = self.state.lock().expect("administrator state lock poisoned");
        state.cache.seed_constraint(constraint);
        for row in &constraint_rows {
            let (Some(cid), Some(auth)) = (row_str(row, "constraint_id"), row_str(row, "authority"))
            else {
                warn!(resource = %resource, "malformed constraint row skipped");
                continue;
            };
            state
                .cache
                .record_constraint(auth, &ConstraintId::new(cid), resource);
        }
        for row in &permission_rows {
            let (Some(cid), Some(sid)) =
                (row_str(row, "constraint_id"), row_str(row, "subject_id"))
            else {
                warn!(resource = %resource, "malformed permission row skipped");
                continue;
            };
            let permission = Permission {
                constraint: ConstraintId::new(cid),
                resource: resource.clone(),
                subject: SubjectId::from(sid),
            };
            if !state.cache.record_permission(
                &permission.constraint,
                &permission.resource,
                permission.subject.clone(),
            ) {
                warn!(
                    constraint = %permission.constraint,
                    resource = %permission.resource,
                    subject = %permission.subject,
                    "stored permission references a constraint never placed on the resource"
                );
            }
        }

        let lookup = state
            .cache
            .check_constraint_settings(constraint, resource, &subject);
        let granted = !lookup.constraint_exists || lookup.permission_exists;
        if !granted {
            debug!(
                constraint = %constraint,
                resource = %resource,
                subject = %subject,
                authority = %authority,
                "permission resolved to deny"
            );
        }
        granted
    }

    /// Record that `authority` placed `constraint` on `resource`.
    ///
    /// Idempotent. Flips the resource's default for this constraint from
    /// allow to deny until matching permissions are recorded. The
    /// constraint's descriptive info is kept for denial messages.
    pub fn set_constraint(
        &self,
        authority: impl Into<SubjectId>,
        constraint: &Constraint,
        resource: &ResourceId,
    ) {
        let mut state = self.state.lock().expect("administrator state lock poisoned");
        state
            .cache
            .record_constraint(authority, &constraint.id, resource);
        state.cache.describe_constraint(constraint.clone());
    }

    /// Record an exemption for `subject` under `(constraint, resource)`.
    ///
    /// Returns false without any effect if the constraint was never set on
    /// the resource.
    pub fn set_permission(
        &self,
        _authority: impl Into<SubjectId>,
        constraint: &ConstraintId,
        resource: &ResourceId,
        subject: impl Into<SubjectId>,
    ) -> bool {
        let mut state = self.state.lock().expect("administrator state lock poisoned");
        state.cache.record_permission(constraint, resource, subject)
    }

    /// The raising wrapper over `has_permission`.
    ///
    /// Converts a denial into a typed `AccessDenied` naming subject,
    /// resource, constraint, and the refusing authority.
    pub fn authorize(
        &self,
        authority: impl Into<SubjectId>,
        subject: impl Into<SubjectId>,
        resource: &ResourceId,
        constraint: &ConstraintId,
    ) -> CastellanResult<()> {
        let authority = authority.into();
        let subject = subject.into();
        if self.has_permission(authority.clone(), subject.clone(), resource, constraint) {
            return Ok(());
        }
        let (refusing, description) = {
            let state = self.state.lock().expect("administrator state lock poisoned");
            (
                state
                    .cache
                    .authority_for(constraint, resource)
                    .cloned()
                    .unwrap_or(authority),
                state
                    .cache
                    .constraint_info(constraint)
                    .map(|info| info.description.clone())
                    .unwrap_or_default(),
            )
        };
        warn!(
            subject = %subject,
            resource = %resource,
            constraint = %constraint,
            description = %description,
            authority = %refusing,
            "authorization denied"
        );
        Err(CastellanError::AccessDenied {
            subject: subject.to_string(),
            resource: resource.to_string(),
            constraint: constraint.to_string(),
            authority: refusing.to_string(),
        })
    }

    /// Resolve the active roles of `agent`.
    ///
    /// User agents load their roles from storage once per session and are
    /// served from the cache thereafter; zero stored rows assigns the
    /// anonymous role. A role that fails to load is logged and skipped
    /// rather than aborting resolution of the remaining roles. Non-user
    /// agents resolve to the built-in admin role without touching storage.
    pub fn agent_roles(&self, agent: &Agent) -> Vec<RoleKind> {
        if agent.kind != AgentKind::User {
            return vec![RoleKind::Admin];
        }

        let subject = SubjectId::from(agent);
        {
            let state = self.state.lock().expect("administrator state lock poisoned");
            if let Some(roles) = state.roles.get(&subject) {
                return roles.clone();
            }
        }

        let rows = self.fetch_rows(&roles_statement(&subject));
        let mut roles = Vec::new();
        for row in &rows {
            let Some(name) = row_str(row, "role") else {
                warn!(agent = %subject, "malformed role row skipped");
                continue;
            };
            match name.parse::<RoleKind>() {
                Ok(role) => roles.push(role),
                Err(reason) => {
                    warn!(agent = %subject, reason = %reason, "failed to load role, skipping");
                }
            }
        }
        if roles.is_empty() {
            debug!(agent = %subject, "no stored roles, assigning anonymous");
            roles.push(RoleKind::Anonymous);
        }

        let mut state = self.state.lock().expect("administrator state lock poisoned");
        state
            .roles
            .entry(subject)
            .or_insert_with(|| roles.clone());
        roles
    }

    /// Issue `statement` as a `DbQuery` command through the chain.
    ///
    /// A dispatch error, a failed result, or a malformed value all fold to
    /// zero rows with a warning — the caller's default-allow / anonymous
    /// fallbacks apply.
    fn fetch_rows(&self, statement: &str) -> Vec<serde_json::Map<String, Value>> {
        let command = Command::new(
            &self.system,
            CommandBody::DbQuery {
                statement: statement.to_string(),
            },
        );
        let result = match self.chain.dispatch(&command) {
            Ok(result) => result,
            Err(err) => {
                warn!(statement, error = %err, "database command failed, treating as zero rows");
                return Vec::new();
            }
        };
        if !result.success {
            warn!(statement, "database command unsatisfied, treating as zero rows");
            return Vec::new();
        }
        match result.value {
            Value::Array(rows) => rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    other => {
                        warn!(statement, row = %other, "non-object row skipped");
                        None
                    }
                })
                .collect(),
            other => {
                warn!(statement, value = %other, "database result was not a row list");
                Vec::new()
            }
        }
    }
}

/// Extract a string column from a row.
fn row_str(row: &serde_json::Map<String, Value>, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).map(str::to_string)
}
