//! Agent identity and subject types.
//!
//! An `Agent` is the actor on whose behalf commands travel the chain and
//! permission checks are made. Agents are created during boot of their
//! owning mode and live for the whole process.

use serde::{Deserialize, Serialize};

/// Stable, human-readable identifier for an agent.
///
/// Used across permission records, role assignments, and log output.
/// Example: AgentId("user:alice")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Construct an agent id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The privilege class an agent belongs to.
///
/// One agent of each kind is created by the mode that owns that level:
/// the Server mode owns the `Server` agent, the Session mode activates
/// the `User` agent, and so on. `System` is the kernel's own identity,
/// used as the invoker for internally-issued commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    System,
    Server,
    Application,
    User,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentKind::System => "system",
            AgentKind::Server => "server",
            AgentKind::Application => "application",
            AgentKind::User => "user",
        };
        f.write_str(s)
    }
}

/// An access-control actor: a stable identity plus its privilege class.
///
/// Long-lived for the process; owned by the mode at its privilege level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique, stable identifier.
    pub id: AgentId,
    /// The privilege class this agent belongs to.
    pub kind: AgentKind,
    /// Human-readable name for log output and denial messages.
    pub display_name: String,
}

impl Agent {
    /// Construct an agent with the given id, kind, and display name.
    pub fn new(id: impl Into<String>, kind: AgentKind, display_name: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(id),
            kind,
            display_name: display_name.into(),
        }
    }
}

/// The subject of a permission check.
///
/// Permission lookups accept either a full `Agent` or an already-scalar
/// identifier; both normalize to a `SubjectId` via `From` before the
/// cache is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Agent> for SubjectId {
    fn from(agent: &Agent) -> Self {
        Self(agent.id.0.clone())
    }
}

impl From<&AgentId> for SubjectId {
    fn from(id: &AgentId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
