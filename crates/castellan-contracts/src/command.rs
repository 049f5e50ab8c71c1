//! Command, result, and direction types for the command bus.
//!
//! A `Command` is an immutable request-for-work routed through the mode
//! chain. Its routing direction is fixed per command *kind*, never per
//! instance. Commands are created per call and discarded immediately
//! after dispatch; only targets mutate state in response to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{AgentKind, SubjectId};
use crate::error::{CastellanError, CastellanResult};

/// The routing direction of a command.
///
/// Forward commands enter the chain at its bottom (most privileged) target;
/// Reverse commands enter at the top (most subordinate) target. A target
/// that cannot satisfy a command delegates it onward along the links of the
/// same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Forward,
    Reverse,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}

/// Severity of a log command, least to most severe.
///
/// The ordering is load-bearing: the Application mode intercepts log
/// commands at or above its configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// The canonical lowercase name, as accepted by `from_str`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier for a single command instance.
///
/// Every dispatched command carries a fresh UUID, which appears in log
/// output alongside the target that handled it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub uuid::Uuid);

impl CommandId {
    /// Create a new, unique command id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

/// Dataless discriminant for the known command kinds.
///
/// Kinds form a closed set: an unknown kind fails at parse time, never at
/// dispatch time. The kebab-case names are the dynamic invocation surface
/// used by the demo CLI and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Log,
    DbQuery,
    GetRegistry,
    GetAgent,
    GetAccessToken,
    Shutdown,
}

impl CommandKind {
    /// The canonical kebab-case name, as accepted by `from_str`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Log => "log",
            CommandKind::DbQuery => "db-query",
            CommandKind::GetRegistry => "get-registry",
            CommandKind::GetAgent => "get-agent",
            CommandKind::GetAccessToken => "get-access-token",
            CommandKind::Shutdown => "shutdown",
        }
    }
}

impl std::str::FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(CommandKind::Log),
            "db-query" => Ok(CommandKind::DbQuery),
            "get-registry" => Ok(CommandKind::GetRegistry),
            "get-agent" => Ok(CommandKind::GetAgent),
            "get-access-token" => Ok(CommandKind::GetAccessToken),
            "shutdown" => Ok(CommandKind::Shutdown),
            other => Err(format!("unknown command kind '{}'", other)),
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed payload of a command.
///
/// One variant per command kind. The routing direction is a property of
/// the variant, not of the instance — see `direction()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CommandBody {
    /// Write a message to the logging collaborator.
    Log {
        message: String,
        severity: Severity,
        /// Optional named log destination; the sink's default when absent.
        log_name: Option<String>,
    },
    /// Send a structured query to the database collaborator.
    DbQuery { statement: String },
    /// Fetch a named registry from the mode that owns it.
    GetRegistry { registry: String },
    /// Fetch the agent of the given privilege class.
    GetAgent {
        #[serde(rename = "agent-kind")]
        kind: AgentKind,
    },
    /// Obtain the session-scoped access token.
    GetAccessToken,
    /// Wind down every mode in the stack.
    Shutdown,
}

impl CommandBody {
    /// The discriminant for this payload.
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandBody::Log { .. } => CommandKind::Log,
            CommandBody::DbQuery { .. } => CommandKind::DbQuery,
            CommandBody::GetRegistry { .. } => CommandKind::GetRegistry,
            CommandBody::GetAgent { .. } => CommandKind::GetAgent,
            CommandBody::GetAccessToken => CommandKind::GetAccessToken,
            CommandBody::Shutdown => CommandKind::Shutdown,
        }
    }

    /// The fixed routing direction for this command kind.
    ///
    /// Service requests (database, registry, agent, token) travel Forward
    /// toward the privileged end of the chain. Log and shutdown commands
    /// travel Reverse so every mode gets a chance to intercept them.
    pub fn direction(&self) -> Direction {
        match self.kind() {
            CommandKind::DbQuery
            | CommandKind::GetRegistry
            | CommandKind::GetAgent
            | CommandKind::GetAccessToken => Direction::Forward,
            CommandKind::Log | CommandKind::Shutdown => Direction::Reverse,
        }
    }

    /// Build a payload from a loosely-typed argument list.
    ///
    /// This is the dynamic invocation surface: each argument is checked
    /// against the kind's signature, and a mismatch fails with
    /// `ArgumentValidation` naming the expected and actual types — before
    /// any `Command` is constructed.
    ///
    /// Signatures:
    /// - `log`: message (string), severity (string), \[log_name (string)\]
    /// - `db-query`: statement (string)
    /// - `get-registry`: registry (string)
    /// - `get-agent`: kind (string: system | server | application | user)
    /// - `get-access-token`, `shutdown`: no arguments
    pub fn from_args(kind: CommandKind, args: &[Value]) -> CastellanResult<Self> {
        match kind {
            CommandKind::Log => {
                expect_arg_count(kind, args, 2, 3)?;
                let message = string_arg(kind, args, 0)?;
                let severity_name = string_arg(kind, args, 1)?;
                let severity: Severity =
                    severity_name
                        .parse()
                        .map_err(|_| CastellanError::ArgumentValidation {
                            command: kind.to_string(),
                            index: 1,
                            expected: "severity name (debug|info|warning|error|fatal)".to_string(),
                            actual: format!("string '{}'", severity_name),
                        })?;
                let log_name = match args.get(2) {
                    Some(_) => Some(string_arg(kind, args, 2)?),
                    None => None,
                };
                Ok(CommandBody::Log {
                    message,
                    severity,
                    log_name,
                })
            }
            CommandKind::DbQuery => {
                expect_arg_count(kind, args, 1, 1)?;
                let statement = string_arg(kind, args, 0)?;
                Ok(CommandBody::DbQuery { statement })
            }
            CommandKind::GetRegistry => {
                expect_arg_count(kind, args, 1, 1)?;
                let registry = string_arg(kind, args, 0)?;
                Ok(CommandBody::GetRegistry { registry })
            }
            CommandKind::GetAgent => {
                expect_arg_count(kind, args, 1, 1)?;
                let kind_name = string_arg(kind, args, 0)?;
                let agent_kind = match kind_name.as_str() {
                    "system" => AgentKind::System,
                    "server" => AgentKind::Server,
                    "application" => AgentKind::Application,
                    "user" => AgentKind::User,
                    other => {
                        return Err(CastellanError::ArgumentValidation {
                            command: kind.to_string(),
                            index: 0,
                            expected: "agent kind (system|server|application|user)".to_string(),
                            actual: format!("string '{}'", other),
                        })
                    }
                };
                Ok(CommandBody::GetAgent { kind: agent_kind })
            }
            CommandKind::GetAccessToken => {
                expect_arg_count(kind, args, 0, 0)?;
                Ok(CommandBody::GetAccessToken)
            }
            CommandKind::Shutdown => {
                expect_arg_count(kind, args, 0, 0)?;
                Ok(CommandBody::Shutdown)
            }
        }
    }
}

/// Check that the argument list length is within `[min, max]`.
fn expect_arg_count(
    kind: CommandKind,
    args: &[Value],
    min: usize,
    max: usize,
) -> CastellanResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{} argument(s)", min)
        } else {
            format!("{}..={} arguments", min, max)
        };
        return Err(CastellanError::ArgumentValidation {
            command: kind.to_string(),
            index: args.len(),
            expected,
            actual: format!("{} argument(s)", args.len()),
        });
    }
    Ok(())
}

/// Extract the argument at `index` as a string, or fail naming its actual type.
fn string_arg(kind: CommandKind, args: &[Value], index: usize) -> CastellanResult<String> {
    match &args[index] {
        Value::String(s) => Ok(s.clone()),
        other => Err(CastellanError::ArgumentValidation {
            command: kind.to_string(),
            index,
            expected: "string".to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

/// The JSON type name of a value, for argument-validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// An immutable, routed unit of work.
///
/// Constructed via `Command::new`, dispatched once, then discarded. The
/// invoker identifies the subject on whose behalf the work is performed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Unique per instance.
    pub id: CommandId,
    /// The typed payload; fixes the kind and direction.
    pub body: CommandBody,
    /// The subject performing the action.
    pub invoker: SubjectId,
    /// Wall-clock construction time (UTC).
    pub issued_at: DateTime<Utc>,
}

impl Command {
    /// Construct a command for the given invoker and payload.
    pub fn new(invoker: impl Into<SubjectId>, body: CommandBody) -> Self {
        Self {
            id: CommandId::new(),
            body,
            invoker: invoker.into(),
            issued_at: Utc::now(),
        }
    }

    /// The fixed routing direction, delegated to the payload.
    pub fn direction(&self) -> Direction {
        self.body.direction()
    }

    /// The command kind, delegated to the payload.
    pub fn kind(&self) -> CommandKind {
        self.body.kind()
    }
}

/// The success/value envelope a dispatched command resolves to.
///
/// The default-constructed result is a failure with a null value; an
/// unhandled command falling off the end of the chain resolves to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether some target satisfied the command.
    pub success: bool,
    /// The value the handling target produced, or null.
    pub value: Value,
}

impl CommandResult {
    /// A successful result carrying `value`.
    pub fn ok(value: Value) -> Self {
        Self {
            success: true,
            value,
        }
    }

    /// A failed result with a null value.
    pub fn fail() -> Self {
        Self::default()
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self {
            success: false,
            value: Value::Null,
        }
    }
}
