//! The Server mode: the most privileged end of the chain.
//!
//! Owns the database connection and the server-level log sink. Forward
//! commands enter the chain here; Reverse commands terminate here, so the
//! Server is the final stop for log commands nobody intercepted and the
//! last mode to wind down on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use castellan_chain::{ChainLink, CommandTarget, ModeKind, TargetId};
use castellan_contracts::{
    agent::{Agent, AgentKind},
    command::{Command, CommandBody, CommandResult},
    error::{CastellanError, CastellanResult},
};

use crate::collab::{DatabaseConnector, LogRecord, LogSink};
use crate::environment::Environment;

/// Serialize an agent into a command-result value.
pub(crate) fn agent_value(agent: &Agent) -> Value {
    serde_json::json!({
        "id": agent.id.0,
        "kind": agent.kind,
        "display_name": agent.display_name,
    })
}

/// The Server-level command target.
pub struct ServerMode {
    id: TargetId,
    system_agent: Agent,
    server_agent: Agent,
    environment: Environment,
    database: Arc<dyn DatabaseConnector>,
    log: Arc<dyn LogSink>,
    down: AtomicBool,
}

impl ServerMode {
    /// Create the server mode with its environment and collaborators.
    ///
    /// The system and server agents are created here: the server level
    /// owns both the kernel's own identity and its own.
    pub fn new(
        environment: Environment,
        database: Arc<dyn DatabaseConnector>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            id: TargetId::new("mode:server"),
            system_agent: Agent::new("system", AgentKind::System, "Castellan System"),
            server_agent: Agent::new(
                "server",
                AgentKind::Server,
                environment.display_name().to_string(),
            ),
            environment,
            database,
            log,
            down: AtomicBool::new(false),
        }
    }

    /// The kernel's own identity, used as the invoker for internal commands.
    pub fn system_agent(&self) -> &Agent {
        &self.system_agent
    }

    /// Whether a shutdown command has passed through.
    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }
}

impl CommandTarget for ServerMode {
    fn id(&self) -> &TargetId {
        &self.id
    }

    fn mode_kind(&self) -> ModeKind {
        ModeKind::Server
    }

    fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult> {
        match &command.body {
            CommandBody::DbQuery { statement } => match self.database.query(statement) {
                Ok(rows) => Ok(CommandResult::ok(Value::Array(
                    rows.into_iter().map(Value::Object).collect(),
                ))),
                Err(reason) => {
                    warn!(
                        command_id = %command.id.0,
                        statement,
                        reason,
                        "database collaborator failed"
                    );
                    Ok(CommandResult::fail())
                }
            },

            CommandBody::GetRegistry { registry } => match self.environment.registry(registry) {
                Some(value) => Ok(CommandResult::ok(value.clone())),
                None => link.delegate(command),
            },

            CommandBody::GetAgent { kind } => match kind {
                AgentKind::System => Ok(CommandResult::ok(agent_value(&self.system_agent))),
                AgentKind::Server => Ok(CommandResult::ok(agent_value(&self.server_agent))),
                _ => link.delegate(command),
            },

            // Final Reverse stop: everything that reached the server gets
            // written to the server log.
            CommandBody::Log {
                message,
                severity,
                log_name,
            } => {
                self.log
                    .write(LogRecord {
                        message: message.clone(),
                        severity: *severity,
                        log_name: log_name.clone().unwrap_or_else(|| "server".to_string()),
                        logged_at: Utc::now(),
                    })
                    .map_err(|reason| CastellanError::Collaborator {
                        collaborator: "server log sink".to_string(),
                        reason,
                    })?;
                Ok(CommandResult::ok(Value::Null))
            }

            CommandBody::Shutdown => {
                self.down.store(true, Ordering::SeqCst);
                info!(mode = %self.id, "server mode stopped, stack is down");
                Ok(CommandResult::ok(Value::Null))
            }

            CommandBody::GetAccessToken => link.delegate(command),
        }
    }
}
