//! The Application mode.
//!
//! Owns the application environment (module registries) and the
//! application log sink. Log commands at or above the configured severity
//! threshold are intercepted here and propagation stops; routine entries
//! continue toward the server log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use castellan_chain::{ChainLink, CommandTarget, ModeKind, TargetId};
use castellan_contracts::{
    agent::{Agent, AgentKind},
    command::{Command, CommandBody, CommandResult, Severity},
    error::{CastellanError, CastellanResult},
};

use crate::collab::{LogRecord, LogSink};
use crate::environment::Environment;
use crate::server::agent_value;

/// The Application-level command target.
pub struct ApplicationMode {
    id: TargetId,
    agent: Agent,
    environment: Environment,
    log: Arc<dyn LogSink>,
    /// Log commands at or above this severity are intercepted here.
    threshold: Severity,
    down: AtomicBool,
}

impl ApplicationMode {
    /// Create the application mode with its environment, log sink, and
    /// interception threshold.
    pub fn new(environment: Environment, log: Arc<dyn LogSink>, threshold: Severity) -> Self {
        Self {
            id: TargetId::new("mode:application"),
            agent: Agent::new(
                "application",
                AgentKind::Application,
                environment.display_name().to_string(),
            ),
            environment,
            log,
            threshold,
            down: AtomicBool::new(false),
        }
    }

    /// Whether a shutdown command has passed through.
    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }
}

impl CommandTarget for ApplicationMode {
    fn id(&self) -> &TargetId {
        &self.id
    }

    fn mode_kind(&self) -> ModeKind {
        ModeKind::Application
    }

    fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult> {
        match &command.body {
            CommandBody::Log {
                message,
                severity,
                log_name,
            } if *severity >= self.threshold => {
                self.log
                    .write(LogRecord {
                        message: message.clone(),
                        severity: *severity,
                        log_name: log_name.clone().unwrap_or_else(|| "application".to_string()),
                        logged_at: Utc::now(),
                    })
                    .map_err(|reason| CastellanError::Collaborator {
                        collaborator: "application log sink".to_string(),
                        reason,
                    })?;
                Ok(CommandResult::ok(Value::Null))
            }

            CommandBody::GetRegistry { registry } => match self.environment.registry(registry) {
                Some(value) => Ok(CommandResult::ok(value.clone())),
                None => link.delegate(command),
            },

            CommandBody::GetAgent { kind } if *kind == AgentKind::Application => {
                Ok(CommandResult::ok(agent_value(&self.agent)))
            }

            CommandBody::Shutdown => {
                self.down.store(true, Ordering::SeqCst);
                debug!(mode = %self.id, "application mode stopped");
                link.delegate(command)
            }

            _ => link.delegate(command),
        }
    }
}
