//! The Session mode.
//!
//! Activates the user agent for the current session and mints the
//! session-scoped access token. The token lives until shutdown tears the
//! session down.

use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;

use castellan_chain::{ChainLink, CommandTarget, ModeKind, TargetId};
use castellan_contracts::{
    agent::{Agent, AgentKind},
    command::{Command, CommandBody, CommandResult},
    error::CastellanResult,
};

use crate::server::agent_value;

/// The Session-level command target.
pub struct SessionMode {
    id: TargetId,
    /// The user agent active for this session.
    user_agent: Agent,
    token: Mutex<Option<String>>,
}

impl SessionMode {
    /// Create the session mode with the active user agent.
    pub fn new(user_agent: Agent) -> Self {
        Self {
            id: TargetId::new("mode:session"),
            user_agent,
            token: Mutex::new(None),
        }
    }

    /// The agent this session acts for.
    pub fn user_agent(&self) -> &Agent {
        &self.user_agent
    }
}

impl CommandTarget for SessionMode {
    fn id(&self) -> &TargetId {
        &self.id
    }

    fn mode_kind(&self) -> ModeKind {
        ModeKind::Session
    }

    fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult> {
        match &command.body {
            CommandBody::GetAccessToken => {
                let mut token = self.token.lock().expect("session token lock poisoned");
                let value = token
                    .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                    .clone();
                Ok(CommandResult::ok(Value::String(value)))
            }

            CommandBody::GetAgent { kind } if *kind == AgentKind::User => {
                Ok(CommandResult::ok(agent_value(&self.user_agent)))
            }

            CommandBody::Shutdown => {
                self.token.lock().expect("session token lock poisoned").take();
                debug!(mode = %self.id, agent = %self.user_agent.id, "session torn down");
                link.delegate(command)
            }

            _ => link.delegate(command),
        }
    }
}
