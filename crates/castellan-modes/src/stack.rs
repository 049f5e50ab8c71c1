//! Boot sequence: construct and link the mode stack, producing the
//! application context.
//!
//! The four modes are linked strictly bottom-to-top —
//! Server→Application→Session→User — during a single linear boot pass,
//! after which the chain is frozen behind an `Arc` and never mutated
//! again. The `AppContext` replaces the original design's lazy process
//! singletons: it is built once at startup and passed to everything that
//! needs the chain or the authority.

use std::sync::Arc;

use tracing::info;

use castellan_access::Administrator;
use castellan_chain::CommandChain;
use castellan_contracts::{
    agent::{Agent, SubjectId},
    command::{Command, CommandBody, CommandResult, Severity},
    error::{CastellanError, CastellanResult},
};

use crate::application::ApplicationMode;
use crate::collab::{DatabaseConnector, LogSink};
use crate::environment::{Conf, Environment};
use crate::server::ServerMode;
use crate::session::SessionMode;
use crate::user::UserMode;

/// Everything the boot sequence needs to know about the stack.
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub server_environment: Environment,
    pub application_environment: Environment,
    /// Log commands at or above this severity stop at the Application mode.
    pub log_threshold: Severity,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            server_environment: Environment::new("Castellan Server"),
            application_environment: Environment::new("Castellan Application"),
            log_threshold: Severity::Warning,
        }
    }
}

impl StackConfig {
    /// Load the stack configuration from an opened `Conf`.
    ///
    /// Expects `[server]` and `[application]` tables, each holding a
    /// `name` plus arbitrary registries; `log_threshold` under
    /// `[application]` overrides the default Warning.
    pub fn from_conf(conf: &Conf, subject: impl Into<SubjectId> + Clone) -> CastellanResult<Self> {
        let server = conf.read(subject.clone(), "server")?;
        let application = conf.read(subject, "application")?;

        let server_table = server.as_table().ok_or_else(|| CastellanError::Config {
            reason: "section 'server' is not a table".to_string(),
        })?;
        let application_table = application.as_table().ok_or_else(|| CastellanError::Config {
            reason: "section 'application' is not a table".to_string(),
        })?;

        let log_threshold = match application_table.get("log_threshold") {
            None => Severity::Warning,
            Some(value) => {
                let name = value.as_str().ok_or_else(|| CastellanError::Config {
                    reason: "application.log_threshold must be a string".to_string(),
                })?;
                name.parse().map_err(|reason| CastellanError::Config {
                    reason: format!("application.log_threshold: {}", reason),
                })?
            }
        };

        let mut application_environment =
            Environment::from_toml_table("Castellan Application", application_table);
        // log_threshold is stack configuration, not an application registry.
        application_environment.remove_registry("log_threshold");

        Ok(Self {
            server_environment: Environment::from_toml_table("Castellan Server", server_table),
            application_environment,
            log_threshold,
        })
    }
}

/// The booted application context.
///
/// Holds the frozen chain and the access-control authority. Its lifecycle
/// is explicit: constructed by `ModeStack::boot`, dropped at the end of
/// the request. Nothing in it may be shared across logical requests.
pub struct AppContext {
    chain: Arc<CommandChain>,
    administrator: Administrator,
    system_agent: Agent,
    server: Arc<ServerMode>,
    application: Arc<ApplicationMode>,
}

impl AppContext {
    /// The frozen command chain.
    pub fn chain(&self) -> &Arc<CommandChain> {
        &self.chain
    }

    /// The access-control authority for this context.
    pub fn administrator(&self) -> &Administrator {
        &self.administrator
    }

    /// The kernel's own identity.
    pub fn system_agent(&self) -> &Agent {
        &self.system_agent
    }

    /// Whether the stack has wound down.
    ///
    /// True once a `Shutdown` command has travelled the whole Reverse path
    /// and every mode that tracks teardown has stopped.
    pub fn is_down(&self) -> bool {
        self.server.is_down() && self.application.is_down()
    }

    /// Construct a command for `invoker` and route it through the chain.
    pub fn dispatch(
        &self,
        invoker: impl Into<SubjectId>,
        body: CommandBody,
    ) -> CastellanResult<CommandResult> {
        self.chain.dispatch(&Command::new(invoker, body))
    }
}

/// The boot entry point for the four-mode stack.
pub struct ModeStack;

impl ModeStack {
    /// Construct, link, and freeze the mode stack.
    ///
    /// Any linking failure here is a boot-sequence defect and aborts the
    /// boot; there is no partial stack.
    pub fn boot(
        config: StackConfig,
        database: Arc<dyn DatabaseConnector>,
        server_log: Arc<dyn LogSink>,
        application_log: Arc<dyn LogSink>,
        user_agent: Agent,
    ) -> CastellanResult<AppContext> {
        let server_mode = Arc::new(ServerMode::new(config.server_environment, database, server_log));
        let system_agent = server_mode.system_agent().clone();
        let application_mode = Arc::new(ApplicationMode::new(
            config.application_environment,
            application_log,
            config.log_threshold,
        ));
        let session_mode = SessionMode::new(user_agent);
        let active_user = session_mode.user_agent().id.clone();

        let mut chain = CommandChain::new();
        let server = chain.admit(Box::new(server_mode.clone()))?;
        let application = chain.admit(Box::new(application_mode.clone()))?;
        let session = chain.admit(Box::new(session_mode))?;
        let user = chain.admit(Box::new(UserMode::new()))?;

        chain.set_command_link(server, application)?;
        chain.set_command_link(application, session)?;
        chain.set_command_link(session, user)?;

        let chain = Arc::new(chain);
        info!(
            path_len = chain.path_len(),
            bottom = %chain.bottom_target()?.id(),
            top = %chain.top_target()?.id(),
            user = %active_user,
            "mode stack booted"
        );

        let administrator = Administrator::new(chain.clone(), system_agent.clone());
        Ok(AppContext {
            chain,
            administrator,
            system_agent,
            server: server_mode,
            application: application_mode,
        })
    }
}
