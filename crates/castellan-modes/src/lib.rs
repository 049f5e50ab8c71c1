//! # castellan-modes
//!
//! The concrete mode stack for the Castellan kernel: Server, Application,
//! Session, and User command targets, the environments they own, the
//! collaborator seams they consume, and the boot sequence that links them
//! into the live chain.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use castellan_modes::{ModeStack, StackConfig, memory::InMemoryDatabase};
//!
//! let ctx = ModeStack::boot(StackConfig::default(), db, server_log, app_log, user)?;
//! let result = ctx.dispatch(&alice, CommandBody::GetAccessToken)?;
//! ```

pub mod application;
pub mod collab;
pub mod environment;
pub mod memory;
pub mod server;
pub mod session;
pub mod stack;
pub mod user;

pub use application::ApplicationMode;
pub use environment::{Conf, Environment};
pub use server::ServerMode;
pub use session::SessionMode;
pub use stack::{AppContext, ModeStack, StackConfig};
pub use user::UserMode;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use castellan_access::admin::{constraints_statement, permissions_statement};
    use castellan_contracts::{
        access::{ConstraintId, ResourceId},
        agent::{Agent, AgentKind},
        command::{CommandBody, Severity},
    };

    use super::memory::{row, InMemoryDatabase, InMemoryLogSink};
    use super::{AppContext, ModeStack, StackConfig};

    struct Stack {
        ctx: AppContext,
        db: Arc<InMemoryDatabase>,
        server_log: Arc<InMemoryLogSink>,
        application_log: Arc<InMemoryLogSink>,
    }

    fn alice() -> Agent {
        Agent::new("user:alice", AgentKind::User, "Alice")
    }

    fn boot() -> Stack {
        let mut config = StackConfig::default();
        config
            .application_environment
            .insert_registry("modules", json!(["wiki", "forum"]));

        let db = Arc::new(InMemoryDatabase::new());
        let server_log = Arc::new(InMemoryLogSink::new());
        let application_log = Arc::new(InMemoryLogSink::new());
        let ctx = ModeStack::boot(
            config,
            db.clone(),
            server_log.clone(),
            application_log.clone(),
            alice(),
        )
        .unwrap();
        Stack {
            ctx,
            db,
            server_log,
            application_log,
        }
    }

    // ── Boot topology ────────────────────────────────────────────────────────

    #[test]
    fn booted_stack_is_the_canonical_path() {
        let stack = boot();
        let ids: Vec<String> = stack
            .ctx
            .chain()
            .path_ids()
            .into_iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(
            ids,
            ["mode:server", "mode:application", "mode:session", "mode:user"]
        );
    }

    // ── Database routing ─────────────────────────────────────────────────────

    #[test]
    fn db_query_is_answered_by_the_server() {
        let stack = boot();
        stack
            .db
            .seed("SELECT title FROM pages", vec![row(&[("title", "Home")])]);

        let result = stack
            .ctx
            .dispatch(
                "user:alice",
                CommandBody::DbQuery {
                    statement: "SELECT title FROM pages".to_string(),
                },
            )
            .unwrap();

        assert!(result.success);
        assert_eq!(result.value[0]["title"], "Home");
    }

    #[test]
    fn failed_db_query_resolves_to_failure_result() {
        let stack = boot();
        stack.db.fail_on("SELECT broken");

        let result = stack
            .ctx
            .dispatch(
                "user:alice",
                CommandBody::DbQuery {
                    statement: "SELECT broken".to_string(),
                },
            )
            .unwrap();
        assert!(!result.success);
    }

    // ── Log interception ─────────────────────────────────────────────────────

    #[test]
    fn severe_log_stops_at_the_application() {
        let stack = boot();
        let result = stack
            .ctx
            .dispatch(
                "user:alice",
                CommandBody::Log {
                    message: "disk failing".to_string(),
                    severity: Severity::Error,
                    log_name: None,
                },
            )
            .unwrap();

        assert!(result.success);
        let captured = stack.application_log.records();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].message, "disk failing");
        assert_eq!(captured[0].log_name, "application");
        assert!(stack.server_log.records().is_empty());
    }

    #[test]
    fn routine_log_continues_to_the_server() {
        let stack = boot();
        let result = stack
            .ctx
            .dispatch(
                "user:alice",
                CommandBody::Log {
                    message: "page rendered".to_string(),
                    severity: Severity::Info,
                    log_name: Some("render".to_string()),
                },
            )
            .unwrap();

        assert!(result.success);
        assert!(stack.application_log.records().is_empty());
        let captured = stack.server_log.records();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].log_name, "render");
    }

    // ── Session token ────────────────────────────────────────────────────────

    #[test]
    fn access_token_is_stable_within_a_session() {
        let stack = boot();
        let first = stack
            .ctx
            .dispatch("user:alice", CommandBody::GetAccessToken)
            .unwrap();
        let second = stack
            .ctx
            .dispatch("user:alice", CommandBody::GetAccessToken)
            .unwrap();
        assert!(first.success);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn shutdown_tears_the_session_down() {
        let stack = boot();
        let before = stack
            .ctx
            .dispatch("user:alice", CommandBody::GetAccessToken)
            .unwrap();
        assert!(!stack.ctx.is_down());

        let result = stack
            .ctx
            .dispatch(stack.ctx.system_agent(), CommandBody::Shutdown)
            .unwrap();
        assert!(result.success);
        // The Reverse walk reached every teardown-tracking mode.
        assert!(stack.ctx.is_down());

        // The session token was cleared; a new session mints a new token.
        let after = stack
            .ctx
            .dispatch("user:alice", CommandBody::GetAccessToken)
            .unwrap();
        assert_ne!(before.value, after.value);
    }

    // ── Agent lookup ─────────────────────────────────────────────────────────

    #[test]
    fn get_agent_resolves_per_kind() {
        let stack = boot();
        for (kind, expected_id) in [
            (AgentKind::System, "system"),
            (AgentKind::Server, "server"),
            (AgentKind::Application, "application"),
            (AgentKind::User, "user:alice"),
        ] {
            let result = stack
                .ctx
                .dispatch("user:alice", CommandBody::GetAgent { kind })
                .unwrap();
            assert!(result.success, "agent lookup for {} failed", kind);
            assert_eq!(result.value["id"], expected_id);
        }
    }

    // ── Registry lookup ──────────────────────────────────────────────────────

    #[test]
    fn registry_lookup_walks_to_its_owner() {
        let stack = boot();
        let result = stack
            .ctx
            .dispatch(
                "user:alice",
                CommandBody::GetRegistry {
                    registry: "modules".to_string(),
                },
            )
            .unwrap();
        assert!(result.success);
        assert_eq!(result.value[0], "wiki");
    }

    #[test]
    fn unknown_registry_resolves_to_failure() {
        let stack = boot();
        let result = stack
            .ctx
            .dispatch(
                "user:alice",
                CommandBody::GetRegistry {
                    registry: "themes".to_string(),
                },
            )
            .unwrap();
        assert!(!result.success);
    }

    // ── Administrator over the live stack ────────────────────────────────────

    #[test]
    fn administrator_resolves_through_the_live_stack() {
        let stack = boot();
        let doc = ResourceId::new("doc-42");
        stack.db.seed(
            constraints_statement(&doc),
            vec![row(&[("constraint_id", "write"), ("authority", "admin")])],
        );
        stack.db.seed(
            permissions_statement(&doc),
            vec![row(&[("constraint_id", "write"), ("subject_id", "user:alice")])],
        );

        let admin = stack.ctx.administrator();
        let write = ConstraintId::new("write");
        assert!(admin.has_permission("admin", "user:alice", &doc, &write));
        assert!(!admin.has_permission("admin", "user:bob", &doc, &write));
        // One constraints fetch + one permissions fetch, cache-served after.
        assert_eq!(stack.db.query_count(), 2);
        assert_eq!(
            stack.db.received_statements(),
            [constraints_statement(&doc), permissions_statement(&doc)]
        );
        assert!(admin.has_permission("admin", "user:alice", &doc, &ConstraintId::new("read")));
    }

    // ── Configuration ────────────────────────────────────────────────────────

    #[test]
    fn stack_config_loads_from_conf() {
        let mut conf = super::Conf::new(
            "conf:stack",
            r#"
                [server]
                name = "Prod Server"

                [application]
                name = "Wiki"
                log_threshold = "error"
                modules = ["wiki"]
            "#,
        );
        conf.open("system").unwrap();
        let config = StackConfig::from_conf(&conf, "system").unwrap();

        assert_eq!(config.server_environment.display_name(), "Prod Server");
        assert_eq!(config.application_environment.display_name(), "Wiki");
        assert_eq!(config.log_threshold, Severity::Error);
        assert!(config.application_environment.registry("modules").is_some());
        assert!(config
            .application_environment
            .registry("log_threshold")
            .is_none());
    }

    #[test]
    fn default_config_boots() {
        let ctx = ModeStack::boot(
            StackConfig::default(),
            Arc::new(InMemoryDatabase::new()),
            Arc::new(InMemoryLogSink::new()),
            Arc::new(InMemoryLogSink::new()),
            alice(),
        )
        .unwrap();
        assert_eq!(ctx.chain().path_len(), 4);
    }
}
