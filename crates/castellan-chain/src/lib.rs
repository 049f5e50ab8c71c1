//! # castellan-chain
//!
//! The Chain-of-Responsibility command bus for the Castellan kernel.
//!
//! This crate provides:
//! - The `CommandTarget` trait and the mode-kind neighbor rules
//! - The `CommandChain` arena with its append-only linking protocol and
//!   direction-routed dispatch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use castellan_chain::{CommandChain, target::CommandTarget};
//! ```

pub mod chain;
pub mod target;

pub use chain::{ChainLink, CommandChain, TargetHandle};
pub use target::{CommandTarget, ModeKind, TargetId};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use castellan_contracts::{
        command::{Command, CommandBody, CommandKind, CommandResult, Severity},
        error::{CastellanError, CastellanResult},
    };

    use super::{ChainLink, CommandChain, CommandTarget, ModeKind, TargetId};

    // ── Stub target ──────────────────────────────────────────────────────────

    /// A chain node that records every visit and optionally handles one
    /// command kind, delegating everything else.
    struct StubMode {
        id: TargetId,
        kind: ModeKind,
        handles: Option<CommandKind>,
        visits: Arc<Mutex<Vec<String>>>,
    }

    impl StubMode {
        fn new(
            id: &str,
            kind: ModeKind,
            handles: Option<CommandKind>,
            visits: Arc<Mutex<Vec<String>>>,
        ) -> Box<Self> {
            Box::new(Self {
                id: TargetId::new(id),
                kind,
                handles,
                visits,
            })
        }
    }

    impl CommandTarget for StubMode {
        fn id(&self) -> &TargetId {
            &self.id
        }

        fn mode_kind(&self) -> ModeKind {
            self.kind
        }

        fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult> {
            self.visits.lock().unwrap().push(self.id.0.clone());
            if self.handles == Some(command.kind()) {
                Ok(CommandResult::ok(json!(self.id.0)))
            } else {
                link.delegate(command)
            }
        }
    }

    /// Build the canonical four-mode chain with shared visit recording.
    fn build_stack(
        handles: [Option<CommandKind>; 4],
    ) -> (CommandChain, Arc<Mutex<Vec<String>>>) {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, handles[0], visits.clone()))
            .unwrap();
        let app = chain
            .admit(StubMode::new("application", ModeKind::Application, handles[1], visits.clone()))
            .unwrap();
        let session = chain
            .admit(StubMode::new("session", ModeKind::Session, handles[2], visits.clone()))
            .unwrap();
        let user = chain
            .admit(StubMode::new("user", ModeKind::User, handles[3], visits.clone()))
            .unwrap();
        chain.set_command_link(server, app).unwrap();
        chain.set_command_link(app, session).unwrap();
        chain.set_command_link(session, user).unwrap();
        (chain, visits)
    }

    fn forward_command() -> Command {
        Command::new(
            "system",
            CommandBody::DbQuery {
                statement: "SELECT 1".to_string(),
            },
        )
    }

    fn reverse_command() -> Command {
        Command::new(
            "system",
            CommandBody::Log {
                message: "hello".to_string(),
                severity: Severity::Info,
                log_name: None,
            },
        )
    }

    // ── Empty chain behavior ─────────────────────────────────────────────────

    #[test]
    fn dispatch_on_empty_chain_returns_default_failure() {
        let chain = CommandChain::new();
        let result = chain.dispatch(&forward_command()).unwrap();
        assert!(!result.success);
        assert!(result.value.is_null());
    }

    #[test]
    fn end_accessors_fail_on_empty_chain() {
        let chain = CommandChain::new();
        assert!(matches!(
            chain.bottom_target().err(),
            Some(CastellanError::ChainNotInitialized)
        ));
        assert!(matches!(
            chain.top_target().err(),
            Some(CastellanError::ChainNotInitialized)
        ));
    }

    // ── Linking protocol ─────────────────────────────────────────────────────

    #[test]
    fn first_link_admits_both_targets() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits.clone()))
            .unwrap();
        let app = chain
            .admit(StubMode::new("application", ModeKind::Application, None, visits))
            .unwrap();
        chain.set_command_link(server, app).unwrap();

        assert_eq!(chain.path_len(), 2);
        assert_eq!(chain.bottom_target().unwrap().id().0, "server");
        assert_eq!(chain.top_target().unwrap().id().0, "application");
    }

    #[test]
    fn self_link_is_rejected() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits))
            .unwrap();
        let err = chain.set_command_link(server, server).unwrap_err();
        assert!(matches!(err, CastellanError::SelfLink { .. }));
    }

    #[test]
    fn link_from_non_top_superior_names_actual_top() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits.clone()))
            .unwrap();
        let app = chain
            .admit(StubMode::new("application", ModeKind::Application, None, visits.clone()))
            .unwrap();
        let session = chain
            .admit(StubMode::new("session", ModeKind::Session, None, visits))
            .unwrap();
        chain.set_command_link(server, app).unwrap();

        // server is the bottom, not the top; extending from it must fail.
        let err = chain.set_command_link(server, session).unwrap_err();
        match err {
            CastellanError::NotCurrentTop {
                superior,
                actual_top,
            } => {
                assert_eq!(superior, "server");
                assert_eq!(actual_top, "application");
            }
            other => panic!("expected NotCurrentTop, got {:?}", other),
        }
    }

    #[test]
    fn relinking_an_existing_target_is_rejected() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits.clone()))
            .unwrap();
        let app = chain
            .admit(StubMode::new("application", ModeKind::Application, None, visits))
            .unwrap();
        chain.set_command_link(server, app).unwrap();

        // Re-inserting the bottom under the top would form a cycle.
        let err = chain.set_command_link(app, server).unwrap_err();
        assert!(matches!(err, CastellanError::DuplicateTarget { .. }));
    }

    #[test]
    fn handle_from_another_chain_is_rejected() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut other = CommandChain::new();
        other
            .admit(StubMode::new("server", ModeKind::Server, None, visits.clone()))
            .unwrap();
        let foreign = other
            .admit(StubMode::new("application", ModeKind::Application, None, visits.clone()))
            .unwrap();

        // `foreign` indexes past the end of this chain's arena.
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits))
            .unwrap();
        let err = chain.set_command_link(server, foreign).unwrap_err();
        assert!(matches!(
            err,
            CastellanError::UnknownTargetHandle { handle: 1 }
        ));
    }

    #[test]
    fn admitting_a_duplicate_id_is_rejected() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits.clone()))
            .unwrap();
        let err = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits))
            .unwrap_err();
        assert!(matches!(err, CastellanError::DuplicateTarget { .. }));
    }

    #[test]
    fn link_between_wrong_mode_kinds_is_rejected() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let mut chain = CommandChain::new();
        let server = chain
            .admit(StubMode::new("server", ModeKind::Server, None, visits.clone()))
            .unwrap();
        let session = chain
            .admit(StubMode::new("session", ModeKind::Session, None, visits))
            .unwrap();

        // Server's forward neighbor must be an Application, not a Session.
        let err = chain.set_command_link(server, session).unwrap_err();
        match err {
            CastellanError::LinkRejected {
                superior,
                subordinate,
                direction,
            } => {
                assert_eq!(superior, "server");
                assert_eq!(subordinate, "session");
                assert_eq!(direction, "forward");
            }
            other => panic!("expected LinkRejected, got {:?}", other),
        }
    }

    /// After building the full stack the link graph is a simple path, and
    /// both ends are well-defined and distinct.
    #[test]
    fn full_stack_is_a_simple_path() {
        let (chain, _) = build_stack([None, None, None, None]);
        let ids: Vec<String> = chain.path_ids().into_iter().map(|id| id.0).collect();
        assert_eq!(ids, ["server", "application", "session", "user"]);
        assert_ne!(
            chain.bottom_target().unwrap().id(),
            chain.top_target().unwrap().id()
        );
    }

    // ── Direction routing ────────────────────────────────────────────────────

    #[test]
    fn forward_command_enters_at_bottom() {
        let (chain, visits) = build_stack([None, None, None, Some(CommandKind::DbQuery)]);
        let result = chain.dispatch(&forward_command()).unwrap();

        assert!(result.success);
        assert_eq!(
            *visits.lock().unwrap(),
            ["server", "application", "session", "user"]
        );
    }

    #[test]
    fn reverse_command_enters_at_top() {
        let (chain, visits) = build_stack([Some(CommandKind::Log), None, None, None]);
        let result = chain.dispatch(&reverse_command()).unwrap();

        assert!(result.success);
        assert_eq!(
            *visits.lock().unwrap(),
            ["user", "session", "application", "server"]
        );
    }

    #[test]
    fn handling_target_stops_propagation() {
        let (chain, visits) = build_stack([None, Some(CommandKind::DbQuery), None, None]);
        let result = chain.dispatch(&forward_command()).unwrap();

        assert!(result.success);
        assert_eq!(result.value, json!("application"));
        // Session and User were never visited.
        assert_eq!(*visits.lock().unwrap(), ["server", "application"]);
    }

    #[test]
    fn unhandled_command_resolves_to_default_failure() {
        let (chain, visits) = build_stack([None, None, None, None]);
        let result = chain.dispatch(&forward_command()).unwrap();

        assert!(!result.success);
        assert!(result.value.is_null());
        // Every target was visited before the command fell off the end.
        assert_eq!(visits.lock().unwrap().len(), 4);
    }
}
