//! The User mode: the most subordinate end of the chain.
//!
//! Reverse commands enter the chain here. The user level handles none of
//! the service commands itself — its job is link validation at the
//! subordinate end and passing everything onward.

use tracing::debug;

use castellan_chain::{ChainLink, CommandTarget, ModeKind, TargetId};
use castellan_contracts::{
    command::{Command, CommandBody, CommandResult},
    error::CastellanResult,
};

/// The User-level command target.
pub struct UserMode {
    id: TargetId,
}

impl UserMode {
    /// Create the user mode.
    pub fn new() -> Self {
        Self {
            id: TargetId::new("mode:user"),
        }
    }
}

impl Default for UserMode {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTarget for UserMode {
    fn id(&self) -> &TargetId {
        &self.id
    }

    fn mode_kind(&self) -> ModeKind {
        ModeKind::User
    }

    fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult> {
        if matches!(command.body, CommandBody::Shutdown) {
            debug!(mode = %self.id, "user mode winding down");
        }
        link.delegate(command)
    }
}
