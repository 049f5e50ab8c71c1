//! The command-target trait and mode-kind neighbor rules.
//!
//! A `CommandTarget` is one node of the chain. Implementations are the
//! four mode scopes; each either satisfies an incoming command locally or
//! delegates it onward through the `ChainLink` cursor the chain hands it.

use serde::{Deserialize, Serialize};

use castellan_contracts::{
    command::{Command, CommandResult, Direction},
    error::CastellanResult,
};

use crate::chain::ChainLink;

/// Stable identifier for a chain target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    /// Construct a target id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The execution scope a target belongs to, most privileged first.
///
/// The mode kinds form a fixed privilege ladder. A target only accepts,
/// as its forward neighbor, the kind exactly one step less privileged
/// than itself, and as its reverse neighbor the kind one step more
/// privileged — the chain is always Server→Application→Session→User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeKind {
    Server,
    Application,
    Session,
    User,
}

impl ModeKind {
    /// The only kind acceptable as this kind's forward (less privileged)
    /// neighbor, or `None` at the subordinate end of the ladder.
    pub fn forward_neighbor(&self) -> Option<ModeKind> {
        match self {
            ModeKind::Server => Some(ModeKind::Application),
            ModeKind::Application => Some(ModeKind::Session),
            ModeKind::Session => Some(ModeKind::User),
            ModeKind::User => None,
        }
    }

    /// The only kind acceptable as this kind's reverse (more privileged)
    /// neighbor, or `None` at the privileged end of the ladder.
    pub fn reverse_neighbor(&self) -> Option<ModeKind> {
        match self {
            ModeKind::Server => None,
            ModeKind::Application => Some(ModeKind::Server),
            ModeKind::Session => Some(ModeKind::Application),
            ModeKind::User => Some(ModeKind::Session),
        }
    }
}

impl std::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModeKind::Server => "server",
            ModeKind::Application => "application",
            ModeKind::Session => "session",
            ModeKind::User => "user",
        };
        f.write_str(s)
    }
}

/// One node of the command chain.
///
/// `execute` must either satisfy the command and return a successful
/// `CommandResult`, or call `link.delegate()` to pass it to the adjacent
/// target in the command's direction. Falling off the end of the chain
/// resolves to the default (failure) result, not an error.
pub trait CommandTarget: Send + Sync {
    /// The stable identity of this target.
    fn id(&self) -> &TargetId;

    /// The execution scope this target implements.
    fn mode_kind(&self) -> ModeKind;

    /// Whether `peer` is acceptable as this target's neighbor in `direction`.
    ///
    /// The default follows the mode-kind ladder: exactly one step down for
    /// a forward peer, exactly one step up for a reverse peer. The chain
    /// consults both parties before establishing a link; either side
    /// returning false aborts the link with a structured error.
    fn validate_command_link(&self, peer: ModeKind, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.mode_kind().forward_neighbor() == Some(peer),
            Direction::Reverse => self.mode_kind().reverse_neighbor() == Some(peer),
        }
    }

    /// Satisfy `command` locally or delegate it through `link`.
    fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult>;
}

/// A shared target is a target: the chain can hold one owner of a mode
/// while the boot sequence keeps another for post-dispatch inspection.
impl<T: CommandTarget + ?Sized> CommandTarget for std::sync::Arc<T> {
    fn id(&self) -> &TargetId {
        (**self).id()
    }

    fn mode_kind(&self) -> ModeKind {
        (**self).mode_kind()
    }

    fn validate_command_link(&self, peer: ModeKind, direction: Direction) -> bool {
        (**self).validate_command_link(peer, direction)
    }

    fn execute(&self, command: &Command, link: ChainLink<'_>) -> CastellanResult<CommandResult> {
        (**self).execute(command, link)
    }
}
