//! The command chain: target arena, linking protocol, and dispatch.
//!
//! The chain owns its targets in an arena and records adjacency in two
//! index tables (`forward[i]`, `reverse[i]`) rather than pointer links on
//! shared objects. The linked targets form a single simple path, built
//! once during boot by extending strictly at the subordinate end, and
//! frozen thereafter.

use std::collections::HashMap;

use tracing::{debug, warn};

use castellan_contracts::{
    command::{Command, CommandResult, Direction},
    error::{CastellanError, CastellanResult},
};

use crate::target::{CommandTarget, TargetId};

/// Opaque handle to a target admitted into a chain's arena.
///
/// Handles are only meaningful for the chain that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetHandle(usize);

/// Delegation cursor handed to `CommandTarget::execute`.
///
/// `delegate` moves the command one step along the adjacency table in the
/// command's own direction. Past the end of the path it resolves to the
/// default (failure) `CommandResult`.
pub struct ChainLink<'a> {
    chain: &'a CommandChain,
    position: usize,
}

impl ChainLink<'_> {
    /// Hand `command` to the adjacent target in its declared direction.
    pub fn delegate(&self, command: &Command) -> CastellanResult<CommandResult> {
        let next = match command.direction() {
            Direction::Forward => self.chain.forward[self.position],
            Direction::Reverse => self.chain.reverse[self.position],
        };
        match next {
            Some(idx) => self.chain.execute_at(idx, command),
            None => {
                debug!(
                    command_id = %command.id.0,
                    kind = %command.kind(),
                    end = %self.chain.targets[self.position].id(),
                    "command fell off the end of the chain unhandled"
                );
                Ok(CommandResult::default())
            }
        }
    }
}

/// The ordered chain of command targets.
///
/// Built during boot via `admit` + `set_command_link`, then frozen (shared
/// immutably for the rest of the process). Dispatch selects the entry end
/// from the command's direction and lets targets delegate from there.
pub struct CommandChain {
    /// Arena of admitted targets, addressed by index.
    targets: Vec<Box<dyn CommandTarget>>,
    /// Forward (toward the subordinate end) adjacency, per arena index.
    forward: Vec<Option<usize>>,
    /// Reverse (toward the privileged end) adjacency, per arena index.
    reverse: Vec<Option<usize>>,
    /// Target id → arena index, for duplicate detection and lookups.
    offsets: HashMap<TargetId, usize>,
    /// Arena indices of the linked path, bottom (first linked) to top.
    path: Vec<usize>,
}

impl CommandChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            forward: Vec::new(),
            reverse: Vec::new(),
            offsets: HashMap::new(),
            path: Vec::new(),
        }
    }

    /// Store `target` in the arena without linking it, returning its handle.
    ///
    /// Fails with `DuplicateTarget` if a target with the same id was
    /// already admitted.
    pub fn admit(&mut self, target: Box<dyn CommandTarget>) -> CastellanResult<TargetHandle> {
        let id = target.id().clone();
        if self.offsets.contains_key(&id) {
            return Err(CastellanError::DuplicateTarget {
                target: id.to_string(),
            });
        }
        let idx = self.targets.len();
        self.targets.push(target);
        self.forward.push(None);
        self.reverse.push(None);
        self.offsets.insert(id, idx);
        Ok(TargetHandle(idx))
    }

    /// Establish the directed superior→subordinate edge.
    ///
    /// Linking rules, all checked before any adjacency entry is written:
    /// - a target never links to itself;
    /// - on an empty chain both targets are admitted to the path
    ///   unconditionally, superior first;
    /// - on a non-empty chain `superior` must be the current top — the
    ///   path only ever extends at its subordinate end;
    /// - `subordinate` must not already be part of the path;
    /// - both parties must accept the link for their direction.
    pub fn set_command_link(
        &mut self,
        superior: TargetHandle,
        subordinate: TargetHandle,
    ) -> CastellanResult<()> {
        let sup = superior.0;
        let sub = subordinate.0;

        let sup_id = self.target_id(sup)?.clone();
        let sub_id = self.target_id(sub)?.clone();

        if sup == sub {
            return Err(CastellanError::SelfLink {
                target: sup_id.to_string(),
            });
        }

        if let Some(&top) = self.path.last() {
            if top != sup {
                return Err(CastellanError::NotCurrentTop {
                    superior: sup_id.to_string(),
                    actual_top: self.targets[top].id().to_string(),
                });
            }
            if self.path.contains(&sub) {
                return Err(CastellanError::DuplicateTarget {
                    target: sub_id.to_string(),
                });
            }
            self.validate_both(sup, sub)?;
            self.path.push(sub);
        } else {
            // First link: superior becomes the path's bottom, subordinate
            // its top.
            self.validate_both(sup, sub)?;
            self.path.push(sup);
            self.path.push(sub);
        }

        self.forward[sup] = Some(sub);
        self.reverse[sub] = Some(sup);

        debug!(
            superior = %sup_id,
            subordinate = %sub_id,
            path_len = self.path.len(),
            "command link established"
        );
        Ok(())
    }

    /// Route `command` to the entry end matching its direction.
    ///
    /// An empty chain resolves every command to the default (failure)
    /// result rather than raising.
    pub fn dispatch(&self, command: &Command) -> CastellanResult<CommandResult> {
        let entry = match command.direction() {
            Direction::Forward => self.path.first(),
            Direction::Reverse => self.path.last(),
        };
        match entry {
            Some(&idx) => {
                debug!(
                    command_id = %command.id.0,
                    kind = %command.kind(),
                    direction = %command.direction(),
                    entry = %self.targets[idx].id(),
                    invoker = %command.invoker,
                    "dispatching command"
                );
                self.execute_at(idx, command)
            }
            None => {
                warn!(
                    command_id = %command.id.0,
                    kind = %command.kind(),
                    "dispatch on an empty chain, returning default failure result"
                );
                Ok(CommandResult::default())
            }
        }
    }

    /// The bottom-of-path (first linked, most privileged) target.
    pub fn bottom_target(&self) -> CastellanResult<&dyn CommandTarget> {
        self.path
            .first()
            .map(|&idx| self.targets[idx].as_ref())
            .ok_or(CastellanError::ChainNotInitialized)
    }

    /// The top-of-path (most recently linked, most subordinate) target.
    pub fn top_target(&self) -> CastellanResult<&dyn CommandTarget> {
        self.path
            .last()
            .map(|&idx| self.targets[idx].as_ref())
            .ok_or(CastellanError::ChainNotInitialized)
    }

    /// Number of targets in the linked path.
    pub fn path_len(&self) -> usize {
        self.path.len()
    }

    /// Ids of the linked path, bottom to top.
    pub fn path_ids(&self) -> Vec<TargetId> {
        self.path
            .iter()
            .map(|&idx| self.targets[idx].id().clone())
            .collect()
    }

    fn execute_at(&self, idx: usize, command: &Command) -> CastellanResult<CommandResult> {
        let link = ChainLink {
            chain: self,
            position: idx,
        };
        self.targets[idx].execute(command, link)
    }

    fn target_id(&self, idx: usize) -> CastellanResult<&TargetId> {
        self.targets
            .get(idx)
            .map(|t| t.id())
            .ok_or(CastellanError::UnknownTargetHandle { handle: idx })
    }

    /// Ask both parties to accept the proposed superior→subordinate link.
    fn validate_both(&self, sup: usize, sub: usize) -> CastellanResult<()> {
        let sup_t = &self.targets[sup];
        let sub_t = &self.targets[sub];
        let forward_ok = sup_t.validate_command_link(sub_t.mode_kind(), Direction::Forward);
        if !forward_ok {
            return Err(CastellanError::LinkRejected {
                superior: sup_t.id().to_string(),
                subordinate: sub_t.id().to_string(),
                direction: Direction::Forward.to_string(),
            });
        }
        let reverse_ok = sub_t.validate_command_link(sup_t.mode_kind(), Direction::Reverse);
        if !reverse_ok {
            return Err(CastellanError::LinkRejected {
                superior: sup_t.id().to_string(),
                subordinate: sub_t.id().to_string(),
                direction: Direction::Reverse.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CommandChain {
    fn default() -> Self {
        Self::new()
    }
}
