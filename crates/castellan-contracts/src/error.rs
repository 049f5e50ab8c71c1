//! Error types for the Castellan kernel.
//!
//! All fallible operations return `CastellanResult<T>`. Variants carry
//! enough context to name every party involved: a topology failure names
//! both targets and the rejected direction; a denial names subject,
//! resource, constraint, and the authority that refused to grant it.

use thiserror::Error;

/// The unified error type for the Castellan kernel.
#[derive(Debug, Error)]
pub enum CastellanError {
    /// A subject was refused access to a resource.
    ///
    /// Produced by the `authorize` wrapper, never by `has_permission`
    /// itself — at the data-model level a denial is an ordinary `false`.
    #[error("access denied: subject '{subject}' may not pass constraint '{constraint}' on resource '{resource}' (authority '{authority}')")]
    AccessDenied {
        subject: String,
        resource: String,
        constraint: String,
        authority: String,
    },

    /// A target was asked to link to itself.
    #[error("chain topology violation: target '{target}' cannot link to itself")]
    SelfLink { target: String },

    /// `set_command_link` named a superior that is not the current top.
    #[error("chain topology violation: '{superior}' is not the current top of the chain (top is '{actual_top}')")]
    NotCurrentTop {
        superior: String,
        actual_top: String,
    },

    /// The proposed subordinate is already part of the chain.
    #[error("chain topology violation: target '{target}' is already linked into the chain")]
    DuplicateTarget { target: String },

    /// One of the two parties refused the proposed link.
    #[error("chain topology violation: link from '{superior}' to '{subordinate}' rejected in {direction} direction")]
    LinkRejected {
        superior: String,
        subordinate: String,
        direction: String,
    },

    /// A target handle did not name a target admitted to this chain.
    ///
    /// Handles are only meaningful for the chain that issued them; this is
    /// what a handle from another chain resolves to.
    #[error("chain topology violation: target handle {handle} is not admitted to this chain")]
    UnknownTargetHandle { handle: usize },

    /// A top/bottom accessor was called on an empty chain.
    #[error("command chain is not initialized: no targets have been linked")]
    ChainNotInitialized,

    /// A command was invoked with an argument of the wrong type or count.
    ///
    /// Raised before any `Command` is constructed.
    #[error("invalid argument {index} for command '{command}': expected {expected}, got {actual}")]
    ArgumentValidation {
        command: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// An external collaborator (database, registry, log sink) failed.
    #[error("collaborator '{collaborator}' failed: {reason}")]
    Collaborator {
        collaborator: String,
        reason: String,
    },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the Castellan crates.
pub type CastellanResult<T> = Result<T, CastellanError>;
