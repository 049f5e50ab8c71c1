//! # castellan-contracts
//!
//! Shared types, command definitions, and error contracts for the Castellan
//! kernel.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod access;
pub mod agent;
pub mod command;
pub mod error;
