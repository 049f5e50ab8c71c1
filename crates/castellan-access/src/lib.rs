//! # castellan-access
//!
//! The RBAC permission-resolution engine for the Castellan kernel.
//!
//! This crate provides:
//! - The `Administrator`, the system-wide authority resolving
//!   subject/resource/constraint checks against a lazily-populated cache,
//!   reaching persistence as `DbQuery` commands through the command chain
//! - `RoleKind` resolution with the anonymous fallback
//! - The resource-local `PermissionStore` for objects gating their own
//!   operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use castellan_access::{Administrator, PermissionStore, RoleKind};
//! ```

pub mod admin;
pub mod cache;
pub mod roles;
pub mod store;

pub use admin::Administrator;
pub use cache::{AccessCache, CacheLookup};
pub use roles::RoleKind;
pub use store::PermissionStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
