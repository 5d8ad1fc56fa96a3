//! # Warden RBAC (Compiled Role Rules)
//!
//! This crate turns the roles known to a data source into permit rules and
//! answers permit/deny questions against them.
//!
//! ## Overview
//!
//! The warden-rbac crate handles:
//! - **Sources**: Async traits a storage backend implements for roles and users
//! - **Compilation**: One rule per `group:roleName`, targeting that role's permissions
//! - **Decisions**: `permit`/`deny` over a principal's roles
//! - **Requests**: Validated permission lists, combinators and principal ids
//!
//! ## Architecture
//!
//! ```text
//! RolesSource ──▶ RuleCompiler ──▶ RuleIndex (Arc, swapped per pass)
//!                                      │
//! UsersSource ──▶ RbacEngine::permit ◀─┘
//!
//! Rule keys:
//!   "DEFAULT:editor"   - role `editor` in the default group
//!   "billing:editor"   - same role, compiled for the `billing` group
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_rbac::{
//!     EngineConfig, MemoryRolesSource, MemoryUsersSource, PermissionSet, PrincipalId,
//!     RbacEngine, Role, UserRecord,
//! };
//!
//! # async fn example() -> warden_rbac::RbacResult<()> {
//! let editor = Role::new(1, "editor").with_permissions(["read", "update"]);
//! let engine = RbacEngine::new(
//!     Arc::new(MemoryRolesSource::new(vec![editor.clone()])),
//!     Arc::new(MemoryUsersSource::new(vec![UserRecord::new(1, vec![editor])])),
//!     EngineConfig::default(),
//! );
//! engine.initialize().await?;
//!
//! let update = PermissionSet::from_strings(&["update"]);
//! assert!(engine.permit(PrincipalId(1), Some(&update), None).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Conjunction Mode
//!
//! When a group is compiled with conjunction, all of its roles share one
//! aggregated permission set: any role of the group permits any permission
//! granted to some role of the group.

pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod permissions;
pub mod request;
pub mod roles;
pub mod rules;
pub mod source;

// Re-export main types for convenience
pub use compiler::RuleCompiler;
pub use config::{DenyMode, EngineConfig, MissingRulePolicy};
pub use engine::RbacEngine;
pub use error::{RbacError, RbacResult};
#[cfg(feature = "memory")]
pub use memory::{MemoryRolesSource, MemoryUsersSource, PermissionRecord, UserRecord};
pub use permissions::{Permission, PermissionSet};
pub use request::{Claims, Combinator, DecisionRequest, PrincipalId};
pub use roles::{PermissionsGroup, Role};
pub use rules::{Effect, PermissionAtom, Rule, RuleIndex};
pub use source::{RolesSource, SourceError, SourceResult, UsersSource};
